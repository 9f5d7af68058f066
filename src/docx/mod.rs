pub mod batch;
pub mod extract;
pub mod fallback;
pub mod matcher;
pub mod package;
pub mod reconstruct;
pub mod validate;
pub mod xml;
