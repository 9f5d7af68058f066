pub mod config;
pub mod docx;
pub mod error;
pub mod oracle;
pub mod pipeline;
pub mod progress;
pub mod segment;
pub mod textutil;
