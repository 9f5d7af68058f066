pub mod clean;
pub mod http;

use crate::error::OracleError;

/// The translation capability seam. The pipeline only knows "succeeded with text" or
/// "failed"; backend HTTP semantics stay behind this trait.
pub trait TranslationOracle {
    fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, OracleError>;
}

pub use http::HttpOracle;
