mod config;
mod orchestrate;
mod translator;

pub use config::{init_default_config, PipelineConfig};
pub use orchestrate::{translate_segments, OrchestratorReport, RETRY_ATTEMPTS};
pub use translator::{JobState, TranslatorPipeline};
