use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "docx-translator.toml";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub translation: TranslationSection,
    #[serde(default)]
    pub backends: HashMap<String, TranslationConfig>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TranslationSection {
    /// Name of the [backends.*] entry to use when the CLI does not pick one.
    #[serde(default)]
    pub backend: Option<String>,

    /// Language codes (e.g. en, zh). Auto-detected from document text when omitted.
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub target_lang: Option<String>,

    #[serde(default)]
    pub split_sentences: Option<bool>,

    /// Optional dev-only limiter: translate at most N segments.
    #[serde(default)]
    pub max_segments: Option<usize>,
}

/// A translation backend. Closed variant set: a locally hosted chat-completion server,
/// or the hosted API-key service.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranslationConfig {
    LocalModel {
        endpoint: String,
        model: String,
    },
    HostedApi {
        api_key: String,
        #[serde(default = "default_hosted_model")]
        model: String,
    },
}

fn default_hosted_model() -> String {
    "deepseek-chat".to_string()
}

impl TranslationConfig {
    pub fn validate(&self, name: &str) -> anyhow::Result<()> {
        match self {
            Self::LocalModel { endpoint, model } => {
                if endpoint.trim().is_empty() || model.trim().is_empty() {
                    return Err(anyhow!(
                        "backend {name}: local_model requires endpoint and model"
                    ));
                }
            }
            Self::HostedApi { api_key, .. } => {
                if api_key.trim().is_empty() {
                    return Err(anyhow!("backend {name}: hosted_api requires api_key"));
                }
            }
        }
        Ok(())
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, CONFIG_FILENAME, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, CONFIG_FILENAME, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, CONFIG_FILENAME, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

/// Pick the backend to use: explicit CLI name, then the [translation] default, then the
/// sole configured backend when there is exactly one.
pub fn resolve_backend(
    cfg: &AppConfig,
    requested: Option<&str>,
) -> anyhow::Result<(String, TranslationConfig)> {
    let name = requested
        .map(str::to_string)
        .or_else(|| cfg.translation.backend.clone())
        .or_else(|| {
            if cfg.backends.len() == 1 {
                cfg.backends.keys().next().cloned()
            } else {
                None
            }
        })
        .ok_or_else(|| {
            anyhow!(
                "no backend selected; pass --backend or set [translation].backend (configured: {})",
                if cfg.backends.is_empty() {
                    "none".to_string()
                } else {
                    cfg.backends.keys().cloned().collect::<Vec<_>>().join(", ")
                }
            )
        })?;

    let backend = cfg
        .backends
        .get(&name)
        .cloned()
        .ok_or_else(|| anyhow!("backend {name} not found in config"))?;
    backend.validate(&name)?;
    Ok((name, backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[translation]
backend = "local"
target_lang = "zh"

[backends.local]
kind = "local_model"
endpoint = "http://127.0.0.1:11434"
model = "qwen2.5:7b"

[backends.deepseek]
kind = "hosted_api"
api_key = "sk-test"
"#;

    #[test]
    fn parses_sample_config() {
        let cfg: AppConfig = toml::from_str(SAMPLE).expect("parse toml");
        assert_eq!(cfg.translation.backend.as_deref(), Some("local"));
        assert_eq!(cfg.translation.target_lang.as_deref(), Some("zh"));
        assert_eq!(cfg.backends.len(), 2);
        match cfg.backends.get("deepseek").expect("deepseek backend") {
            TranslationConfig::HostedApi { model, .. } => assert_eq!(model, "deepseek-chat"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn resolve_prefers_cli_name() {
        let cfg: AppConfig = toml::from_str(SAMPLE).expect("parse toml");
        let (name, backend) = resolve_backend(&cfg, Some("deepseek")).expect("resolve");
        assert_eq!(name, "deepseek");
        assert!(matches!(backend, TranslationConfig::HostedApi { .. }));

        let (name, _) = resolve_backend(&cfg, None).expect("resolve default");
        assert_eq!(name, "local");
    }

    #[test]
    fn resolve_rejects_unknown_and_invalid() {
        let cfg: AppConfig = toml::from_str(SAMPLE).expect("parse toml");
        assert!(resolve_backend(&cfg, Some("missing")).is_err());

        let empty_key: AppConfig = toml::from_str(
            "[backends.hosted]\nkind = \"hosted_api\"\napi_key = \"\"\n",
        )
        .expect("parse toml");
        assert!(resolve_backend(&empty_key, None).is_err());
    }

    #[test]
    fn sole_backend_is_implicit_default() {
        let cfg: AppConfig = toml::from_str(
            "[backends.only]\nkind = \"local_model\"\nendpoint = \"http://h\"\nmodel = \"m\"\n",
        )
        .expect("parse toml");
        let (name, _) = resolve_backend(&cfg, None).expect("resolve");
        assert_eq!(name, "only");
    }
}
