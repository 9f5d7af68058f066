use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::{
    find_default_config, load_config, resolve_backend, TranslationConfig, CONFIG_FILENAME,
};

/// Fully resolved job configuration: TOML file merged with CLI overrides.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub config_path: PathBuf,
    pub backend_name: String,
    pub backend: TranslationConfig,

    /// None means autodetect from extracted text.
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,

    pub split_sentences: bool,
    pub max_segments: Option<usize>,
}

impl PipelineConfig {
    pub fn from_paths_and_args(
        input: &Path,
        config_path: Option<PathBuf>,
        backend: Option<String>,
        source_lang: Option<String>,
        target_lang: Option<String>,
        split_sentences: bool,
        max_segments: Option<usize>,
    ) -> anyhow::Result<Self> {
        let workdir = input
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let config_path = match config_path {
            Some(p) => p,
            None => find_default_config(&workdir).ok_or_else(|| {
                anyhow!(
                    "no {CONFIG_FILENAME} found; run with --init-config to generate one"
                )
            })?,
        };
        let cfg = load_config(&config_path)?;
        let (backend_name, backend) = resolve_backend(&cfg, backend.as_deref())?;

        Ok(Self {
            config_path,
            backend_name,
            backend,
            source_lang: source_lang.or(cfg.translation.source_lang),
            target_lang: target_lang.or(cfg.translation.target_lang),
            split_sentences: split_sentences
                || cfg.translation.split_sentences.unwrap_or(false),
            max_segments: max_segments.or(cfg.translation.max_segments),
        })
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }

    let cfg_text = r#"[translation]
backend = "local"
# Language codes (e.g. en, zh). Omit both to autodetect from the document text.
# source_lang = "en"
# target_lang = "zh"

# Translate sentence-by-sentence instead of paragraph-by-paragraph.
split_sentences = false

# Dev-only limiter: translate at most N segments.
# max_segments = 20

[backends.local]
kind = "local_model"
endpoint = "http://127.0.0.1:11434"
model = "qwen2.5:7b"

# [backends.deepseek]
# kind = "hosted_api"
# api_key = "sk-..."
# model = "deepseek-chat"
"#;
    std::fs::write(&cfg_path, cfg_text)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_parseable_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init_default_config(dir.path(), false).expect("init config");
        let cfg = load_config(&path).expect("load generated config");
        assert_eq!(cfg.translation.backend.as_deref(), Some("local"));
        assert!(cfg.backends.contains_key("local"));
    }

    #[test]
    fn init_respects_existing_file_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "# custom\n").expect("write custom");
        init_default_config(dir.path(), false).expect("init config");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            "# custom\n"
        );
        init_default_config(dir.path(), true).expect("init config force");
        assert!(std::fs::read_to_string(&path)
            .expect("read back")
            .contains("[translation]"));
    }

    #[test]
    fn cli_overrides_win_over_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = init_default_config(dir.path(), false).expect("init config");
        let input = dir.path().join("doc.docx");

        let cfg = PipelineConfig::from_paths_and_args(
            &input,
            Some(cfg_path),
            None,
            Some("ja".to_string()),
            None,
            true,
            Some(7),
        )
        .expect("build config");

        assert_eq!(cfg.backend_name, "local");
        assert_eq!(cfg.source_lang.as_deref(), Some("ja"));
        assert!(cfg.target_lang.is_none());
        assert!(cfg.split_sentences);
        assert_eq!(cfg.max_segments, Some(7));
    }
}
