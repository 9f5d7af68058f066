use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use docx_translator::docx::extract::{extract_segments, ExtractOptions};
use docx_translator::docx::package::{DocxPackage, DOCUMENT_PART};
use docx_translator::docx::xml::{parse_xml_part, write_xml_part};
use docx_translator::oracle::HttpOracle;
use docx_translator::pipeline::{init_default_config, PipelineConfig, TranslatorPipeline};
use docx_translator::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "docx-translator")]
#[command(about = "DOCX translator (chat-completion backends) with format preservation", long_about = None)]
struct Args {
    /// Generate a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Input .docx
    #[arg(value_name = "DOCX")]
    input: Option<PathBuf>,

    /// Output .docx (default: <input_stem>_翻译.docx)
    #[arg(short, long, value_name = "DOCX")]
    output: Option<PathBuf>,

    /// Force source language code (e.g. en, zh)
    #[arg(long)]
    source_lang: Option<String>,

    /// Force target language code (e.g. zh, en)
    #[arg(long)]
    target_lang: Option<String>,

    /// Config file path (default: search for docx-translator.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend name from config (e.g. local, deepseek)
    #[arg(long)]
    backend: Option<String>,

    /// Translate sentence-by-sentence instead of paragraph-by-paragraph
    #[arg(long)]
    split_sentences: bool,

    /// Translate at most N segments (dev-only)
    #[arg(long)]
    max_segments: Option<usize>,

    /// Only parse + re-serialize the DOCX (no translation)
    #[arg(long)]
    roundtrip_only: bool,

    /// Extract segments + placeholder table as JSON, then exit (no translation)
    #[arg(long, value_name = "JSON")]
    extract_segments_json: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(true);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let input = match args.input {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            eprintln!(
                "\n\nUSAGE:\n  docx-translator <input.docx>\n\nTIPS:\n  - Default config search: docx-translator.toml (upwards); generate one with --init-config.\n"
            );
            return Ok(());
        }
    };
    let output = match args.output {
        Some(p) => p,
        None => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output")
                .to_string();
            input.with_file_name(format!("{stem}_翻译.docx"))
        }
    };

    if let Some(json_path) = args.extract_segments_json {
        let pkg = DocxPackage::read(&input)?;
        let part = parse_xml_part(DOCUMENT_PART, pkg.document_xml()?)
            .context("parse document part")?;
        let opts = ExtractOptions {
            split_sentences: args.split_sentences,
        };
        let (segments, placeholders) = extract_segments(&part, &opts)?;
        let dump = serde_json::json!({
            "segments": segments,
            "placeholders": placeholders,
        });
        let text = serde_json::to_string_pretty(&dump).context("serialize segments json")?;
        std::fs::write(&json_path, text)
            .with_context(|| format!("write segments json: {}", json_path.display()))?;
        progress.info(format!(
            "Wrote {} segments to {}",
            segments.len(),
            json_path.display()
        ));
        return Ok(());
    }

    if args.roundtrip_only {
        let pkg = DocxPackage::read(&input)?;
        let mut replacements: std::collections::HashMap<String, Vec<u8>> =
            std::collections::HashMap::new();
        for ent in pkg.xml_entries() {
            if ent.data.is_empty() {
                continue;
            }
            let part = parse_xml_part(&ent.name, &ent.data)
                .with_context(|| format!("parse xml: {}", ent.name))?;
            let bytes =
                write_xml_part(&part).with_context(|| format!("serialize xml: {}", ent.name))?;
            replacements.insert(ent.name.clone(), bytes);
        }
        pkg.write_with_replacements(&output, &replacements)?;
        progress.info(format!("Roundtrip written: {}", output.display()));
        return Ok(());
    }

    let cfg = PipelineConfig::from_paths_and_args(
        &input,
        args.config,
        args.backend,
        args.source_lang,
        args.target_lang,
        args.split_sentences,
        args.max_segments,
    )
    .context("build config")?;
    progress.info(format!(
        "Backend: {} ({})",
        cfg.backend_name,
        cfg.config_path.display()
    ));

    let oracle = HttpOracle::new(cfg.backend.clone(), progress.clone())
        .context("build translation client")?;
    let mut pipeline = TranslatorPipeline::new(cfg, Box::new(oracle), progress);
    pipeline.translate_docx(&input, &output)?;
    Ok(())
}
