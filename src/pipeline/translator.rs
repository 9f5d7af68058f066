use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::docx::batch::{apply_in_batches, needs_batching};
use crate::docx::extract::{extract_segments, ExtractOptions};
use crate::docx::fallback::build_minimal_docx;
use crate::docx::matcher::{collect_paragraphs, match_segments};
use crate::docx::package::{DocxPackage, DOCUMENT_PART};
use crate::docx::reconstruct::apply_translations;
use crate::docx::validate::{is_valid_document_xml, repair_document_xml};
use crate::docx::xml::{parse_xml_part, write_xml_part};
use crate::oracle::TranslationOracle;
use crate::progress::ConsoleProgress;
use crate::segment::TranslatedSegment;
use crate::textutil::auto_language_pair;

use super::orchestrate::translate_segments;
use super::PipelineConfig;

/// Job lifecycle. Terminal states are `Persisted` and `Failed`; `Failed` is only
/// reached when even the fallback builder or the output write errors out, in which
/// case `translate_docx` returns the error itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Parsed,
    Segmented,
    Translated,
    Matched,
    Reconstructed,
    Validated,
    RolledBack,
    FallbackBuilt,
    Persisted,
    Failed,
}

pub struct TranslatorPipeline {
    cfg: PipelineConfig,
    oracle: Box<dyn TranslationOracle>,
    progress: ConsoleProgress,
    state: JobState,
}

impl TranslatorPipeline {
    pub fn new(
        cfg: PipelineConfig,
        oracle: Box<dyn TranslationOracle>,
        progress: ConsoleProgress,
    ) -> Self {
        Self {
            cfg,
            oracle,
            progress,
            state: JobState::Parsed,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn resolve_lang_pair(&self, excerpts: &[String]) -> (String, String) {
        match (&self.cfg.source_lang, &self.cfg.target_lang) {
            (Some(s), Some(t)) => (s.clone(), t.clone()),
            _ => {
                let (auto_s, auto_t) = auto_language_pair(excerpts);
                (
                    self.cfg.source_lang.clone().unwrap_or(auto_s),
                    self.cfg.target_lang.clone().unwrap_or(auto_t),
                )
            }
        }
    }

    pub fn translate_docx(&mut self, input: &Path, output: &Path) -> anyhow::Result<JobState> {
        self.progress.info(format!("Read DOCX: {}", input.display()));
        let pkg = DocxPackage::read(input)?;
        let doc_bytes = pkg.document_xml()?;
        let mut part = parse_xml_part(DOCUMENT_PART, doc_bytes).context("parse document part")?;
        self.state = JobState::Parsed;

        let opts = ExtractOptions {
            split_sentences: self.cfg.split_sentences,
        };
        let (mut segments, placeholders) = extract_segments(&part, &opts)?;
        if let Some(max) = self.cfg.max_segments {
            let keep = max.max(1).min(segments.len());
            segments.truncate(keep);
            self.progress.info(format!("Max segments: {keep}"));
        }
        self.state = JobState::Segmented;
        self.progress.info(format!(
            "Extracted {} segments, {} placeholders",
            segments.len(),
            placeholders.len()
        ));

        let excerpts: Vec<String> = segments.iter().take(20).map(|s| s.text.clone()).collect();
        let (source_lang, target_lang) = self.resolve_lang_pair(&excerpts);
        self.progress
            .info(format!("Language: {source_lang} -> {target_lang}"));

        let (translated, report) = translate_segments(
            &segments,
            self.oracle.as_ref(),
            &source_lang,
            &target_lang,
            &self.progress,
        );
        self.state = JobState::Translated;
        self.progress.info(format!(
            "Translated {} segments ({} failed open, {} skipped)",
            report.translated, report.failed, report.skipped
        ));

        let original_events = part.events.clone();
        let doc_len = write_xml_part(&part)?.len();

        let unmatched = if needs_batching(doc_len, translated.len()) {
            self.progress.info("Large document, applying in batches");
            let batch_report = apply_in_batches(&mut part, &translated, &self.progress)?;
            if batch_report.rolled_back > 0 {
                self.progress.warn(&format!(
                    "{} of {} batches rolled back",
                    batch_report.rolled_back, batch_report.batches
                ));
            }
            batch_report.unmatched.len()
        } else {
            let mut paragraphs = collect_paragraphs(&part);
            let outcome = match_segments(&mut paragraphs, &translated, &self.progress);
            self.state = JobState::Matched;
            apply_translations(&mut part, &paragraphs);
            outcome.unmatched.len()
        };
        self.state = JobState::Reconstructed;
        if unmatched > 0 {
            self.progress
                .warn(&format!("{unmatched} segments had no matching paragraph"));
        }

        let rendered = write_xml_part(&part)?;
        let rendered_str = String::from_utf8_lossy(&rendered).into_owned();
        let final_bytes = if is_valid_document_xml(&rendered_str, &self.progress) {
            self.state = JobState::Validated;
            rendered
        } else {
            self.progress.warn("Document failed validation, repairing");
            let repaired = repair_document_xml(&rendered_str);
            if is_valid_document_xml(&repaired, &self.progress) {
                self.state = JobState::Validated;
                repaired.into_bytes()
            } else {
                self.progress
                    .warn("Repair failed, rolling back all replacements");
                self.state = JobState::RolledBack;
                part.events = original_events;
                let rolled = write_xml_part(&part)?;
                let rolled_str = String::from_utf8_lossy(&rolled);
                if is_valid_document_xml(&rolled_str, &self.progress) {
                    self.state = JobState::Validated;
                    rolled
                } else {
                    return self.persist_fallback(&translated, output);
                }
            }
        };

        let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
        replacements.insert(DOCUMENT_PART.to_string(), final_bytes);
        pkg.fill_missing_required_parts(&mut replacements);
        if let Err(err) = pkg.write_with_replacements(output, &replacements) {
            self.state = JobState::Failed;
            return Err(err);
        }
        self.state = JobState::Persisted;
        self.progress
            .info(format!("Saved translated document: {}", output.display()));
        Ok(self.state)
    }

    fn persist_fallback(
        &mut self,
        translated: &[TranslatedSegment],
        output: &Path,
    ) -> anyhow::Result<JobState> {
        self.progress
            .warn("Building minimal fallback document (formatting is lost)");
        if let Err(err) = build_minimal_docx(translated, output) {
            self.state = JobState::Failed;
            return Err(err);
        }
        self.state = JobState::Persisted;
        self.progress
            .info(format!("Saved fallback document: {}", output.display()));
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslationConfig;
    use crate::error::OracleError;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn test_cfg() -> PipelineConfig {
        PipelineConfig {
            config_path: PathBuf::from("unused.toml"),
            backend_name: "stub".to_string(),
            backend: TranslationConfig::LocalModel {
                endpoint: "http://127.0.0.1:1".to_string(),
                model: "stub".to_string(),
            },
            source_lang: Some("en".to_string()),
            target_lang: Some("fr".to_string()),
            split_sentences: false,
            max_segments: None,
        }
    }

    fn build_docx(path: &Path, document_xml: &str) {
        let f = File::create(path).expect("create zip");
        let mut z = ZipWriter::new(f);
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        z.start_file(DOCUMENT_PART, opts).expect("start file");
        z.write_all(document_xml.as_bytes()).expect("write file");
        z.start_file("word/media/image1.png", opts).expect("start media");
        z.write_all(b"fake-png").expect("write media");
        z.finish().expect("finish zip");
    }

    const THREE_PARAS: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        r#"<w:body>"#,
        r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>   </w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>World</w:t></w:r></w:p>"#,
        r#"</w:body></w:document>"#
    );

    struct MapOracle(HashMap<String, String>);

    impl TranslationOracle for MapOracle {
        fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, OracleError> {
            self.0
                .get(text)
                .cloned()
                .ok_or_else(|| OracleError::BadShape(format!("no mapping for {text:?}")))
        }
    }

    struct DeadOracle;

    impl TranslationOracle for DeadOracle {
        fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, OracleError> {
            Err(OracleError::Backend("down".to_string()))
        }
    }

    fn read_document_xml(path: &Path) -> String {
        let pkg = DocxPackage::read(path).expect("read output");
        String::from_utf8_lossy(pkg.document_xml().expect("document part")).into_owned()
    }

    #[test]
    fn end_to_end_translates_non_empty_paragraphs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.docx");
        let output = dir.path().join("out.docx");
        build_docx(&input, THREE_PARAS);

        let mut mapping = HashMap::new();
        mapping.insert("Hello".to_string(), "Bonjour".to_string());
        mapping.insert("World".to_string(), "Monde".to_string());

        let mut pipeline = TranslatorPipeline::new(
            test_cfg(),
            Box::new(MapOracle(mapping)),
            ConsoleProgress::new(false),
        );
        let state = pipeline.translate_docx(&input, &output).expect("translate");
        assert_eq!(state, JobState::Persisted);

        let doc = read_document_xml(&output);
        assert!(doc.contains("<w:t>Bonjour</w:t>"));
        assert!(doc.contains("<w:t>Monde</w:t>"));
        assert!(!doc.contains("Hello"));
        // The empty paragraph survives untouched.
        assert!(doc.contains("<w:t>   </w:t>"));

        // Non-XML entries are carried over byte-for-byte.
        let pkg = DocxPackage::read(&output).expect("read output");
        assert_eq!(pkg.entry("word/media/image1.png").expect("media").data, b"fake-png");
    }

    #[test]
    fn dead_oracle_fails_open_and_still_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.docx");
        let output = dir.path().join("out.docx");
        build_docx(&input, THREE_PARAS);

        let mut cfg = test_cfg();
        cfg.max_segments = Some(1); // keep retry sleeps bounded
        let mut pipeline = TranslatorPipeline::new(
            cfg,
            Box::new(DeadOracle),
            ConsoleProgress::new(false),
        );
        let state = pipeline.translate_docx(&input, &output).expect("translate");
        assert_eq!(state, JobState::Persisted);

        // Fail-open: the original text is still there.
        let doc = read_document_xml(&output);
        assert!(doc.contains("Hello"));
    }

    #[test]
    fn missing_required_parts_are_backfilled_on_persist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.docx");
        let output = dir.path().join("out.docx");
        build_docx(&input, THREE_PARAS);

        let mut mapping = HashMap::new();
        mapping.insert("Hello".to_string(), "Bonjour".to_string());
        mapping.insert("World".to_string(), "Monde".to_string());

        let mut pipeline = TranslatorPipeline::new(
            test_cfg(),
            Box::new(MapOracle(mapping)),
            ConsoleProgress::new(false),
        );
        pipeline.translate_docx(&input, &output).expect("translate");

        let pkg = DocxPackage::read(&output).expect("read output");
        assert!(pkg.entry("[Content_Types].xml").is_some());
        assert!(pkg.entry("word/styles.xml").is_some());
    }
}
