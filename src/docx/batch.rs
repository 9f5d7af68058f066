use crate::progress::ConsoleProgress;
use crate::segment::TranslatedSegment;

use super::matcher::{collect_paragraphs, match_segments};
use super::reconstruct::apply_translations;
use super::validate::is_valid_document_xml;
use super::xml::{write_xml_part, XmlPart};

pub const LARGE_DOC_CHARS: usize = 500_000;
pub const LARGE_SEGMENT_COUNT: usize = 100;
pub const BATCH_SIZE: usize = 30;

pub fn needs_batching(document_len: usize, segment_count: usize) -> bool {
    document_len > LARGE_DOC_CHARS || segment_count > LARGE_SEGMENT_COUNT
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub batches: usize,
    pub rolled_back: usize,
    pub matched: usize,
    pub unmatched: Vec<String>,
}

/// Run match -> reconstruct -> validate once per fixed-size slice of segments, feeding
/// each batch's output to the next. A batch whose result fails validation is rolled
/// back on its own; replacements from earlier batches are kept.
pub fn apply_in_batches(
    part: &mut XmlPart,
    segments: &[TranslatedSegment],
    progress: &ConsoleProgress,
) -> anyhow::Result<BatchReport> {
    let mut report = BatchReport::default();
    let total = segments.len().div_ceil(BATCH_SIZE);

    for (batch_idx, batch) in segments.chunks(BATCH_SIZE).enumerate() {
        report.batches += 1;
        progress.info(&format!(
            "batch {}/{} ({} segments)",
            batch_idx + 1,
            total,
            batch.len()
        ));

        let snapshot = part.events.clone();
        let mut paragraphs = collect_paragraphs(part);
        let outcome = match_segments(&mut paragraphs, batch, progress);
        apply_translations(part, &paragraphs);

        let rendered = write_xml_part(part)?;
        let rendered = String::from_utf8_lossy(&rendered);
        if is_valid_document_xml(&rendered, progress) {
            report.matched += outcome.matched;
            report.unmatched.extend(outcome.unmatched);
        } else {
            progress.warn(&format!(
                "batch {} produced invalid markup, rolling it back",
                batch_idx + 1
            ));
            part.events = snapshot;
            report.rolled_back += 1;
        }
    }

    Ok(report)
}
