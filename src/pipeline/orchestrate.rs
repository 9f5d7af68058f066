use std::time::Duration;

use crate::oracle::TranslationOracle;
use crate::progress::ConsoleProgress;
use crate::segment::{SegmentFailure, TextSegment, TranslatedSegment};

pub const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct OrchestratorReport {
    pub translated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<SegmentFailure>,
}

/// Translate segments one at a time, in order, with per-segment retry. A segment whose
/// attempts are all exhausted falls back to its original text (fail-open): a partially
/// translated document beats no document. Empty segments are never dispatched.
pub fn translate_segments(
    segments: &[TextSegment],
    oracle: &dyn TranslationOracle,
    source_lang: &str,
    target_lang: &str,
    progress: &ConsoleProgress,
) -> (Vec<TranslatedSegment>, OrchestratorReport) {
    let mut out: Vec<TranslatedSegment> = Vec::with_capacity(segments.len());
    let mut report = OrchestratorReport::default();

    for (idx, segment) in segments.iter().enumerate() {
        progress.progress("translate", idx + 1, segments.len());

        if segment.text.trim().is_empty() {
            report.skipped += 1;
            out.push(TranslatedSegment {
                segment: segment.clone(),
                translated_text: String::new(),
            });
            continue;
        }

        let mut last_error = String::new();
        let mut translated: Option<String> = None;
        for attempt in 1..=RETRY_ATTEMPTS {
            match oracle.translate(&segment.text, source_lang, target_lang) {
                Ok(text) => {
                    translated = Some(text);
                    break;
                }
                Err(err) => {
                    let note = if err.is_timeout() { " (timeout)" } else { "" };
                    last_error = err.to_string();
                    progress.warn(&format!(
                        "segment {} attempt {attempt}/{RETRY_ATTEMPTS} failed{note}: {last_error}",
                        segment.id
                    ));
                    if attempt < RETRY_ATTEMPTS {
                        std::thread::sleep(RETRY_DELAY);
                    }
                }
            }
        }

        match translated {
            Some(text) => {
                report.translated += 1;
                out.push(TranslatedSegment {
                    segment: segment.clone(),
                    translated_text: text,
                });
            }
            None => {
                report.failed += 1;
                report.failures.push(SegmentFailure {
                    segment_id: segment.id.clone(),
                    attempts: RETRY_ATTEMPTS,
                    last_error,
                });
                out.push(TranslatedSegment {
                    segment: segment.clone(),
                    translated_text: segment.text.clone(),
                });
            }
        }
    }

    (out, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::segment::SegmentKind;
    use std::cell::Cell;

    fn seg(id: &str, text: &str) -> TextSegment {
        TextSegment {
            id: id.to_string(),
            kind: SegmentKind::Paragraph,
            text: text.to_string(),
            original_markup: String::new(),
            placeholders: Vec::new(),
        }
    }

    fn quiet() -> ConsoleProgress {
        ConsoleProgress::new(false)
    }

    struct UppercaseOracle;

    impl TranslationOracle for UppercaseOracle {
        fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, OracleError> {
            Ok(text.to_uppercase())
        }
    }

    struct FlakyOracle {
        calls: Cell<u32>,
        fail_first: u32,
    }

    impl TranslationOracle for FlakyOracle {
        fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, OracleError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n <= self.fail_first {
                Err(OracleError::EmptyResponse)
            } else {
                Ok(format!("ok: {text}"))
            }
        }
    }

    struct DeadOracle;

    impl TranslationOracle for DeadOracle {
        fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, OracleError> {
            Err(OracleError::Backend("unreachable".to_string()))
        }
    }

    #[test]
    fn translates_in_order_and_skips_empty() {
        let segments = vec![seg("p_1", "hello"), seg("p_2", "   "), seg("p_3", "world")];
        let (out, report) =
            translate_segments(&segments, &UppercaseOracle, "en", "zh", &quiet());
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].translated_text, "HELLO");
        assert_eq!(out[1].translated_text, "");
        assert_eq!(out[2].translated_text, "WORLD");
        assert_eq!(report.translated, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn retries_until_success() {
        let oracle = FlakyOracle {
            calls: Cell::new(0),
            fail_first: 2,
        };
        let segments = vec![seg("p_1", "hello")];
        let (out, report) = translate_segments(&segments, &oracle, "en", "zh", &quiet());
        assert_eq!(out[0].translated_text, "ok: hello");
        assert_eq!(report.translated, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(oracle.calls.get(), 3);
    }

    #[test]
    fn exhausted_retries_fail_open_to_original_text() {
        let segments = vec![seg("p_1", "keep me")];
        let (out, report) = translate_segments(&segments, &DeadOracle, "en", "zh", &quiet());
        assert_eq!(out[0].translated_text, "keep me");
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].segment_id, "p_1");
        assert_eq!(report.failures[0].attempts, RETRY_ATTEMPTS);
        assert!(report.failures[0].last_error.contains("unreachable"));
    }
}
