use crate::progress::ConsoleProgress;
use crate::segment::TranslatedSegment;
use crate::textutil::{normalize_whitespace, strip_punctuation};

use super::extract::{scan_paragraphs, RunRef};
use super::xml::XmlPart;

/// One matchable paragraph of the document part. Event indices are handles into the
/// parsed event vector; `claimed` enforces one-segment-per-paragraph.
#[derive(Clone, Debug)]
pub struct ParagraphRecord {
    pub start_event: usize,
    pub end_event: usize,
    pub runs: Vec<RunRef>,
    pub text: String,
    pub translated_text: Option<String>,
    pub claimed: bool,
    pub order: usize,
}

#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub matched: usize,
    pub unmatched: Vec<String>,
}

/// Collect the paragraphs eligible for replacement. Empty and whitespace-only
/// paragraphs are excluded, mirroring extraction, so segment order lines up with
/// record order for the positional tier.
pub fn collect_paragraphs(part: &XmlPart) -> Vec<ParagraphRecord> {
    scan_paragraphs(part)
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .enumerate()
        .map(|(order, p)| ParagraphRecord {
            start_event: p.start_event,
            end_event: p.end_event,
            runs: p.runs,
            text: p.text,
            translated_text: None,
            claimed: false,
            order,
        })
        .collect()
}

/// Assign each translated segment to at most one unclaimed paragraph, trying four
/// tiers in turn: exact text equality, containment (segments longer than 10 chars),
/// punctuation-stripped equality (longer than 5 chars), then same-index position.
/// Segments with empty source or translated text are skipped. Whichever tier claims
/// a paragraph, it stays claimed for the rest of the pass.
pub fn match_segments(
    paragraphs: &mut [ParagraphRecord],
    segments: &[TranslatedSegment],
    progress: &ConsoleProgress,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();

    for (seg_idx, seg) in segments.iter().enumerate() {
        if seg.segment.text.trim().is_empty() || seg.translated_text.is_empty() {
            continue;
        }
        let seg_norm = normalize_whitespace(&seg.segment.text);

        let claim = find_exact(paragraphs, &seg_norm)
            .or_else(|| find_containing(paragraphs, &seg_norm))
            .or_else(|| find_fuzzy(paragraphs, &seg_norm))
            .or_else(|| find_positional(paragraphs, seg_idx));

        match claim {
            Some((idx, tier)) => {
                paragraphs[idx].translated_text = Some(seg.translated_text.clone());
                paragraphs[idx].claimed = true;
                outcome.matched += 1;
                progress.info(&format!(
                    "{tier} match: \"{}\"",
                    excerpt(&seg_norm, 30)
                ));
            }
            None => {
                progress.warn(&format!(
                    "no matching paragraph: \"{}\"",
                    excerpt(&seg_norm, 50)
                ));
                outcome.unmatched.push(seg_norm);
            }
        }
    }

    outcome
}

fn find_exact(paragraphs: &[ParagraphRecord], seg_norm: &str) -> Option<(usize, &'static str)> {
    paragraphs
        .iter()
        .position(|p| !p.claimed && normalize_whitespace(&p.text) == seg_norm)
        .map(|i| (i, "exact"))
}

fn find_containing(
    paragraphs: &[ParagraphRecord],
    seg_norm: &str,
) -> Option<(usize, &'static str)> {
    if seg_norm.chars().count() <= 10 {
        return None;
    }
    paragraphs
        .iter()
        .position(|p| !p.claimed && normalize_whitespace(&p.text).contains(seg_norm))
        .map(|i| (i, "containment"))
}

fn find_fuzzy(paragraphs: &[ParagraphRecord], seg_norm: &str) -> Option<(usize, &'static str)> {
    let seg_simple = strip_punctuation(seg_norm);
    if seg_simple.chars().count() <= 5 {
        return None;
    }
    paragraphs
        .iter()
        .position(|p| !p.claimed && strip_punctuation(&p.text) == seg_simple)
        .map(|i| (i, "fuzzy"))
}

fn find_positional(paragraphs: &[ParagraphRecord], seg_idx: usize) -> Option<(usize, &'static str)> {
    if seg_idx < paragraphs.len() && !paragraphs[seg_idx].claimed {
        Some((seg_idx, "positional"))
    } else {
        None
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::parse_xml_part;
    use crate::segment::{SegmentKind, TextSegment};

    fn part_with(texts: &[&str]) -> XmlPart {
        let mut xml = String::from(r#"<w:document xmlns:w="ns"><w:body>"#);
        for t in texts {
            xml.push_str(&format!("<w:p><w:r><w:t>{t}</w:t></w:r></w:p>"));
        }
        xml.push_str("</w:body></w:document>");
        parse_xml_part("word/document.xml", xml.as_bytes()).expect("parse")
    }

    fn seg(id: &str, src: &str, dst: &str) -> TranslatedSegment {
        TranslatedSegment {
            segment: TextSegment {
                id: id.to_string(),
                kind: SegmentKind::Paragraph,
                text: src.to_string(),
                original_markup: String::new(),
                placeholders: Vec::new(),
            },
            translated_text: dst.to_string(),
        }
    }

    fn quiet() -> ConsoleProgress {
        ConsoleProgress::new(false)
    }

    #[test]
    fn exact_match_wins_and_claims_once() {
        let part = part_with(&["Hello", "Hello"]);
        let mut paras = collect_paragraphs(&part);
        let segs = vec![seg("p_1", "Hello", "Bonjour"), seg("p_2", "Hello", "Salut")];
        let outcome = match_segments(&mut paras, &segs, &quiet());
        assert_eq!(outcome.matched, 2);
        assert_eq!(paras[0].translated_text.as_deref(), Some("Bonjour"));
        assert_eq!(paras[1].translated_text.as_deref(), Some("Salut"));
    }

    #[test]
    fn exact_ignores_whitespace_differences() {
        let part = part_with(&["Hello   world"]);
        let mut paras = collect_paragraphs(&part);
        let segs = vec![seg("p_1", " Hello world ", "Bonjour monde")];
        let outcome = match_segments(&mut paras, &segs, &quiet());
        assert_eq!(outcome.matched, 1);
        assert!(paras[0].claimed);
    }

    #[test]
    fn containment_requires_length_over_ten() {
        let part = part_with(&["prefix the quick brown fox suffix", "short one"]);
        let mut paras = collect_paragraphs(&part);
        // Long enough for containment.
        let long = seg("p_1", "the quick brown fox", "le renard");
        // Too short for containment, no exact/fuzzy hit, falls back to position 1.
        let short = seg("p_2", "one", "un");
        let outcome = match_segments(&mut paras, &[long, short], &quiet());
        assert_eq!(outcome.matched, 2);
        assert_eq!(paras[0].translated_text.as_deref(), Some("le renard"));
        assert_eq!(paras[1].translated_text.as_deref(), Some("un"));
    }

    #[test]
    fn fuzzy_matches_across_punctuation() {
        let part = part_with(&["Hello, world! (greetings)"]);
        let mut paras = collect_paragraphs(&part);
        let segs = vec![seg("p_1", "Hello world greetings", "Bonjour")];
        let outcome = match_segments(&mut paras, &segs, &quiet());
        assert_eq!(outcome.matched, 1);
    }

    #[test]
    fn positional_fallback_by_segment_index() {
        let part = part_with(&["alpha", "beta"]);
        let mut paras = collect_paragraphs(&part);
        let segs = vec![seg("p_1", "unrelated text", "X"), seg("p_2", "also unrelated", "Y")];
        let outcome = match_segments(&mut paras, &segs, &quiet());
        assert_eq!(outcome.matched, 2);
        assert_eq!(paras[0].translated_text.as_deref(), Some("X"));
        assert_eq!(paras[1].translated_text.as_deref(), Some("Y"));
    }

    #[test]
    fn unmatched_segments_are_reported() {
        let part = part_with(&["alpha"]);
        let mut paras = collect_paragraphs(&part);
        let segs = vec![
            seg("p_1", "alpha", "A"),
            seg("p_2", "nothing like it", "B"),
        ];
        let outcome = match_segments(&mut paras, &segs, &quiet());
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.unmatched, vec!["nothing like it".to_string()]);
    }

    #[test]
    fn empty_segments_are_skipped() {
        let part = part_with(&["alpha"]);
        let mut paras = collect_paragraphs(&part);
        let segs = vec![seg("p_1", "", "X"), seg("p_2", "alpha", "")];
        let outcome = match_segments(&mut paras, &segs, &quiet());
        assert_eq!(outcome.matched, 0);
        assert!(outcome.unmatched.is_empty());
        assert!(!paras[0].claimed);
    }

    #[test]
    fn each_paragraph_claimed_at_most_once() {
        let part = part_with(&["same text here", "same text here"]);
        let mut paras = collect_paragraphs(&part);
        let segs = vec![
            seg("p_1", "same text here", "A"),
            seg("p_2", "same text here", "B"),
            seg("p_3", "same text here", "C"),
        ];
        let outcome = match_segments(&mut paras, &segs, &quiet());
        assert_eq!(outcome.matched, 2);
        assert_eq!(outcome.unmatched.len(), 1);
        let claimed: Vec<bool> = paras.iter().map(|p| p.claimed).collect();
        assert_eq!(claimed, vec![true, true]);
    }
}
