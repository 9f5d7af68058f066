use std::collections::BTreeMap;

use crate::segment::{
    PlaceholderIdGen, PlaceholderKind, SegmentKind, TagPlaceholder, TextSegment,
};
use crate::textutil::split_sentences;

use super::xml::{write_event_range, XmlEvent, XmlPart};

#[derive(Clone, Copy, Debug, Default)]
pub struct ExtractOptions {
    /// Split paragraph text into sentence segments instead of one paragraph segment.
    pub split_sentences: bool,
}

/// Reference to one `w:t` element inside a paragraph. `text_event` is `None` for
/// empty elements (`<w:t/>` or `<w:t></w:t>`).
#[derive(Clone, Debug)]
pub struct RunRef {
    pub elem_event: usize,
    pub text_event: Option<usize>,
    pub text: String,
}

/// One `w:p` subtree of the document part: its event range (inclusive of the `w:p`
/// start/end events), its visible text, and its text runs in document order.
#[derive(Clone, Debug)]
pub struct RawParagraph {
    pub start_event: usize,
    pub end_event: usize,
    pub text: String,
    pub runs: Vec<RunRef>,
}

/// Walk the event vector and collect every paragraph outside header/footer regions.
/// Paragraphs can nest (a text box's `w:txbxContent` holds its own `w:p` subtrees), so
/// open paragraphs are kept on a stack: text attaches to the innermost one, and each
/// level becomes its own record. The result is ordered by document position.
/// Deleted revision content (`w:del`) contributes neither text nor run references, so
/// reconstruction never writes into it; inserted content (`w:ins`) is read transparently.
/// Comment range markers and references carry no text and are ignored by construction.
pub fn scan_paragraphs(part: &XmlPart) -> Vec<RawParagraph> {
    let mut paragraphs: Vec<RawParagraph> = Vec::new();

    let mut suppress_depth = 0usize; // w:hdr / w:ftr subtrees
    let mut del_depth = 0usize;
    let mut stack: Vec<RawParagraph> = Vec::new();
    let mut open_text_elem: Option<usize> = None;

    for (idx, ev) in part.events.iter().enumerate() {
        match ev {
            XmlEvent::Start { name, .. } => match name.as_str() {
                "w:hdr" | "w:ftr" => suppress_depth += 1,
                "w:del" => del_depth += 1,
                "w:p" if suppress_depth == 0 => {
                    stack.push(RawParagraph {
                        start_event: idx,
                        end_event: idx,
                        text: String::new(),
                        runs: Vec::new(),
                    });
                }
                "w:t" if del_depth == 0 => {
                    if !stack.is_empty() {
                        open_text_elem = Some(idx);
                    }
                }
                _ => {}
            },
            XmlEvent::Empty { name, .. } => {
                if name == "w:t" && del_depth == 0 {
                    if let Some(p) = stack.last_mut() {
                        p.runs.push(RunRef {
                            elem_event: idx,
                            text_event: None,
                            text: String::new(),
                        });
                    }
                }
            }
            XmlEvent::End { name } => match name.as_str() {
                "w:hdr" | "w:ftr" => suppress_depth = suppress_depth.saturating_sub(1),
                "w:del" => del_depth = del_depth.saturating_sub(1),
                "w:t" => {
                    if let (Some(p), Some(elem)) = (stack.last_mut(), open_text_elem.take()) {
                        // Element closed without a text event.
                        if p.runs.last().map(|r| r.elem_event) != Some(elem) {
                            p.runs.push(RunRef {
                                elem_event: elem,
                                text_event: None,
                                text: String::new(),
                            });
                        }
                    }
                }
                "w:p" => {
                    if suppress_depth == 0 {
                        if let Some(mut p) = stack.pop() {
                            p.end_event = idx;
                            paragraphs.push(p);
                        }
                    }
                }
                _ => {}
            },
            XmlEvent::Text { text } => {
                if let (Some(p), Some(elem)) = (stack.last_mut(), open_text_elem) {
                    p.text.push_str(text);
                    p.runs.push(RunRef {
                        elem_event: elem,
                        text_event: Some(idx),
                        text: text.clone(),
                    });
                    open_text_elem = None;
                }
            }
            _ => {}
        }
    }

    // Inner paragraphs close first; restore document order.
    paragraphs.sort_by_key(|p| p.start_event);
    paragraphs
}

/// Extract the ordered segment list plus the flat placeholder table for one document part.
/// Empty/whitespace-only paragraphs are never emitted. Deterministic: identical input
/// yields identical output.
pub fn extract_segments(
    part: &XmlPart,
    opts: &ExtractOptions,
) -> anyhow::Result<(Vec<TextSegment>, BTreeMap<String, TagPlaceholder>)> {
    let mut segments: Vec<TextSegment> = Vec::new();
    let mut table: BTreeMap<String, TagPlaceholder> = BTreeMap::new();
    let mut ids = PlaceholderIdGen::default();

    for para in scan_paragraphs(part) {
        if para.text.trim().is_empty() {
            continue;
        }

        let placeholders = lift_placeholders(part, &para, &mut ids)?;
        for ph in &placeholders {
            table.insert(ph.id.clone(), ph.clone());
        }
        let markup = write_event_range(part, para.start_event, para.end_event + 1)?;

        let sentences = if opts.split_sentences {
            split_sentences(&para.text)
        } else {
            Vec::new()
        };

        if sentences.len() > 1 {
            for sentence in sentences {
                segments.push(TextSegment {
                    id: format!("s_{}", segments.len() + 1),
                    kind: SegmentKind::Sentence,
                    text: sentence,
                    original_markup: markup.clone(),
                    placeholders: placeholders.clone(),
                });
            }
        } else {
            segments.push(TextSegment {
                id: format!("p_{}", segments.len() + 1),
                kind: SegmentKind::Paragraph,
                text: para.text.clone(),
                original_markup: markup,
                placeholders,
            });
        }
    }

    Ok((segments, table))
}

fn placeholder_kind(name: &str) -> Option<PlaceholderKind> {
    match name {
        "w:rPr" => Some(PlaceholderKind::Style),
        "w:tbl" => Some(PlaceholderKind::Table),
        "w:drawing" => Some(PlaceholderKind::Image),
        "w:pict" | "w:object" => Some(PlaceholderKind::Other),
        _ => None,
    }
}

/// Lift non-text constructs found inside the paragraph's event range. No marker is
/// spliced back into the paragraph's plain text; the table is kept for output assembly.
fn lift_placeholders(
    part: &XmlPart,
    para: &RawParagraph,
    ids: &mut PlaceholderIdGen,
) -> anyhow::Result<Vec<TagPlaceholder>> {
    let mut out: Vec<TagPlaceholder> = Vec::new();
    let mut idx = para.start_event + 1;
    while idx < para.end_event {
        match &part.events[idx] {
            XmlEvent::Start { name, .. } => {
                if let Some(kind) = placeholder_kind(name) {
                    let end = subtree_end(part, idx, name);
                    out.push(TagPlaceholder {
                        id: ids.fresh(kind),
                        kind,
                        original_tag: write_event_range(part, idx, end + 1)?,
                        span_start: idx,
                        span_end: end + 1,
                        metadata: None,
                    });
                    idx = end + 1;
                    continue;
                }
            }
            XmlEvent::Empty { name, .. } => {
                if let Some(kind) = placeholder_kind(name) {
                    out.push(TagPlaceholder {
                        id: ids.fresh(kind),
                        kind,
                        original_tag: write_event_range(part, idx, idx + 1)?,
                        span_start: idx,
                        span_end: idx + 1,
                        metadata: None,
                    });
                }
            }
            _ => {}
        }
        idx += 1;
    }
    Ok(out)
}

fn subtree_end(part: &XmlPart, start: usize, name: &str) -> usize {
    let mut depth = 0usize;
    for (idx, ev) in part.events.iter().enumerate().skip(start) {
        match ev {
            XmlEvent::Start { name: n, .. } if n == name => depth += 1,
            XmlEvent::End { name: n } if n == name => {
                depth -= 1;
                if depth == 0 {
                    return idx;
                }
            }
            _ => {}
        }
    }
    part.events.len().saturating_sub(1)
}
