use once_cell::sync::Lazy;
use regex::Regex;

use crate::progress::ConsoleProgress;

/// At or above this size, tag-balance counting is skipped and only the declaration and
/// root wrapper are checked. Measured in bytes; WordprocessingML markup is ASCII-heavy,
/// so bytes track characters closely enough for a performance cutoff.
pub const FULL_CHECK_LIMIT: usize = 100_000;

const STRUCTURAL_TAGS: &[&str] = &["w:document", "w:body", "w:p", "w:r", "w:t"];

// Open-tag pattern is written so self-closing elements (`<w:p/>`, `<w:p a="b"/>`)
// count as neither open nor close.
static TAG_PAIRS: Lazy<Vec<(&'static str, Regex, Regex)>> = Lazy::new(|| {
    STRUCTURAL_TAGS
        .iter()
        .map(|tag| {
            let open = Regex::new(&format!(r"<{tag}(\s[^>]*[^/>])?>")).expect("open tag re");
            let close = Regex::new(&format!(r"</{tag}>")).expect("close tag re");
            (*tag, open, close)
        })
        .collect()
});

static DOCUMENT_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:document[^>]*>").expect("document open re"));
static LEADING_DECL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>\s*").expect("decl re"));

/// Structural soundness check for a serialized document part. Small parts get per-tag
/// open/close balance counting; parts at or above `FULL_CHECK_LIMIT` get only the
/// declaration and root-wrapper presence checks.
pub fn is_valid_document_xml(xml: &str, progress: &ConsoleProgress) -> bool {
    if xml.trim().is_empty() {
        return false;
    }

    let has_declaration = xml.contains("<?xml");
    let has_document = xml.contains("<w:document") && xml.contains("</w:document>");

    if xml.len() >= FULL_CHECK_LIMIT {
        progress.info("large document, using reduced validation");
        return has_declaration && has_document;
    }

    for (tag, open_re, close_re) in TAG_PAIRS.iter() {
        let opens = open_re.find_iter(xml).count();
        let closes = close_re.find_iter(xml).count();
        if opens > 0 && opens != closes {
            progress.warn(&format!(
                "validation failed: {tag} unbalanced ({opens} open, {closes} close)"
            ));
            return false;
        }
    }

    let has_body = xml.contains("<w:body") && xml.contains("</w:body>");
    if has_document && !has_body {
        progress.warn("validation: document wrapper present but body missing");
        return false;
    }

    has_declaration && has_document
}

/// Bounded repair: inject a missing declaration, then synthesize missing root/body
/// wrappers around the existing content. The caller re-validates the result once and
/// rolls back if it is still invalid.
pub fn repair_document_xml(xml: &str) -> String {
    let mut out = xml.to_string();

    if !out.trim_start().starts_with("<?xml") {
        out = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n{out}"
        );
    }

    if !out.contains("<w:document") {
        let content = LEADING_DECL_RE.replace(&out, "").into_owned();
        out = format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
                "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
                "<w:body>{}</w:body></w:document>"
            ),
            content
        );
    } else if !out.contains("<w:body") {
        if let Some(m) = DOCUMENT_OPEN_RE.find(&out) {
            let insert_at = m.end();
            out.insert_str(insert_at, "<w:body>");
            if let Some(pos) = out.rfind("</w:document>") {
                out.insert_str(pos, "</w:body>");
            }
        }
    }

    out
}
