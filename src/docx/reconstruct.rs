use super::matcher::ParagraphRecord;
use super::xml::{XmlEvent, XmlPart};

/// Rewrite every claimed paragraph in place, back-to-front by document position.
/// The translated text goes into the first non-empty text run; every other text run is
/// cleared to an empty string so run wrappers and their formatting stay balanced.
/// Returns the number of paragraphs rewritten.
pub fn apply_translations(part: &mut XmlPart, paragraphs: &[ParagraphRecord]) -> usize {
    let mut applied = 0usize;
    for para in paragraphs.iter().rev() {
        let translated = match (&para.translated_text, para.claimed) {
            (Some(t), true) => t,
            _ => continue,
        };

        let target = para
            .runs
            .iter()
            .find(|r| !r.text.is_empty())
            .and_then(|r| r.text_event.map(|te| (r.elem_event, te)));
        let Some((target_elem, target_text)) = target else {
            continue;
        };

        for run in &para.runs {
            let Some(text_event) = run.text_event else {
                continue;
            };
            if let XmlEvent::Text { text } = &mut part.events[text_event] {
                if text_event == target_text {
                    *text = translated.clone();
                } else {
                    text.clear();
                }
            }
        }

        if translated.starts_with(char::is_whitespace) || translated.ends_with(char::is_whitespace)
        {
            ensure_space_preserve(&mut part.events[target_elem]);
        }
        applied += 1;
    }
    applied
}

fn ensure_space_preserve(event: &mut XmlEvent) {
    if let XmlEvent::Start { attrs, .. } = event {
        if !attrs.iter().any(|(k, _)| k == "xml:space") {
            attrs.push(("xml:space".to_string(), "preserve".to_string()));
        }
    }
}
