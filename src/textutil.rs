use once_cell::sync::Lazy;
use regex::Regex;

static WS_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws run"));
static CJK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]").expect("cjk"));
static LATIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").expect("latin"));

/// Collapse internal whitespace runs to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    WS_RUN_RE.replace_all(text.trim(), " ").into_owned()
}

const PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'', '\u{201c}',
    '\u{201d}', '\u{2018}', '\u{2019}', '「', '」', '『', '』', '-', '—', '–',
];

/// Drop punctuation and collapse whitespace; used by the fuzzy matching tier.
pub fn strip_punctuation(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !PUNCTUATION.contains(c)).collect();
    normalize_whitespace(&stripped)
}

fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '\n')
}

/// Split into sentences on `.!?`, CJK equivalents and line breaks, keeping each
/// terminator run attached to the preceding sentence. Whitespace-only pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_terminator = false;
    for c in text.chars() {
        if is_sentence_terminator(c) {
            current.push(c);
            in_terminator = true;
        } else {
            if in_terminator {
                let piece = current.trim();
                if !piece.is_empty() {
                    out.push(piece.to_string());
                }
                current.clear();
                in_terminator = false;
            }
            current.push(c);
        }
    }
    let piece = current.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
    out
}

/// Guess a (source, target) language pair from text excerpts by CJK/Latin balance.
pub fn auto_language_pair(excerpts: &[String]) -> (String, String) {
    let mut cjk = 0usize;
    let mut latin = 0usize;
    for ex in excerpts {
        cjk += CJK_RE.find_iter(ex).count();
        latin += LATIN_RE.find_iter(ex).count();
    }
    if cjk >= latin.saturating_mul(2).max(12) {
        ("zh".to_string(), "en".to_string())
    } else {
        ("en".to_string(), "zh".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_runs() {
        assert_eq!(normalize_whitespace("  a \t b\n\nc "), "a b c");
    }

    #[test]
    fn strip_punctuation_keeps_words() {
        assert_eq!(strip_punctuation("Hello, world! (test)"), "Hello world test");
        // CJK sentence terminators are not in the strip set; brackets and dashes are.
        assert_eq!(strip_punctuation("「你好」——世界。"), "你好世界。");
    }

    #[test]
    fn split_keeps_terminators_attached() {
        let s = split_sentences("Hello world. How are you? Fine!");
        assert_eq!(s, vec!["Hello world.", "How are you?", "Fine!"]);
    }

    #[test]
    fn split_handles_cjk_and_newlines() {
        let s = split_sentences("你好。世界！\n第三句");
        assert_eq!(s, vec!["你好。", "世界！", "第三句"]);
    }

    #[test]
    fn split_groups_terminator_runs() {
        let s = split_sentences("Wait... what?!");
        assert_eq!(s, vec!["Wait...", "what?!"]);
    }

    #[test]
    fn language_pair_detection() {
        let zh = vec!["这是一段足够长的中文文本，用于检测语言。".to_string()];
        assert_eq!(auto_language_pair(&zh), ("zh".to_string(), "en".to_string()));
        let en = vec!["This is a reasonably long English excerpt.".to_string()];
        assert_eq!(auto_language_pair(&en), ("en".to_string(), "zh".to_string()));
    }
}
