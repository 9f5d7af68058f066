//! Cleaning of raw oracle output. Chat-tuned models routinely wrap the translation in
//! explanation scaffolding (labels, bracketed instruction echoes, think blocks, role
//! markers). Strip only what is clearly not translation, and when stripping leaves too
//! little behind, prefer the raw text over an empty result.

use once_cell::sync::Lazy;
use regex::Regex;

static REQUIREMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)【[^】]*要求】.*?(\n\n|\z)").expect("requirement re"));
static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"【([^】]*)】").expect("bracket re"));
static TERM_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^术语表：[^\n]*\n?").expect("term table re"));
static SOURCE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^原文：[^\n]*\n?").expect("source line re"));
static TARGET_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(译文|翻译|翻译结果)：\s*").expect("target label re"));
static INSTRUCTION_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^(注|备注|思考|解释|说明|Note)[:：][^\n]*\n?").expect("instruction re")
});
static EXPLANATION_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(注|备注|思考|解释|说明|Note|原文|原句|翻译|译文|Translation)[:：]")
        .expect("explanation marker re")
});
static THINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think re"));
static DUAL_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)原文[:：](.*?)\n.*?翻译[:：](.*)").expect("dual block re"));
static TRANSLATION_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Translation[:：](.*)").expect("translation label re"));
static RESULT_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)翻译结果[:：](.*)").expect("result label re"));
static TARGET_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)译文[:：](.*)").expect("target text re"));
static ROLE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^(system|user|assistant):\s*").expect("role marker re"));
static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^```.*?```$").expect("code fence re"));

fn strip_guarded(input: &str, re: &Regex) -> String {
    let stripped = re.replace_all(input, "");
    if stripped.trim().is_empty() {
        input.to_string()
    } else {
        stripped.into_owned()
    }
}

/// Strip explanation scaffolding from a raw oracle reply. Guard: if the cleaned result
/// is under 5 characters or under 20% of the think-stripped raw text, the raw text wins.
/// Idempotent on marker-free text.
pub fn clean_translation_output(text: &str) -> String {
    // Think blocks are reasoning scaffolding, never translation. Remove them before
    // anything else is measured, so their length cannot count toward the guard baseline
    // and a raw result can never resurrect one.
    let text = THINK_RE.replace_all(text, "");
    if text.trim().is_empty() {
        return String::new();
    }
    let original = text.trim().to_string();

    let mut result = REQUIREMENT_RE.replace(&text, "$1").into_owned();
    if result.trim().is_empty() {
        result = text.to_string();
    }
    result = BRACKET_RE.replace_all(&result, "$1").into_owned();
    result = strip_guarded(&result, &TERM_TABLE_RE);
    result = strip_guarded(&result, &SOURCE_LINE_RE);
    result = TARGET_LABEL_RE.replace_all(&result, "").into_owned();
    result = strip_guarded(&result, &INSTRUCTION_LINE_RE);

    if EXPLANATION_MARKER_RE.is_match(&result) {
        let extracted = DUAL_BLOCK_RE
            .captures(&result)
            .and_then(|c| c.get(2))
            .or_else(|| TRANSLATION_LABEL_RE.captures(&result).and_then(|c| c.get(1)))
            .or_else(|| RESULT_LABEL_RE.captures(&result).and_then(|c| c.get(1)))
            .or_else(|| TARGET_TEXT_RE.captures(&result).and_then(|c| c.get(1)))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        match extracted {
            Some(text) => result = text,
            None => result = strip_guarded(&result, &INSTRUCTION_LINE_RE),
        }
    }

    let cleaned = result.trim().to_string();
    let cleaned_chars = cleaned.chars().count();
    let original_chars = original.chars().count();

    if cleaned_chars >= 5 && cleaned_chars * 5 >= original_chars {
        return cleaned;
    }

    // Cleaning took too much; fall back to a light pass over the raw text.
    let mut simple = ROLE_MARKER_RE.replace_all(&original, "").into_owned();
    simple = CODE_FENCE_RE.replace_all(&simple, "").into_owned();
    let simple = simple.trim().to_string();
    let simple_chars = simple.chars().count();
    if simple_chars >= 5 && simple_chars * 2 >= original_chars {
        simple
    } else {
        original
    }
}
