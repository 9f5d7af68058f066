use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Paragraph,
    Sentence,
    Run,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderKind {
    Style,
    Image,
    Table,
    Other,
}

impl PlaceholderKind {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Image => "image",
            Self::Table => "table",
            Self::Other => "other",
        }
    }
}

/// An opaque non-text construct lifted out of a paragraph so translation never sees it.
/// `span` indexes into the parsed event vector of the source part; `original_tag` is the
/// serialized markup of that range. Consulted only during output assembly; re-insertion
/// into the translated text is an extension point, not implemented here.
#[derive(Clone, Debug, Serialize)]
pub struct TagPlaceholder {
    pub id: String,
    pub kind: PlaceholderKind,
    pub original_tag: String,
    pub span_start: usize,
    pub span_end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// The unit of translation. `original_markup` is the exact serialized source fragment the
/// segment was extracted from and stays byte-identical until deliberately replaced.
#[derive(Clone, Debug, Serialize)]
pub struct TextSegment {
    pub id: String,
    pub kind: SegmentKind,
    pub text: String,
    pub original_markup: String,
    pub placeholders: Vec<TagPlaceholder>,
}

#[derive(Clone, Debug)]
pub struct TranslatedSegment {
    pub segment: TextSegment,
    pub translated_text: String,
}

/// A segment whose oracle calls were exhausted; carried in the job report.
#[derive(Clone, Debug)]
pub struct SegmentFailure {
    pub segment_id: String,
    pub attempts: u32,
    pub last_error: String,
}

/// Deterministic per-job placeholder ID source. Counter-based so that extracting the same
/// document twice yields identical segment lists.
#[derive(Default)]
pub struct PlaceholderIdGen {
    next: usize,
}

impl PlaceholderIdGen {
    pub fn fresh(&mut self, kind: PlaceholderKind) -> String {
        self.next += 1;
        format!("{}_{:04}", kind.prefix(), self.next)
    }
}
