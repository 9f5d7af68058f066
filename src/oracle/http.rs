use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::TranslationConfig;
use crate::error::OracleError;
use crate::progress::ConsoleProgress;

use super::clean::clean_translation_output;
use super::TranslationOracle;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "你是一个专业翻译引擎。你必须严格遵守：1.只输出纯翻译文本；\
2.源文本与译文必须一一对应，不增不减；3.绝对不输出任何提示词、规则、说明、注释或标记；\
4.如有歧义，直接选择最合理的一种翻译；5.保持简洁精确。任何额外内容都会导致翻译结果无法使用。";

const HOSTED_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// Blocking HTTP client for both backend variants. One request in flight at a time by
/// construction; the per-call timeout makes a hung backend count as a failed attempt.
pub struct HttpOracle {
    client: reqwest::blocking::Client,
    config: TranslationConfig,
    progress: ConsoleProgress,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct SamplingOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct LocalRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Serialize)]
struct HostedRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    temperature: f32,
    top_p: f32,
}

impl HttpOracle {
    pub fn new(config: TranslationConfig, progress: ConsoleProgress) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            config,
            progress,
        })
    }

    fn messages<'a>(text: &str, source_lang: &str, target_lang: &str) -> Vec<ChatMessage<'a>> {
        vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!(
                    "将以下{source_lang}文本翻译成{target_lang}，只输出纯翻译结果：\n\n{text}"
                ),
            },
        ]
    }

    fn call_local(
        &self,
        endpoint: &str,
        model: &str,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, OracleError> {
        let url = format!("{}/api/chat", endpoint.trim_end_matches('/'));
        let body = LocalRequest {
            model,
            messages: Self::messages(text, source_lang, target_lang),
            stream: false,
            options: SamplingOptions {
                temperature: 0.7,
                top_p: 0.9,
            },
        };
        let raw = self.client.post(&url).json(&body).send()?.text()?;
        let (extracted, via_heuristic) = decode_local_reply(&raw)?;
        if via_heuristic {
            self.progress
                .warn("local backend reply had no known shape, used longest-string heuristic");
        }
        Ok(clean_translation_output(&extracted))
    }

    fn call_hosted(
        &self,
        api_key: &str,
        model: &str,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, OracleError> {
        let body = HostedRequest {
            model,
            messages: Self::messages(text, source_lang, target_lang),
            stream: false,
            temperature: 0.7,
            top_p: 0.9,
        };
        let raw = self
            .client
            .post(HOSTED_API_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()?
            .text()?;
        let extracted = decode_hosted_reply(&raw)?;
        Ok(clean_translation_output(&extracted))
    }
}

impl TranslationOracle for HttpOracle {
    fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, OracleError> {
        match &self.config {
            TranslationConfig::LocalModel { endpoint, model } => {
                self.call_local(endpoint, model, text, source_lang, target_lang)
            }
            TranslationConfig::HostedApi { api_key, model } => {
                self.call_hosted(api_key, model, text, source_lang, target_lang)
            }
        }
    }
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

/// Known local-backend reply shapes, tried in order.
#[derive(Deserialize)]
#[serde(untagged)]
enum LocalReply {
    Chat { message: ReplyMessage },
    Generate { response: String },
    Content { content: String },
    Bare(String),
}

/// Decode a local-backend reply body. Returns the extracted text and whether the
/// longest-string heuristic (rather than a known shape) produced it. A body that is not
/// JSON at all is taken verbatim, matching lenient backends that stream plain text.
pub fn decode_local_reply(raw: &str) -> Result<(String, bool), OracleError> {
    if raw.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }

    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return Ok((raw.trim().to_string(), false)),
    };

    if let Ok(reply) = serde_json::from_value::<LocalReply>(value.clone()) {
        let text = match reply {
            LocalReply::Chat { message } => message.content,
            LocalReply::Generate { response } => response,
            LocalReply::Content { content } => content,
            LocalReply::Bare(s) => s,
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        return Ok((text, false));
    }

    match longest_string_in(&value, 0) {
        Some(text) if !text.trim().is_empty() => Ok((text.trim().to_string(), true)),
        _ => Err(OracleError::BadShape(excerpt(raw))),
    }
}

#[derive(Deserialize)]
struct HostedChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct HostedApiError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct HostedReply {
    #[serde(default)]
    choices: Vec<HostedChoice>,
    error: Option<HostedApiError>,
}

/// Decode a hosted-API reply body: `choices[0].message.content`, with API-reported
/// errors surfaced as `OracleError::Backend`.
pub fn decode_hosted_reply(raw: &str) -> Result<String, OracleError> {
    if raw.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    let reply: HostedReply =
        serde_json::from_str(raw).map_err(|_| OracleError::BadShape(excerpt(raw)))?;

    if let Some(err) = reply.error {
        return Err(OracleError::Backend(
            err.message.unwrap_or_else(|| "unspecified error".to_string()),
        ));
    }
    let content = reply
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| OracleError::BadShape(excerpt(raw)))?;
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    Ok(content)
}

/// Depth-bounded walk collecting the longest plausible text value. Short strings only
/// count when their key suggests text content.
fn longest_string_in(value: &Value, depth: usize) -> Option<String> {
    if depth > 3 {
        return None;
    }
    let mut best: Option<String> = None;
    let mut consider = |candidate: Option<String>| {
        if let Some(c) = candidate {
            if best.as_ref().map_or(true, |b| c.len() > b.len()) {
                best = Some(c);
            }
        }
    };
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                match v {
                    Value::String(s) if !s.trim().is_empty() => {
                        let key_lc = key.to_lowercase();
                        if s.len() > 10 || key_lc.contains("text") || key_lc.contains("content") {
                            consider(Some(s.clone()));
                        }
                    }
                    Value::Object(_) | Value::Array(_) => {
                        consider(longest_string_in(v, depth + 1));
                    }
                    _ => {}
                }
            }
        }
        Value::Array(items) => {
            for v in items {
                consider(longest_string_in(v, depth + 1));
            }
        }
        _ => {}
    }
    best
}

fn excerpt(raw: &str) -> String {
    let cut: String = raw.chars().take(120).collect();
    if cut.len() < raw.len() {
        format!("{cut}...")
    } else {
        cut
    }
}
