//! Reqwest-based LLM client implementing OpenAI-compatible Chat Completions streaming.

use std::{
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    cache::RequestCache,
    config::{Config, DEFAULT_API_BASE_URL},
    error::LlmError,
    language::Language,
    responses::ResponseSchema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: Option<u32>,
    /// Ask the endpoint for a JSON object response.
    pub json: bool,
}

impl ChatOptions {
    /// Deterministic settings used for every pipeline call.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self { model: model.into(), temperature: 0.0, top_p: 1.0, max_tokens: None, json: true }
    }
}

/// Token usage as reported in the final stream chunk. `cost` is OpenRouter specific.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// One entry of the usage ledger, one per call.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmCallRecord {
    pub method: String,
    pub model: String,
    pub usage: Usage,
    pub cached: bool,
}

#[derive(Debug)]
pub enum StreamEvent {
    Content(String),
    Usage(Usage),
    Done,
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: Option<RequestCache>,
    ledger: Arc<Mutex<Vec<LlmCallRecord>>>,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> Result<Self, LlmError> {
        let timeout = cfg.get_u64("REQUEST_TIMEOUT").unwrap_or(60);
        let api_base_url = cfg
            .get("API_BASE_URL")
            .filter(|v| !v.trim().is_empty() && v != "default")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
        let trimmed = api_base_url.trim_end_matches('/');
        let base_url = if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
            format!("{}/v1", trimmed)
        } else {
            trimmed.to_string()
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: cfg.api_key(),
            cache: RequestCache::from_config(cfg),
            ledger: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Snapshot of every call made through this client so far.
    pub fn usage(&self) -> Vec<LlmCallRecord> {
        self.ledger.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn record(&self, entry: LlmCallRecord) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.push(entry);
        }
    }

    pub fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        opts: ChatOptions,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>> {
        let http = self.http.clone();
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let api_key = self.api_key.clone();

        Box::pin(stream! {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
            if let Some(key) = api_key {
                match HeaderValue::from_str(&format!("Bearer {}", key)) {
                    Ok(hv) => {
                        headers.insert(AUTHORIZATION, hv);
                    }
                    Err(e) => {
                        yield Err(LlmError::from(e));
                        return;
                    }
                }
            }

            let mut body = serde_json::json!({
                "model": opts.model,
                "temperature": opts.temperature,
                "top_p": opts.top_p,
                "messages": messages,
                "stream": true,
                "stream_options": { "include_usage": true },
            });
            if let Some(max) = opts.max_tokens {
                body["max_tokens"] = serde_json::json!(max);
            }
            if opts.json {
                body["response_format"] = serde_json::json!({ "type": "json_object" });
            }

            let resp = match http.post(url).headers(headers).json(&body).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(LlmError::from(e));
                    return;
                }
            };

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                yield Err(LlmError::Status { status, body });
                return;
            }

            let mut buf = String::new();
            let mut bytes = resp.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::from(e));
                        return;
                    }
                };
                buf.push_str(&String::from_utf8_lossy(&chunk));
                // process lines
                while let Some(pos) = buf.find('\n') {
                    let line = buf[..pos].trim().to_string();
                    buf.drain(..=pos);
                    for event in parse_sse_line(&line) {
                        let done = matches!(event, StreamEvent::Done);
                        yield Ok(event);
                        if done {
                            return;
                        }
                    }
                }
            }
            yield Ok(StreamEvent::Done);
        })
    }

    /// Run one chat completion to the end and return the concatenated text.
    #[instrument(skip(self, messages, opts), fields(model = %opts.model))]
    pub async fn complete(
        &self,
        method: &str,
        messages: Vec<ChatMessage>,
        opts: ChatOptions,
    ) -> Result<String, LlmError> {
        let cache_key = self
            .cache
            .as_ref()
            .map(|c| c.key_for(&self.base_url, &opts.model, opts.temperature, &messages));
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(text) = cache.get(key) {
                debug!("cache hit");
                self.record(LlmCallRecord {
                    method: method.to_string(),
                    model: opts.model.clone(),
                    usage: Usage::default(),
                    cached: true,
                });
                return Ok(text);
            }
        }

        let model = opts.model.clone();
        let mut stream = self.chat_stream(messages, opts);
        let mut text = String::new();
        let mut usage = Usage::default();
        while let Some(ev) = stream.next().await {
            match ev? {
                StreamEvent::Content(t) => text.push_str(&t),
                StreamEvent::Usage(u) => usage = u,
                StreamEvent::Done => break,
            }
        }
        debug!(tokens = usage.total_tokens, "completion finished");
        self.record(LlmCallRecord { method: method.to_string(), model, usage, cached: false });

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse(method.to_string()));
        }
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Err(e) = cache.set(key, &text) {
                warn!(error = %e, "failed to write response cache");
            }
        }
        Ok(text)
    }

    /// System + user prompt in, typed JSON object out.
    pub async fn complete_structured<T: ResponseSchema>(
        &self,
        method: &str,
        language: Language,
        system_prompt: &str,
        user_prompt: String,
        opts: ChatOptions,
    ) -> Result<T, LlmError> {
        let system = format!(
            "{}\n\n{}\n{}",
            system_prompt.trim(),
            json_instruction(language),
            T::schema(language)
        );
        let messages = vec![
            ChatMessage::new(Role::System, system),
            ChatMessage::new(Role::User, user_prompt),
        ];
        let text = self.complete(method, messages, opts).await?;
        parse_structured(method, &text)
    }
}

fn json_instruction(language: Language) -> &'static str {
    match language {
        Language::En => "Respond with a single JSON object and nothing else, in exactly this shape:",
        Language::De => "Antworte ausschließlich mit einem einzigen JSON-Objekt in genau dieser Form:",
    }
}

pub fn parse_structured<T: DeserializeOwned>(method: &str, text: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_code_fence(text))
        .map_err(|source| LlmError::Malformed { method: method.to_string(), source })
}

/// Drop a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    match t.strip_prefix("```") {
        Some(rest) => {
            let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
            let body = body.trim_end();
            body.strip_suffix("```").unwrap_or(body).trim()
        }
        None => t,
    }
}

fn parse_sse_line(line: &str) -> Vec<StreamEvent> {
    if line.is_empty() || line.starts_with(':') {
        return Vec::new();
    }
    let Some(payload) = line.strip_prefix("data:") else {
        return Vec::new();
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return vec![StreamEvent::Done];
    }
    let Ok(chunk) = serde_json::from_str::<Chunk>(payload) else {
        // ignore malformed lines
        return Vec::new();
    };
    let mut events = Vec::new();
    for choice in chunk.choices {
        if let Some(content) = choice.delta.and_then(|d| d.content) {
            if !content.is_empty() {
                events.push(StreamEvent::Content(content));
            }
        }
    }
    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(usage));
    }
    events
}

// Minimal chunk structures for OpenAI-like streaming
#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::RegenerationDecision;

    #[test]
    fn sse_content_and_usage_chunks() {
        let events = parse_sse_line(r#"data: {"choices":[{"delta":{"content":"{\"should"}}]}"#);
        assert!(matches!(events.as_slice(), [StreamEvent::Content(c)] if c == "{\"should"));

        let events = parse_sse_line(
            r#"data: {"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15,"cost":0.002}}"#,
        );
        match events.as_slice() {
            [StreamEvent::Usage(u)] => {
                assert_eq!(u.total_tokens, 15);
                assert_eq!(u.cost, Some(0.002));
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn sse_done_comments_and_garbage() {
        assert!(matches!(parse_sse_line("data: [DONE]").as_slice(), [StreamEvent::Done]));
        assert!(parse_sse_line(": keep-alive").is_empty());
        assert!(parse_sse_line("data: {not json").is_empty());
        assert!(parse_sse_line("event: ping").is_empty());
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
    }

    #[test]
    fn structured_parse_reports_method_on_failure() {
        let ok: RegenerationDecision =
            parse_structured("decide", "```json\n{\"should_be_regenerated\": true}\n```").unwrap();
        assert!(ok.should_be_regenerated);

        let err = parse_structured::<RegenerationDecision>("decide", "yes").unwrap_err();
        assert!(matches!(err, LlmError::Malformed { ref method, .. } if method == "decide"));
    }

    #[test]
    fn base_url_gets_v1_suffix() {
        let cfg = Config::from_pairs([("API_BASE_URL", "http://localhost:8080/")]);
        let client = LlmClient::from_config(&cfg).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v1");

        let cfg = Config::from_pairs(Vec::<(String, String)>::new());
        let client = LlmClient::from_config(&cfg).unwrap();
        assert_eq!(client.base_url(), DEFAULT_API_BASE_URL);
    }
}
