//! External LLM judge reached through an OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{FactVerifier, JudgeError};

/// OpenRouter chat completions endpoint.
pub const DEFAULT_JUDGE_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model used for fact verification unless overridden.
pub const DEFAULT_JUDGE_MODEL: &str = "openai/gpt-5";

/// Env var holding the judge credential; its presence selects the LLM judge.
pub const JUDGE_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Env var overriding [`DEFAULT_JUDGE_MODEL`].
pub const JUDGE_MODEL_ENV: &str = "JUDGE_MODEL";

/// Prompt template; `{fact}` and `{response}` are substituted.
pub const DEFAULT_JUDGE_PROMPT: &str = r#"You are a fact verification judge. Your task is to determine if a given fact is represented or supported by the response text.

FACT TO VERIFY:
{fact}

RESPONSE TEXT:
{response}

Instructions:
- Determine if the response contains information that supports or represents the fact
- The fact doesn't need to be stated verbatim, but the core information should be present
- Be strict: partial matches or vague similarities are not sufficient
- Consider semantic equivalence, not just keyword matching

Answer with ONLY "true" or "false" (lowercase, no explanation)."#;

/// Judge settings, passed explicitly to [`LlmJudge::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub prompt_template: String,
    pub timeout_secs: u64,
}

impl JudgeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_JUDGE_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_JUDGE_MODEL.to_string(),
            max_tokens: 10,
            prompt_template: DEFAULT_JUDGE_PROMPT.to_string(),
            timeout_secs: 30,
        }
    }

    /// Config from the environment, or `None` when no credential is set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(JUDGE_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var(JUDGE_MODEL_ENV) {
            config.model = model;
        }
        Some(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Render the judge prompt for one fact.
    ///
    /// Placeholders are substituted in a single pass over the template, so
    /// braces inside the fact or response text are never expanded.
    pub fn render_prompt(&self, fact: &str, response: &str) -> String {
        let mut out = String::with_capacity(self.prompt_template.len() + fact.len() + response.len());
        let mut rest = self.prompt_template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            if let Some(after) = tail.strip_prefix("{fact}") {
                out.push_str(fact);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{response}") {
                out.push_str(response);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// The judge's verdict is the literal answer `"true"`, case and whitespace aside.
pub fn parse_verdict(answer: &str) -> bool {
    answer.trim().to_lowercase() == "true"
}

/// Fact verifier that asks an external LLM for a `true`/`false` answer.
pub struct LlmJudge {
    config: JudgeConfig,
    http: reqwest::Client,
}

impl LlmJudge {
    pub fn new(config: JudgeConfig) -> Result<Self, JudgeError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("factbench/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }
}

#[async_trait]
impl FactVerifier for LlmJudge {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn judge(&self, fact: &str, response: &str) -> Result<bool, JudgeError> {
        let prompt = self.config.render_prompt(fact, response);
        let request = ChatRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let reply = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = reply.status();
        if !status.is_success() {
            let body = reply.text().await.unwrap_or_default();
            return Err(JudgeError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body: ChatResponse = reply.json().await?;
        let answer = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| JudgeError::MalformedResponse("no message content".to_string()))?;

        Ok(parse_verdict(&answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its URL.
    async fn canned_endpoint(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let reply = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/v1/chat/completions")
    }

    /// Consume the request headers and its `content-length` body.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            data.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&data).to_string();
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }

    fn completion(content: &str) -> String {
        serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
            .to_string()
    }

    #[test]
    fn test_parse_verdict_is_literal() {
        assert!(parse_verdict("true"));
        assert!(parse_verdict("  TRUE\n"));
        assert!(!parse_verdict("false"));
        assert!(!parse_verdict("true."));
        assert!(!parse_verdict("yes"));
    }

    #[test]
    fn test_render_prompt_substitutes_placeholders() {
        let config = JudgeConfig::new("key");
        let prompt = config.render_prompt("caches expire", "entries expire after 60s");
        assert!(prompt.contains("FACT TO VERIFY:\ncaches expire"));
        assert!(prompt.contains("RESPONSE TEXT:\nentries expire after 60s"));
        assert!(!prompt.contains("{fact}"));
    }

    #[test]
    fn test_render_prompt_leaves_placeholders_in_inputs_alone() {
        let config = JudgeConfig {
            prompt_template: "F={fact} R={response} {other}".to_string(),
            ..JudgeConfig::new("key")
        };
        let prompt = config.render_prompt("format!(\"{response}\")", "uses {fact} braces");
        assert_eq!(
            prompt,
            "F=format!(\"{response}\") R=uses {fact} braces {other}"
        );
    }

    #[tokio::test]
    async fn test_judge_accepts_true_answer() {
        let url = canned_endpoint("200 OK", completion("True")).await;
        let judge = LlmJudge::new(JudgeConfig::new("key").with_endpoint(url)).unwrap();
        assert!(judge.judge("fact", "response").await.unwrap());
    }

    #[tokio::test]
    async fn test_judge_rejects_other_answers() {
        let url = canned_endpoint("200 OK", completion("false")).await;
        let judge = LlmJudge::new(JudgeConfig::new("key").with_endpoint(url)).unwrap();
        assert!(!judge.judge("fact", "response").await.unwrap());
    }

    #[tokio::test]
    async fn test_judge_http_error_status() {
        let url = canned_endpoint("429 Too Many Requests", "{}".to_string()).await;
        let judge = LlmJudge::new(JudgeConfig::new("key").with_endpoint(url)).unwrap();
        match judge.judge("fact", "response").await {
            Err(JudgeError::Status { status, .. }) => assert_eq!(status, 429),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_judge_malformed_body() {
        let url = canned_endpoint("200 OK", r#"{"choices": []}"#.to_string()).await;
        let judge = LlmJudge::new(JudgeConfig::new("key").with_endpoint(url)).unwrap();
        assert!(matches!(
            judge.judge("fact", "response").await,
            Err(JudgeError::MalformedResponse(_))
        ));
    }
}
