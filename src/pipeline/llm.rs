//! Chat-completion call against an OpenAI-compatible endpoint.
//!
//! One request, two messages (system, user), one answer. LM Studio, Ollama,
//! vLLM and llama.cpp's server all speak this schema.
//!
//! ## No retries
//!
//! A failed call is reported immediately. Generation is user-initiated and
//! can take a minute; a silent retry would double the wait for a server that
//! is down. The caller decides whether to re-issue the request.
//!
//! ## Error mapping
//!
//! | Situation | Error |
//! |-----------|-------|
//! | connection refused, DNS, timeout, non-2xx | [`ReportError::Transport`] |
//! | 2xx without `choices[0].message.content` | [`ReportError::MalformedResponse`] |

use crate::config::{lenient, LlmSettings};
use crate::error::ReportError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Per-request ceiling, connection included.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Token accounting reported by the server, when it reports any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// `choices[0].message.content`, unmodified.
    pub content: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    /// Informational only; an odd shape is dropped, never an error.
    #[serde(default, deserialize_with = "lenient")]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// HTTP client for the chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
}

impl LlmClient {
    /// Client with the fixed [`REQUEST_TIMEOUT_SECS`] timeout.
    pub fn new() -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReportError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Send one system + user exchange and return the model's answer.
    pub async fn generate(
        &self,
        settings: &LlmSettings,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<Completion, ReportError> {
        let endpoint = settings.endpoint();
        let body = ChatRequest {
            model: &settings.model_name,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        info!("Calling {} (model {})", endpoint, settings.model_name);
        let start = Instant::now();

        let transport = |detail: String| ReportError::Transport {
            endpoint: endpoint.clone(),
            detail,
        };

        let response = self
            .http
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", settings.bearer()))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(describe(&e)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| transport(describe(&e)))?;

        if !status.is_success() {
            return Err(transport(format!("HTTP {status}: {}", raw.trim())));
        }

        let completion = parse_completion(&raw)?;
        debug!(
            "Completion in {:?}: {} chars, usage {:?}",
            start.elapsed(),
            completion.content.len(),
            completion.usage
        );
        Ok(completion)
    }
}

/// Extract `choices[0].message.content` from a 2xx body.
pub fn parse_completion(raw: &str) -> Result<Completion, ReportError> {
    let malformed = || ReportError::MalformedResponse {
        body: raw.to_string(),
    };
    let parsed: ChatResponse = serde_json::from_str(raw).map_err(|_| malformed())?;
    let first = parsed.choices.into_iter().next().ok_or_else(malformed)?;
    Ok(Completion {
        content: first.message.content,
        usage: parsed.usage,
    })
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out after {REQUEST_TIMEOUT_SECS}s")
    } else if e.is_connect() {
        format!("connection failed ({e})")
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn settings_for(url: &str) -> LlmSettings {
        LlmSettings::builder()
            .base_url(url)
            .model_name("llama-3.1-8b-instruct")
            .api_key("sk-local")
            .temperature(0.2)
            .max_tokens(1500)
            .build()
    }

    #[test]
    fn parse_completion_ok() {
        let c = parse_completion(
            r#"{"choices":[{"message":{"role":"assistant","content":"Conclusion: ECG normal."}}],
                "usage":{"prompt_tokens":120,"completion_tokens":8,"total_tokens":128}}"#,
        )
        .unwrap();
        assert_eq!(c.content, "Conclusion: ECG normal.");
        assert_eq!(
            c.usage,
            Some(TokenUsage {
                prompt_tokens: 120,
                completion_tokens: 8
            })
        );
    }

    #[test]
    fn odd_usage_block_does_not_void_content() {
        for body in [
            r#"{"choices":[{"message":{"content":"ok"}}],"usage":{"prompt_tokens":null,"completion_tokens":3}}"#,
            r#"{"choices":[{"message":{"content":"ok"}}],"usage":{"prompt_tokens":-1,"completion_tokens":3}}"#,
            r#"{"choices":[{"message":{"content":"ok"}}],"usage":"n/a"}"#,
            r#"{"choices":[{"message":{"content":"ok"}}],"usage":null}"#,
        ] {
            let c = parse_completion(body).unwrap_or_else(|e| panic!("{body}: {e}"));
            assert_eq!(c.content, "ok");
            assert_eq!(c.usage, None, "{body}");
        }
    }

    #[test]
    fn parse_completion_rejects_wrong_shapes() {
        for body in [
            r#"{"unexpected":"shape"}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"text":"legacy completion"}]}"#,
            "<html>proxy error</html>",
        ] {
            match parse_completion(body) {
                Err(ReportError::MalformedResponse { body: b }) => assert_eq!(b, body),
                other => panic!("{body}: expected MalformedResponse, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn sends_openai_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-local")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "llama-3.1-8b-instruct",
                "messages": [
                    {"role": "system", "content": "SYS"},
                    {"role": "user", "content": "USER"}
                ],
                "max_tokens": 1500
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"  *Compte-rendu*  "}}]}"#)
            .create_async()
            .await;

        let client = LlmClient::new().unwrap();
        let out = client
            .generate(&settings_for(&server.url()), "SYS", "USER")
            .await
            .unwrap();

        // Returned unmodified: no trimming, no markdown cleanup.
        assert_eq!(out.content, "  *Compte-rendu*  ");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_api_key_sends_fallback() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer lm-studio")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;

        let mut settings = settings_for(&format!("{}/", server.url()));
        settings.api_key.clear();
        LlmClient::new()
            .unwrap()
            .generate(&settings, "s", "u")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("model is loading")
            .expect(1)
            .create_async()
            .await;

        let err = LlmClient::new()
            .unwrap()
            .generate(&settings_for(&server.url()), "s", "u")
            .await
            .unwrap_err();

        match err {
            ReportError::Transport { endpoint, detail } => {
                assert!(endpoint.ends_with("/v1/chat/completions"));
                assert!(detail.contains("503"), "got: {detail}");
                assert!(detail.contains("model is loading"), "got: {detail}");
            }
            other => panic!("expected Transport, got {other:?}"),
        }
        // Exactly one attempt: no automatic retry.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on loopback is closed on test machines.
        let err = LlmClient::new()
            .unwrap()
            .generate(&settings_for("http://127.0.0.1:9"), "s", "u")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Transport { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn unexpected_shape_is_malformed_with_raw_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"unexpected":"shape"}"#)
            .create_async()
            .await;

        let err = LlmClient::new()
            .unwrap()
            .generate(&settings_for(&server.url()), "s", "u")
            .await
            .unwrap_err();
        match err {
            ReportError::MalformedResponse { body } => assert_eq!(body, r#"{"unexpected":"shape"}"#),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }
}
