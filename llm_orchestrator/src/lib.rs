//! Uniform request/response oracle to a chat-completion service.
//!
//! Wraps a hosted OpenAI-compatible endpoint, a local Ollama-compatible
//! daemon, or a deterministic mock for tests, behind one `complete` call.
//! Retries transient transport errors with exponential backoff and paces
//! successive calls against a single "next allowed call" instant so callers
//! never need an ad-hoc `sleep` of their own.

use std::sync::Arc;
use std::time::Duration;

use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use error_types::LlmError;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Which backend a [`LlmClient`] talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProviderKind {
    /// A hosted OpenAI-compatible chat-completions endpoint, bearer auth.
    Hosted,
    /// A local OpenAI-compatible daemon (e.g. Ollama), no auth.
    Local,
    /// Deterministic canned replies; no network calls. For tests.
    Mock,
}

impl LlmProviderKind {
    pub fn from_config_value(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "local" | "ollama" => LlmProviderKind::Local,
            "mock" => LlmProviderKind::Mock,
            _ => LlmProviderKind::Hosted,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

/// Uniform LLM oracle: `complete(prompt, system_prompt?, response_format?,
/// temperature?, max_tokens?) -> String`.
pub struct LlmClient {
    http: reqwest::Client,
    kind: LlmProviderKind,
    api_key: Option<String>,
    base_url: String,
    model: String,
    pacing_delay: Duration,
    next_allowed_call: Arc<Mutex<Instant>>,
    mock_reply: Option<String>,
}

impl LlmClient {
    /// Build a hosted (OpenAI-compatible) client, e.g. OpenRouter.
    pub fn hosted(api_key: String, base_url: String, model: String, pacing_delay: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            kind: LlmProviderKind::Hosted,
            api_key: Some(api_key),
            base_url,
            model,
            pacing_delay,
            next_allowed_call: Arc::new(Mutex::new(Instant::now())),
            mock_reply: None,
        }
    }

    /// Build a local-daemon (e.g. Ollama) client; no credential required.
    pub fn local(base_url: String, model: String, pacing_delay: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            kind: LlmProviderKind::Local,
            api_key: None,
            base_url,
            model,
            pacing_delay,
            next_allowed_call: Arc::new(Mutex::new(Instant::now())),
            mock_reply: None,
        }
    }

    /// A mock client that always returns `reply`, honoring pacing but never
    /// touching the network. For deterministic tests.
    pub fn mock(reply: impl Into<String>, pacing_delay: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            kind: LlmProviderKind::Mock,
            api_key: None,
            base_url: String::new(),
            model: "mock".to_string(),
            pacing_delay,
            next_allowed_call: Arc::new(Mutex::new(Instant::now())),
            mock_reply: Some(reply.into()),
        }
    }

    /// Construct from environment variables, mirroring the config precedence
    /// used elsewhere: `LLM_PROVIDER` selects the backend, `OPENROUTER_API_KEY`
    /// / `OLLAMA_BASE_URL` / `OLLAMA_MODEL` configure it.
    pub fn from_env(pacing_delay: Duration) -> Result<Self, String> {
        config_manager::load_dotenv_best_effort();
        let kind = LlmProviderKind::from_config_value(
            &std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "hosted".to_string()),
        );
        match kind {
            LlmProviderKind::Hosted => {
                let api_key = env_nonempty("OPENROUTER_API_KEY")
                    .ok_or_else(|| "OPENROUTER_API_KEY not set".to_string())?;
                let base_url = env_nonempty("LLM_BASE_URL")
                    .unwrap_or_else(|| "https://openrouter.ai/api/v1/chat/completions".to_string());
                let model = env_nonempty("DEFAULT_LLM_MODEL")
                    .unwrap_or_else(|| "deepseek/deepseek-v3.2".to_string());
                Ok(Self::hosted(api_key, base_url, model, pacing_delay))
            }
            LlmProviderKind::Local => {
                let ollama_base = env_nonempty("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:11434".to_string());
                let base_url = format!("{}/api/chat", ollama_base.trim_end_matches('/'));
                let model = env_nonempty("OLLAMA_MODEL").unwrap_or_else(|| "llama3".to_string());
                Ok(Self::local(base_url, model, pacing_delay))
            }
            LlmProviderKind::Mock => Ok(Self::mock("{}", pacing_delay)),
        }
    }

    /// Block until the pacing delay since the previous call has elapsed,
    /// then reserve the next slot. Serializes callers against one shared
    /// "next allowed call" instant instead of each sleeping independently.
    async fn wait_for_pacing_slot(&self) {
        let mut next_allowed = self.next_allowed_call.lock().await;
        let now = Instant::now();
        if *next_allowed > now {
            tokio::time::sleep(*next_allowed - now).await;
        }
        *next_allowed = Instant::now() + self.pacing_delay;
    }

    /// Request a chat completion. `response_format = Some("json_object")`
    /// augments the system prompt with a "respond in valid JSON" instruction
    /// and asks the provider for a JSON-mode reply when it supports one.
    pub async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        response_format: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, LlmError> {
        self.wait_for_pacing_slot().await;

        if self.kind == LlmProviderKind::Mock {
            return Ok(self.mock_reply.clone().unwrap_or_default());
        }

        let wants_json = response_format == Some("json_object");
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            let content = if wants_json {
                format!("{system}\n\nRespond with a single valid JSON object and nothing else.")
            } else {
                system.to_string()
            };
            messages.push(ChatMessage {
                role: "system",
                content,
            });
        } else if wants_json {
            messages.push(ChatMessage {
                role: "system",
                content: "Respond with a single valid JSON object and nothing else.".to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt.to_string(),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            temperature,
            max_tokens,
            response_format: wants_json.then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
        };

        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(2))
            .with_max_interval(Duration::from_secs(60))
            .with_max_elapsed_time(Some(Duration::from_secs(120)))
            .build();

        let mut attempts = 0u32;
        let response_text = retry(backoff, || {
            attempts += 1;
            let request = &request;
            async move {
                if attempts > 5 {
                    return Err(backoff::Error::permanent(LlmError::EmptyCompletion));
                }
                self.send_once(request).await.map_err(|e| match e {
                    LlmError::ProviderError(_) => backoff::Error::permanent(e),
                    other => backoff::Error::transient(other),
                })
            }
        })
        .await?;

        Ok(response_text)
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let mut req = self.http.post(&self.base_url).json(request);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = tokio::time::timeout(Duration::from_secs(30), req.send())
            .await
            .map_err(|_| LlmError::ProviderError("request timed out".to_string()))??;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(400).collect();
            return Err(LlmError::ProviderError(format!("{status}: {snippet}")));
        }

        let json: serde_json::Value = response.json().await?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_returns_canned_reply() {
        let client = LlmClient::mock(r#"{"score": 0.5}"#, Duration::from_millis(0));
        let reply = client
            .complete("anything", None, Some("json_object"), None, None)
            .await
            .unwrap();
        assert_eq!(reply, r#"{"score": 0.5}"#);
    }

    #[tokio::test]
    async fn pacing_delay_is_enforced() {
        let client = LlmClient::mock("ok", Duration::from_millis(50));
        let start = std::time::Instant::now();
        client.complete("a", None, None, None, None).await.unwrap();
        client.complete("b", None, None, None, None).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
