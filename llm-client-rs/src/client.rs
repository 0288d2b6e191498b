// llm-client-rs/src/client.rs
//
// HTTP client for OpenAI-compatible chat completion endpoints (hosted
// providers for online mode, a local Ollama server for offline mode).
//
// Configuration (.env file), each optionally prefixed (e.g. OFFLINE_LLM_API_URL):
// - LLM_API_URL: endpoint URL, overrides the configured endpoint
// - LLM_MODEL: model for every phase, overrides the configured models
// - LLM_MAX_RETRIES: maximum number of retry attempts (default: 3)
// - LLM_INITIAL_RETRY_DELAY_MS: initial delay between retries in ms (default: 1000)
// - LLM_MAX_RETRY_DELAY_MS: maximum delay between retries in ms (default: 30000)
// - LLM_REQUEST_TIMEOUT_SECS: per-request HTTP timeout (default: 60)
// - LLM_TEMPERATURE: sampling temperature (default: 0.2)

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use config_rs::{get_env_string, get_prefixed_string};
use shared_types_rs::ModelEndpoint;

use crate::{Generator, LlmError, Phase};

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub planner_model: String,
    pub synth_model: String,
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub temperature: f32,
}

impl ClientSettings {
    /// Start from a configured endpoint and apply environment overrides
    /// under `prefix` ("" for the online endpoint, "OFFLINE" for the local one).
    ///
    /// URL, model and key only honour the exact (prefixed) variable so the
    /// offline client never inherits the hosted endpoint; retry tuning falls
    /// back to the shared unprefixed variables.
    pub fn from_endpoint(endpoint: &ModelEndpoint, prefix: &str) -> Self {
        let exact = |name: &str| {
            let var = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}_{}", prefix.to_uppercase(), name)
            };
            get_env_string(&var)
        };

        let model_override = exact("LLM_MODEL");

        Self {
            api_url: exact("LLM_API_URL").unwrap_or_else(|| endpoint.api_url.clone()),
            api_key: endpoint.api_key_var.as_deref().and_then(get_env_string),
            planner_model: model_override
                .clone()
                .unwrap_or_else(|| endpoint.planner_model.clone()),
            synth_model: model_override.unwrap_or_else(|| endpoint.synth_model.clone()),
            max_retries: prefixed_var(prefix, "LLM_MAX_RETRIES", 3),
            initial_retry_delay_ms: prefixed_var(prefix, "LLM_INITIAL_RETRY_DELAY_MS", 1000),
            max_retry_delay_ms: prefixed_var(prefix, "LLM_MAX_RETRY_DELAY_MS", 30000),
            request_timeout_secs: prefixed_var(prefix, "LLM_REQUEST_TIMEOUT_SECS", 60),
            temperature: prefixed_var(prefix, "LLM_TEMPERATURE", 0.2),
        }
    }
}

fn prefixed_var<T: FromStr>(prefix: &str, name: &str, default: T) -> T {
    get_prefixed_string(prefix, name)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[derive(Debug)]
pub struct OpenAiCompatibleClient {
    client: Client,
    settings: ClientSettings,
    requires_key: bool,
}

impl OpenAiCompatibleClient {
    pub fn new(settings: ClientSettings, requires_key: bool) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .unwrap_or_default();

        log::info!(
            "LLM client initialized for {} (planner: {}, synthesizer: {})",
            settings.api_url,
            settings.planner_model,
            settings.synth_model
        );

        Self {
            client,
            settings,
            requires_key,
        }
    }

    pub fn from_endpoint(endpoint: &ModelEndpoint, prefix: &str) -> Self {
        let settings = ClientSettings::from_endpoint(endpoint, prefix);
        let requires_key = endpoint.api_key_var.is_some();
        if requires_key && settings.api_key.is_none() {
            log::warn!(
                "{} is not set; requests to {} will fail",
                endpoint.api_key_var.as_deref().unwrap_or_default(),
                settings.api_url
            );
        }
        Self::new(settings, requires_key)
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Exponential backoff with jitter, capped at two minutes in total.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.settings.initial_retry_delay_ms))
            .with_max_interval(Duration::from_millis(self.settings.max_retry_delay_ms))
            .with_multiplier(2.0)
            .with_max_elapsed_time(Some(Duration::from_secs(120)))
            .with_randomization_factor(0.5)
            .build()
    }

    async fn execute_request(&self, request_body: &ChatCompletionRequest) -> Result<String, LlmError> {
        let mut request = self
            .client
            .post(&self.settings.api_url)
            .header("Content-Type", "application/json")
            .json(request_body);

        match &self.settings.api_key {
            Some(key) => request = request.header("Authorization", format!("Bearer {}", key)),
            None if self.requires_key => {
                return Err(LlmError::InvalidRequest("API key is not set".to_string()));
            }
            None => {}
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(err) => {
                if err.is_timeout() {
                    return Err(LlmError::NetworkError(format!("Request timed out: {}", err)));
                } else if err.is_connect() {
                    return Err(LlmError::NetworkError(format!("Connection failed: {}", err)));
                } else {
                    return Err(LlmError::NetworkError(err.to_string()));
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            return match status.as_u16() {
                400 => Err(LlmError::InvalidRequest(format!("Bad request: {}", text))),
                401 => Err(LlmError::InvalidRequest(format!("Unauthorized: {}", text))),
                403 => Err(LlmError::InvalidRequest(format!("Forbidden: {}", text))),
                404 => Err(LlmError::InvalidRequest(format!("Not found: {}", text))),
                429 => Err(LlmError::RateLimitExceeded(text)),
                500 | 502 | 503 | 504 => Err(LlmError::ServerError(format!("({}): {}", status, text))),
                _ => Err(LlmError::UnknownError(format!("({}): {}", status, text))),
            };
        }

        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::ParseError(format!("Failed to parse response: {}", err)))?;

        if let Some(usage) = &data.usage {
            log::debug!("LLM request completed. Used {} tokens", usage.total_tokens);
        }

        data.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ParseError("No choices returned in response".to_string()))
    }
}

#[async_trait]
impl Generator for OpenAiCompatibleClient {
    #[instrument(skip(self, system_prompt, user_prompt), fields(phase = %phase))]
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_mode: bool,
        phase: Phase,
    ) -> Result<String, LlmError> {
        let request_body = ChatCompletionRequest {
            model: self.model_name(phase),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.settings.temperature,
            response_format: json_mode.then(|| json!({"type": "json_object"})),
        };

        log::info!(
            "Preparing {} request to {} (model: {})",
            phase,
            self.settings.api_url,
            request_body.model
        );

        let mut backoff = self.create_backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if attempt > 1 {
                log::info!("Retry attempt {} for {} request", attempt, phase);
            }

            match self.execute_request(&request_body).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if !err.is_retryable() || attempt > self.settings.max_retries {
                        log::error!("{} request failed after {} attempts: {}", phase, attempt, err);
                        return Err(err);
                    }

                    match backoff.next_backoff() {
                        Some(delay) => {
                            log::warn!("Retryable error: {}. Retrying in {:?}", err, delay);
                            let jitter = rand::thread_rng().gen_range(0..=200);
                            tokio::time::sleep(delay + Duration::from_millis(jitter)).await;
                        }
                        None => {
                            log::error!("Exceeded maximum backoff time: {}", err);
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    fn model_name(&self, phase: Phase) -> String {
        if phase.uses_planner_model() {
            self.settings.planner_model.clone()
        } else {
            self.settings.synth_model.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(url: String) -> ClientSettings {
        ClientSettings {
            api_url: url,
            api_key: Some("test-key".to_string()),
            planner_model: "planner-model".to_string(),
            synth_model: "synth-model".to_string(),
            max_retries: 2,
            initial_retry_delay_ms: 1,
            max_retry_delay_ms: 5,
            request_timeout_secs: 5,
            temperature: 0.2,
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"total_tokens": 42}
        })
    }

    #[tokio::test]
    async fn test_generate_json_mode_uses_planner_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "planner-model",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"tool_name\": \"find_people\"}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiCompatibleClient::new(settings(format!("{}/v1/chat/completions", server.uri())), true);
        let text = client
            .generate("system", "list all bscs students", true, Phase::Planner)
            .await
            .unwrap();
        assert_eq!(text, "{\"tool_name\": \"find_people\"}");
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("narrated")))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleClient::new(settings(server.uri()), true);
        let text = client
            .generate("system", "user", false, Phase::Synthesizer)
            .await
            .unwrap();
        assert_eq!(text, "narrated");
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiCompatibleClient::new(settings(server.uri()), true);
        let err = client
            .generate("system", "user", false, Phase::Planner)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let mut settings = settings("http://127.0.0.1:9/unused".to_string());
        settings.api_key = None;
        let client = OpenAiCompatibleClient::new(settings, true);
        let err = client
            .generate("system", "user", false, Phase::Planner)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key is not set"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleClient::new(settings(server.uri()), false);
        let err = client
            .generate("system", "user", false, Phase::Synthesizer)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ParseError(_)));
    }

    #[test]
    fn test_offline_settings_ignore_online_url() {
        std::env::set_var("LLM_API_URL", "https://hosted.example/v1/chat/completions");
        std::env::set_var("OFFLINE_LLM_MODEL", "llama3:8b");

        let endpoint = ModelEndpoint {
            api_url: "http://localhost:11434/v1/chat/completions".to_string(),
            planner_model: "mistral:instruct".to_string(),
            synth_model: "mistral:instruct".to_string(),
            api_key_var: None,
        };
        let settings = ClientSettings::from_endpoint(&endpoint, "OFFLINE");

        assert_eq!(settings.api_url, "http://localhost:11434/v1/chat/completions");
        assert_eq!(settings.planner_model, "llama3:8b");
        assert_eq!(settings.synth_model, "llama3:8b");
        assert!(settings.api_key.is_none());

        std::env::remove_var("LLM_API_URL");
        std::env::remove_var("OFFLINE_LLM_MODEL");
    }
}
