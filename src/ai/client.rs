use std::future::Future;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use tracing::{debug, info, warn};

use crate::context::SystemContext;
use crate::error::AssistError;

use super::prompt;

/// Wait suggested to the user when the provider reports its own quota.
const REMOTE_RATE_LIMIT_WAIT_SECS: u64 = 60;

/// Anything that can turn a request into a model reply.
///
/// Replies are returned raw; extracting the command is the caller's job.
#[allow(async_fn_in_trait)]
pub trait CommandGenerator {
    async fn generate(&self, user_request: &str, ctx: &SystemContext) -> Result<String, AssistError>;

    async fn suggest_fix(&self, command: &str, error: &str, ctx: &SystemContext) -> Result<String, AssistError>;
}

/// Timeout and retry settings for one model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Run `call` under the policy's timeout, retrying transient failures with
/// exponential backoff.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut call: F) -> Result<T, AssistError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AssistError>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(AssistError::Network(format!(
                "no response from the model within {} seconds",
                policy.timeout.as_secs()
            ))),
        };

        match result {
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                warn!(attempt, "Model call failed: {}; retrying in {:?}", e, backoff);
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Map a provider failure onto the user-facing error kinds.
pub fn classify_api_failure(message: &str) -> AssistError {
    let lower = message.to_ascii_lowercase();
    let is_auth = ["api key", "api_key", "unauthenticated", "permission_denied", "401", "403"]
        .iter()
        .any(|needle| lower.contains(needle));
    if is_auth {
        return AssistError::Configuration(format!("the model provider rejected the API key: {}", message));
    }
    let is_quota = ["quota", "resource_exhausted", "rate limit", "too many requests", "429"]
        .iter()
        .any(|needle| lower.contains(needle));
    if is_quota {
        return AssistError::RateLimitExceeded {
            retry_after_secs: REMOTE_RATE_LIMIT_WAIT_SECS,
        };
    }
    AssistError::Network(message.to_string())
}

fn map_openai_error(err: OpenAIError) -> AssistError {
    match err {
        OpenAIError::Reqwest(e) => AssistError::Network(e.to_string()),
        OpenAIError::ApiError(api) => classify_api_failure(&api.message),
        other => classify_api_failure(&other.to_string()),
    }
}

/// Gemini through its OpenAI-compatible endpoint.
pub struct GeminiClient {
    client: Client<OpenAIConfig>,
    pub model: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(api_key: &str, api_base: &str, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key).with_api_base(api_base);
        Self {
            client: Client::with_config(config),
            model: model.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, user_content: String) -> Result<CreateChatCompletionRequest, AssistError> {
        let system: ChatCompletionRequestMessage = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt::SYSTEM_PROMPT)
            .build()
            .map_err(map_openai_error)?
            .into();
        let user: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(user_content)
            .build()
            .map_err(map_openai_error)?
            .into();

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![system, user])
            .temperature(0.2)
            .build()
            .map_err(map_openai_error)
    }

    async fn complete(&self, user_content: String) -> Result<String, AssistError> {
        let request = self.build_request(user_content)?;
        debug!(model = %self.model, "Sending completion request");

        let response = with_retry(self.retry, || {
            let request = request.clone();
            async move { self.client.chat().create(request).await.map_err(map_openai_error) }
        })
        .await?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        info!(model = %self.model, chars = reply.len(), "Model replied");
        Ok(reply)
    }
}

impl CommandGenerator for GeminiClient {
    async fn generate(&self, user_request: &str, ctx: &SystemContext) -> Result<String, AssistError> {
        self.complete(prompt::build_prompt(user_request, ctx)).await
    }

    async fn suggest_fix(&self, command: &str, error: &str, ctx: &SystemContext) -> Result<String, AssistError> {
        self.complete(prompt::build_fix_prompt(command, error, ctx)).await
    }
}
