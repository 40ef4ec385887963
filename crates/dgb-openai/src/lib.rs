//! OpenAI adapter (moderation + chat completions).
//!
//! Implements the `dgb-core` moderation and completion ports over the OpenAI
//! HTTP API. Every failure is mapped to `Error::Collaborator`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use dgb_core::{
    errors::Error,
    ports::{CompletionPort, CompletionRequest, ModerationPort, ModerationVerdict},
    Result,
};

pub mod types;

use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModerationRequest,
    ModerationResponse,
};

const TEMPERATURE: f64 = 0.6;
const TOP_P: f64 = 1.0;
const MAX_TOKENS: u32 = 3500;

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    api_base: String,
    chat_model: String,
    moderation_model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        chat_model: impl Into<String>,
        moderation_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            chat_model: chat_model.into(),
            moderation_model: moderation_model.into(),
            http,
        }
    }

    pub fn from_config(cfg: &dgb_core::config::Config) -> Self {
        Self::new(
            cfg.openai_api_key.clone(),
            cfg.openai_api_base.clone(),
            cfg.openai_model.clone(),
            cfg.moderation_model.clone(),
            cfg.http_timeout,
        )
    }

    async fn post<B, R>(&self, endpoint: &str, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("openai {endpoint} request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Collaborator(format!(
                "openai {endpoint} failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json::<R>()
            .await
            .map_err(|e| Error::Collaborator(format!("openai {endpoint} json error: {e}")))
    }
}

#[async_trait]
impl ModerationPort for OpenAiClient {
    async fn moderate(&self, input: &[String]) -> Result<ModerationVerdict> {
        let req = ModerationRequest {
            input,
            model: &self.moderation_model,
        };
        let resp: ModerationResponse = self.post("moderation", "/v1/moderations", &req).await?;

        let mut verdict = ModerationVerdict::default();
        for result in resp.results.iter().filter(|r| r.flagged) {
            verdict.flagged = true;
            for (name, hit) in &result.categories {
                if *hit && !verdict.categories.contains(name) {
                    let score = result.category_scores.get(name).copied().unwrap_or(0.0);
                    info!(category = %name, score, "moderation category flagged");
                    verdict.categories.push(name.clone());
                }
            }
        }
        Ok(verdict)
    }
}

#[async_trait]
impl CompletionPort for OpenAiClient {
    async fn complete(&self, req: CompletionRequest) -> Result<String> {
        let mut messages: Vec<ChatMessage> = req
            .system_prompts
            .into_iter()
            .map(ChatMessage::system)
            .collect();
        messages.push(ChatMessage::user(req.input));

        let body = ChatCompletionRequest {
            model: self.chat_model.clone(),
            messages,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            n: 1,
            stream: false,
            max_tokens: MAX_TOKENS,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            user: req.user,
        };

        let resp: ChatCompletionResponse =
            self.post("chat", "/v1/chat/completions", &body).await?;

        let Some(choice) = resp.choices.into_iter().next() else {
            return Err(Error::Collaborator(
                "openai chat returned no choices".to_string(),
            ));
        };

        debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            total_tokens = resp.usage.total_tokens,
            "chat completion received"
        );
        Ok(choice.message.content)
    }
}
