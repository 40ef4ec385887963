//! Moderation-gated completion pipeline.
//!
//! Runs after the deferred ack has been sent, so it never fails: every error is
//! rendered into the text that ends up in the follow-up message.

use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    domain::CompletionOutcome,
    errors::Error,
    ports::{CompletionPort, CompletionRequest, ModerationPort},
    Result,
};

pub const INVALID_REQUEST_MESSAGE: &str = "invalid request";
pub const POLICY_VIOLATION_MESSAGE: &str =
    "Sorry, this prompt was flagged by the content policy and was not answered.";

pub struct CompletionPipeline {
    moderation: Arc<dyn ModerationPort>,
    completion: Arc<dyn CompletionPort>,
    persona: Vec<String>,
    timeout: Duration,
}

impl CompletionPipeline {
    pub fn new(
        moderation: Arc<dyn ModerationPort>,
        completion: Arc<dyn CompletionPort>,
        persona: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            moderation,
            completion,
            persona,
            timeout,
        }
    }

    /// Produce the answer for `input` on behalf of `user_id`.
    pub async fn run(&self, input: &str, user_id: &str) -> CompletionOutcome {
        if input.trim().is_empty() || user_id.trim().is_empty() {
            return CompletionOutcome {
                answer_text: INVALID_REQUEST_MESSAGE.to_string(),
                flagged: false,
            };
        }

        let result = match tokio::time::timeout(self.timeout, self.answer(input, user_id)).await {
            Ok(r) => r,
            Err(_) => Err(Error::Collaborator(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            ))),
        };

        match result {
            Ok(answer_text) => CompletionOutcome {
                answer_text,
                flagged: false,
            },
            Err(Error::PolicyViolation { categories }) => {
                info!(user_id, categories = ?categories, "prompt flagged by moderation");
                CompletionOutcome {
                    answer_text: POLICY_VIOLATION_MESSAGE.to_string(),
                    flagged: true,
                }
            }
            Err(e) => {
                warn!(user_id, error = %e, "completion pipeline failed");
                CompletionOutcome {
                    answer_text: failure_message(&e),
                    flagged: false,
                }
            }
        }
    }

    async fn answer(&self, input: &str, user_id: &str) -> Result<String> {
        let verdict = self.moderation.moderate(&[input.to_string()]).await?;
        if verdict.flagged {
            return Err(Error::PolicyViolation {
                categories: verdict.categories,
            });
        }

        let text = self
            .completion
            .complete(CompletionRequest {
                system_prompts: self.persona.clone(),
                input: input.to_string(),
                user: user_id.to_string(),
            })
            .await?;

        if text.trim().is_empty() {
            return Err(Error::Collaborator("empty completion".to_string()));
        }
        Ok(text)
    }
}

fn failure_message(err: &Error) -> String {
    match err {
        Error::Collaborator(detail) => format!("request failed: {detail}"),
        other => format!("request failed: {other}"),
    }
}
