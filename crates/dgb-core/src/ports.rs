use async_trait::async_trait;

use crate::{domain::FollowupMessage, Result};

/// Outcome of a moderation check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub flagged: bool,
    /// Names of the categories that were flagged (empty when not flagged).
    pub categories: Vec<String>,
}

/// Hexagonal port for the content-moderation check.
#[async_trait]
pub trait ModerationPort: Send + Sync {
    async fn moderate(&self, input: &[String]) -> Result<ModerationVerdict>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    /// System messages, sent in order ahead of the user input.
    pub system_prompts: Vec<String>,
    pub input: String,
    /// Platform identity of the invoker, forwarded for abuse tracking.
    pub user: String,
}

/// Hexagonal port for the text-completion call.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<String>;
}

/// Hexagonal port for delivering the follow-up message to the platform.
#[async_trait]
pub trait FollowupPort: Send + Sync {
    async fn send_followup(&self, msg: &FollowupMessage) -> Result<()>;
}
