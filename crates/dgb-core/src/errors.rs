/// Core error type for the gateway.
///
/// Adapter crates map their transport errors into this type so the dispatcher
/// can tell pre-ack failures (HTTP error status) from post-ack failures
/// (rendered into the follow-up content).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("authentication failure: {0}")]
    Authentication(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("policy violation: {}", categories.join(", "))]
    PolicyViolation { categories: Vec<String> },

    #[error("collaborator failure: {0}")]
    Collaborator(String),

    #[error("delivery failure: {0}")]
    Delivery(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
