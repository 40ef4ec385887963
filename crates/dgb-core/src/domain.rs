//! Platform-neutral interaction model.

/// Maximum length of an embed description accepted by the platform.
pub const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// Embed title used for follow-ups.
pub const FOLLOWUP_EMBED_TITLE: &str = "prompt";

/// Accent color of the follow-up embed (red).
pub const FOLLOWUP_EMBED_COLOR: u32 = 0xff0000;

/// Interaction type as sent by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    MessageComponent,
}

impl InteractionKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Ping),
            2 => Some(Self::ApplicationCommand),
            3 => Some(Self::MessageComponent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ApplicationCommand => "application_command",
            Self::MessageComponent => "message_component",
        }
    }
}

/// Value of a single command option.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// Sub-commands, mentionables and anything else we do not interpret.
    Other(serde_json::Value),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Other(_) => "other",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

/// A decoded, verified interaction. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionEvent {
    pub id: String,
    pub application_id: String,
    pub token: String,
    pub kind: InteractionKind,
    pub invoker_user_id: String,
    pub invoker_username: String,
    pub command_name: String,
    pub command_options: Vec<CommandOption>,
}

impl InteractionEvent {
    /// The command argument: the only option's string value, or `""`.
    pub fn command_input(&self) -> &str {
        match self.command_options.as_slice() {
            [only] => only.value.as_str().unwrap_or(""),
            _ => "",
        }
    }
}

/// Immediate response chosen for an interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckDecision {
    Pong,
    DeferredChannelMessage,
    /// Acknowledge a component interaction without editing the message.
    ComponentAck,
}

impl AckDecision {
    pub fn for_kind(kind: InteractionKind) -> Self {
        match kind {
            InteractionKind::Ping => Self::Pong,
            InteractionKind::ApplicationCommand => Self::DeferredChannelMessage,
            InteractionKind::MessageComponent => Self::ComponentAck,
        }
    }

    /// Interaction response type code on the wire.
    pub fn response_type(self) -> u8 {
        match self {
            Self::Pong => 1,
            Self::DeferredChannelMessage => 5,
            Self::ComponentAck => 6,
        }
    }
}

/// Result of one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub answer_text: String,
    pub flagged: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
}

/// The single out-of-band message sent after a deferred ack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FollowupMessage {
    pub application_id: String,
    pub token: String,
    pub embed: Embed,
    pub content: String,
}

impl FollowupMessage {
    pub fn for_answer(
        event: &InteractionEvent,
        outcome: &CompletionOutcome,
        content_limit: usize,
    ) -> Self {
        Self {
            application_id: event.application_id.clone(),
            token: event.token.clone(),
            embed: Embed {
                title: FOLLOWUP_EMBED_TITLE.to_string(),
                description: truncate_chars(event.command_input(), EMBED_DESCRIPTION_LIMIT),
                color: FOLLOWUP_EMBED_COLOR,
            },
            content: truncate_chars(&outcome.answer_text, content_limit),
        }
    }
}

/// Truncate to at most `max` chars, marking the cut with an ellipsis.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}
