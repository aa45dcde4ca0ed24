//! Activity dispatcher: maps one inbound activity to exactly one reply.
//!
//! Classification is split from reply construction so precedence can be
//! checked on its own:
//!
//! 1. `message` with non-blank text: "show card" (trimmed, case-folded) → card,
//!    anything else → echo of the original text.
//! 2. `message` with a `value` payload: greet `value.userName`, or report that
//!    no name was entered.
//! 3. Everything else → "could not process".
//!
//! Text wins over value when both are present.

use serde::Serialize;
use tracing::debug;

use crate::activity::Activity;
use crate::cards::CardTemplate;

/// Normalized text that requests the card.
pub const SHOW_CARD_COMMAND: &str = "show card";

pub const NO_NAME_REPLY: &str = "You submitted the form, but no name was entered.";
pub const UNSUPPORTED_REPLY: &str = "Sorry, I could not process that request.";

/// What the bot should send back for one activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ReplyAction {
    #[serde(rename = "text")]
    SendText { text: String },
    #[serde(rename = "attachment")]
    SendAttachment { content: CardTemplate },
}

impl ReplyAction {
    pub fn text(text: impl Into<String>) -> Self {
        Self::SendText { text: text.into() }
    }
}

/// Which rule an activity falls under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent<'a> {
    /// Text equal to [`SHOW_CARD_COMMAND`] after normalization.
    ShowCard,
    /// Any other non-blank text, verbatim.
    Echo(&'a str),
    /// A form submission; `None` when no usable name was submitted.
    FormSubmission { user_name: Option<&'a str> },
    /// Non-message activity, or a message with neither text nor value.
    Unsupported,
}

/// Classify an activity. Total over every well-formed activity.
pub fn classify(activity: &Activity) -> Intent<'_> {
    if !activity.is_message() {
        return Intent::Unsupported;
    }

    if let Some(text) = activity.text.as_deref() {
        let normalized = text.trim().to_lowercase();
        if !normalized.is_empty() {
            if normalized == SHOW_CARD_COMMAND {
                return Intent::ShowCard;
            }
            return Intent::Echo(text);
        }
    }

    if let Some(value) = activity.value.as_ref() {
        let user_name = value
            .get("userName")
            .and_then(serde_json::Value::as_str)
            .filter(|name| !name.is_empty());
        return Intent::FormSubmission { user_name };
    }

    Intent::Unsupported
}

impl Intent<'_> {
    /// Build the reply for this intent.
    pub fn into_reply(self, card: &CardTemplate) -> ReplyAction {
        match self {
            Intent::ShowCard => ReplyAction::SendAttachment {
                content: card.clone(),
            },
            Intent::Echo(text) => ReplyAction::text(format!("You said: {text}")),
            Intent::FormSubmission {
                user_name: Some(name),
            } => ReplyAction::text(format!("Hello, {name}!")),
            Intent::FormSubmission { user_name: None } => ReplyAction::text(NO_NAME_REPLY),
            Intent::Unsupported => ReplyAction::text(UNSUPPORTED_REPLY),
        }
    }
}

/// Decide the reply for one activity. Pure: no I/O, no hidden state.
pub fn dispatch(activity: &Activity, card: &CardTemplate) -> ReplyAction {
    let intent = classify(activity);
    debug!(activity_type = %activity.activity_type, intent = ?intent, "Classified activity");
    intent.into_reply(card)
}
