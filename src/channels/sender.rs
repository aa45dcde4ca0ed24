//! Reply sender abstraction and the per-turn conversation context.

use std::sync::Arc;

use async_trait::async_trait;

use crate::activity::Activity;
use crate::bot::ReplyAction;
use crate::error::ReplyDeliveryError;

/// Delivers outbound activities back to the conversation they answer.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Sender name for logs.
    fn name(&self) -> &str;

    /// Deliver one outbound activity. No retries.
    async fn send_activity(&self, activity: &Activity) -> Result<(), ReplyDeliveryError>;
}

/// Build the outbound activity carrying `action` in reply to `inbound`.
pub fn outbound_activity(inbound: &Activity, action: &ReplyAction) -> Activity {
    let mut reply = inbound.create_reply();
    match action {
        ReplyAction::SendText { text } => reply.text = Some(text.clone()),
        ReplyAction::SendAttachment { content } => reply.attachments.push(content.to_attachment()),
    }
    reply
}

/// Conversation handle for one turn: the inbound activity plus a way to
/// answer it.
pub struct TurnContext {
    activity: Activity,
    sender: Arc<dyn ReplySender>,
}

impl TurnContext {
    pub fn new(activity: Activity, sender: Arc<dyn ReplySender>) -> Self {
        Self { activity, sender }
    }

    /// The inbound activity for this turn.
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Send one reply action on this conversation.
    pub async fn send_reply(&self, action: &ReplyAction) -> Result<(), ReplyDeliveryError> {
        let outbound = outbound_activity(&self.activity, action);
        self.sender.send_activity(&outbound).await
    }

    /// Send replies in order, stopping at the first failure.
    pub async fn send_replies(&self, actions: &[ReplyAction]) -> Result<(), ReplyDeliveryError> {
        for action in actions {
            self.send_reply(action).await?;
        }
        Ok(())
    }

    /// Send a plain text reply.
    pub async fn send_text(&self, text: &str) -> Result<(), ReplyDeliveryError> {
        self.send_reply(&ReplyAction::text(text)).await
    }
}
