//! The card bot: classify each turn's activity and send the reply.

pub mod dispatch;

pub use dispatch::{Intent, ReplyAction, classify, dispatch};

use tracing::{error, info};

use crate::cards::CardTemplate;
use crate::channels::TurnContext;
use crate::error::ReplyDeliveryError;

/// Generic notice sent when delivering a reply fails.
pub const TURN_FAILURE_NOTICE: &str = "Something went wrong while processing your request.";

/// Stateless bot holding only the read-only card template.
#[derive(Debug, Clone)]
pub struct CardBot {
    card: CardTemplate,
}

impl CardBot {
    pub fn new(card: CardTemplate) -> Self {
        Self { card }
    }

    /// Handle one turn.
    ///
    /// On delivery failure one best-effort [`TURN_FAILURE_NOTICE`] is sent and
    /// the original error is returned.
    pub async fn on_turn(&self, ctx: &TurnContext) -> Result<(), ReplyDeliveryError> {
        let activity = ctx.activity();
        info!(activity_type = %activity.activity_type, "Processing activity");

        let reply = dispatch(activity, &self.card);
        match &reply {
            ReplyAction::SendAttachment { .. } => info!("Sending Adaptive Card"),
            ReplyAction::SendText { text } => info!(reply = %text, "Sending text reply"),
        }

        if let Err(e) = ctx.send_replies(std::slice::from_ref(&reply)).await {
            error!(error = %e, "Error inside bot logic");
            if let Err(notice_err) = ctx.send_text(TURN_FAILURE_NOTICE).await {
                error!(error = %notice_err, "Failed to send failure notice");
            }
            return Err(e);
        }

        info!("Finished processing request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::activity::Activity;
    use crate::channels::sender::testing::RecordingSender;

    fn bot() -> CardBot {
        CardBot::new(CardTemplate::bundled().unwrap())
    }

    #[tokio::test]
    async fn echo_turn_sends_one_reply() {
        let sender = RecordingSender::new();
        let ctx = TurnContext::new(Activity::message("hello"), sender.clone());

        bot().on_turn(&ctx).await.unwrap();

        assert_eq!(sender.texts().await, vec!["You said: hello"]);
    }

    #[tokio::test]
    async fn show_card_turn_sends_attachment() {
        let sender = RecordingSender::new();
        let ctx = TurnContext::new(Activity::message("Show Card"), sender.clone());

        bot().on_turn(&ctx).await.unwrap();

        let delivered = sender.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].attachments[0].content["type"], "AdaptiveCard");
    }

    #[tokio::test]
    async fn form_turn_greets() {
        let sender = RecordingSender::new();
        let activity = Activity::new("message").with_value(json!({ "userName": "Ann" }));
        let ctx = TurnContext::new(activity, sender.clone());

        bot().on_turn(&ctx).await.unwrap();

        assert_eq!(sender.texts().await, vec!["Hello, Ann!"]);
    }

    #[tokio::test]
    async fn delivery_failure_attempts_notice_and_propagates() {
        let sender = RecordingSender::failing_after(0);
        let ctx = TurnContext::new(Activity::message("hello"), sender.clone());

        let err = bot().on_turn(&ctx).await.unwrap_err();

        assert!(matches!(err, ReplyDeliveryError::Rejected { status: 503, .. }));
        // Reply + failure notice both attempted.
        assert_eq!(sender.attempts().await, 2);
        assert!(sender.texts().await.is_empty());
    }
}
