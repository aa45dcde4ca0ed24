//! Bot adapter: runs one turn per inbound activity and logs unhandled
//! turn errors.

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::activity::Activity;
use crate::bot::CardBot;
use crate::cards::CardTemplate;
use crate::channels::{ConnectorClient, ReplySender, TokenProvider, TurnContext};
use crate::config::BotConfig;
use crate::error::{Error, Result};

/// Explicitly constructed adapter shared by all request handlers.
#[derive(Clone)]
pub struct BotAdapter {
    bot: Arc<CardBot>,
    sender: Arc<dyn ReplySender>,
}

impl BotAdapter {
    pub fn new(bot: CardBot, sender: Arc<dyn ReplySender>) -> Self {
        Self {
            bot: Arc::new(bot),
            sender,
        }
    }

    /// Wire the production adapter: card template, HTTP client with the
    /// configured timeout, and the Bot Framework connector.
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let card = CardTemplate::load_or_bundled(config.card_path.as_deref())?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(Error::HttpClient)?;

        let tokens = match &config.credentials {
            Some(creds) => {
                info!(app_id = %creds.app_id, "Outbound replies authenticated");
                Some(TokenProvider::new(client.clone(), creds.clone()))
            }
            None => {
                warn!("MICROSOFT_APP_ID not set; replies are sent without authentication");
                None
            }
        };
        let connector = ConnectorClient::new(client, tokens)
            .with_trusted_hosts(config.trusted_service_hosts.iter().cloned());

        Ok(Self::new(CardBot::new(card), Arc::new(connector)))
    }

    /// Process one inbound activity.
    ///
    /// A failed turn is logged and the error is returned. The user-facing
    /// notice is the bot's job; nothing more is sent from here.
    pub async fn process_activity(&self, activity: Activity) -> Result<()> {
        let span = info_span!(
            "turn",
            request_id = %Uuid::new_v4(),
            activity_type = %activity.activity_type,
            conversation = activity.conversation_id().unwrap_or("-"),
        );

        async move {
            let ctx = TurnContext::new(activity, Arc::clone(&self.sender));
            match self.bot.on_turn(&ctx).await {
                Ok(()) => {
                    info!(sender = self.sender.name(), "Request processed successfully");
                    Ok(())
                }
                Err(e) => {
                    let err = Error::from(e);
                    self.on_turn_error(&err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn on_turn_error(&self, err: &Error) {
        error!(
            sender = self.sender.name(),
            error = %err,
            source = ?std::error::Error::source(err),
            "Unhandled turn error"
        );
    }
}
