//! Bot Framework connector: posts reply activities to the channel's
//! service URL.

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use super::sender::ReplySender;
use super::token::TokenProvider;
use crate::activity::Activity;
use crate::error::ReplyDeliveryError;

/// Connector REST client implementing [`ReplySender`].
pub struct ConnectorClient {
    client: reqwest::Client,
    /// `None` sends unauthenticated requests (local emulator).
    tokens: Option<TokenProvider>,
    /// Host patterns allowed to receive the bearer token.
    trusted_hosts: Vec<String>,
}

impl ConnectorClient {
    /// Client with no trusted hosts. With `tokens` set, every reply is
    /// refused until [`ConnectorClient::with_trusted_hosts`] names some.
    pub fn new(client: reqwest::Client, tokens: Option<TokenProvider>) -> Self {
        Self {
            client,
            tokens,
            trusted_hosts: Vec::new(),
        }
    }

    pub fn with_trusted_hosts(mut self, hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.trusted_hosts = hosts
            .into_iter()
            .map(|h| h.into().trim().to_ascii_lowercase())
            .collect();
        self
    }

    fn is_trusted(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| {
            let host = host.to_ascii_lowercase();
            self.trusted_hosts
                .iter()
                .any(|pattern| host_matches(&host, pattern))
        })
    }
}

/// `*.example.com` matches any subdomain of `example.com`, not the apex.
/// Anything else is an exact host match.
fn host_matches(host: &str, pattern: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(suffix) => host
            .strip_suffix(suffix)
            .and_then(|rest| rest.strip_suffix('.'))
            .is_some_and(|label| !label.is_empty()),
        None => host == pattern,
    }
}

/// Reply endpoint for `activity`:
/// `{serviceUrl}/v3/conversations/{conversationId}/activities[/{replyToId}]`.
pub fn reply_url(activity: &Activity) -> Result<Url, ReplyDeliveryError> {
    let service_url = activity
        .service_url
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(ReplyDeliveryError::MissingConversation {
            field: "serviceUrl",
        })?;
    let conversation_id = activity
        .conversation_id()
        .filter(|s| !s.is_empty())
        .ok_or(ReplyDeliveryError::MissingConversation {
            field: "conversation.id",
        })?;

    let mut url = Url::parse(service_url).map_err(|source| ReplyDeliveryError::InvalidServiceUrl {
        url: service_url.to_string(),
        source,
    })?;
    {
        let mut segments =
            url.path_segments_mut()
                .map_err(|_| ReplyDeliveryError::UnsupportedServiceUrl {
                    url: service_url.to_string(),
                })?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", conversation_id, "activities"]);
        if let Some(reply_to) = activity.reply_to_id.as_deref().filter(|s| !s.is_empty()) {
            segments.push(reply_to);
        }
    }
    Ok(url)
}

#[async_trait]
impl ReplySender for ConnectorClient {
    fn name(&self) -> &str {
        "botframework"
    }

    async fn send_activity(&self, activity: &Activity) -> Result<(), ReplyDeliveryError> {
        let url = reply_url(activity)?;

        let mut request = self.client.post(url.clone()).json(activity);
        if let Some(tokens) = &self.tokens {
            if !self.is_trusted(&url) {
                let host = url.host_str().unwrap_or_default().to_string();
                warn!(host = %host, "Refusing to send bot token to untrusted serviceUrl");
                return Err(ReplyDeliveryError::UntrustedServiceUrl { host });
            }
            request = request.bearer_auth(tokens.token().await?);
        }

        let resp = request
            .send()
            .await
            .map_err(|source| ReplyDeliveryError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, url = %url, "Connector rejected reply activity");
            return Err(ReplyDeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %url, "Reply activity delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use crate::activity::ConversationAccount;
    use crate::config::AppCredentials;

    use super::*;

    fn addressed(service_url: &str, conversation: &str, reply_to: Option<&str>) -> Activity {
        let mut activity = Activity::new("message");
        activity.service_url = Some(service_url.into());
        activity.conversation = Some(ConversationAccount {
            id: conversation.into(),
            name: None,
        });
        activity.reply_to_id = reply_to.map(String::from);
        activity
    }

    #[test]
    fn reply_url_with_reply_to() {
        let url = reply_url(&addressed("https://smba.trafficmanager.net/amer/", "conv-1", Some("act-9")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://smba.trafficmanager.net/amer/v3/conversations/conv-1/activities/act-9"
        );
    }

    #[test]
    fn reply_url_without_reply_to() {
        let url = reply_url(&addressed("http://localhost:51234", "conv-1", None)).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:51234/v3/conversations/conv-1/activities"
        );
    }

    #[test]
    fn reply_url_escapes_conversation_id() {
        let url = reply_url(&addressed("http://localhost:1", "a:b/c d", None)).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1/v3/conversations/a:b%2Fc%20d/activities"
        );
    }

    #[test]
    fn reply_url_requires_service_url() {
        let mut activity = addressed("", "conv", None);
        activity.service_url = None;
        assert!(matches!(
            reply_url(&activity),
            Err(ReplyDeliveryError::MissingConversation { field: "serviceUrl" })
        ));
    }

    #[test]
    fn reply_url_requires_conversation() {
        let mut activity = addressed("http://localhost:1", "conv", None);
        activity.conversation = None;
        assert!(matches!(
            reply_url(&activity),
            Err(ReplyDeliveryError::MissingConversation {
                field: "conversation.id"
            })
        ));
    }

    #[test]
    fn unparsable_service_url_keeps_cause() {
        let err = reply_url(&addressed("smba.trafficmanager.net/amer", "conv", None)).unwrap_err();
        assert!(matches!(
            err,
            ReplyDeliveryError::InvalidServiceUrl {
                source: url::ParseError::RelativeUrlWithoutBase,
                ..
            }
        ));
    }

    #[test]
    fn opaque_service_url_is_unsupported() {
        let err = reply_url(&addressed("mailto:bot@example.com", "conv", None)).unwrap_err();
        assert!(matches!(err, ReplyDeliveryError::UnsupportedServiceUrl { .. }));
    }

    #[test]
    fn wildcard_matches_subdomains_only() {
        assert!(host_matches("smba.trafficmanager.net", "*.trafficmanager.net"));
        assert!(host_matches("a.b.botframework.com", "*.botframework.com"));
        assert!(!host_matches("botframework.com", "*.botframework.com"));
        assert!(!host_matches("evilbotframework.com", "*.botframework.com"));
        assert!(!host_matches("botframework.com.evil.io", "*.botframework.com"));
        assert!(host_matches("127.0.0.1", "127.0.0.1"));
        assert!(!host_matches("127.0.0.2", "127.0.0.1"));
    }

    #[test]
    fn trusted_hosts_are_case_insensitive() {
        let client = ConnectorClient::new(reqwest::Client::new(), None)
            .with_trusted_hosts([" *.BotFramework.com "]);
        assert!(client.is_trusted(&Url::parse("https://SMBA.botframework.com/x").unwrap()));
        assert!(!client.is_trusted(&Url::parse("https://attacker.example/x").unwrap()));
        assert_eq!(client.name(), "botframework");
    }

    #[tokio::test]
    async fn untrusted_service_url_fails_before_token_is_fetched() {
        let credentials = AppCredentials {
            app_id: "app-id".into(),
            app_password: SecretString::from("app-secret"),
            tenant_id: "botframework.com".into(),
        };
        // Nothing listens here; reaching the token endpoint would be a Token error.
        let tokens = TokenProvider::new(reqwest::Client::new(), credentials)
            .with_token_url("http://127.0.0.1:9/token");
        let client = ConnectorClient::new(reqwest::Client::new(), Some(tokens))
            .with_trusted_hosts(["*.botframework.com"]);

        let err = client
            .send_activity(&addressed("http://attacker.example:8080", "conv", None))
            .await
            .unwrap_err();

        assert!(
            matches!(err, ReplyDeliveryError::UntrustedServiceUrl { ref host } if host == "attacker.example"),
            "got {err:?}"
        );
    }
}
