//! Error types for the card echo bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Card template error: {0}")]
    Card(#[from] CardError),

    #[error("Activity error: {0}")]
    Activity(#[from] ActivityError),

    #[error("Reply delivery error: {0}")]
    ReplyDelivery(#[from] ReplyDeliveryError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Startup configuration errors. Fatal, never raised at request time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors loading the card template at startup.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("Failed to read card template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Card template is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Card template must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

/// Inbound payload errors, rejected at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("Malformed activity: {0}")]
    Malformed(String),
}

/// Failure to deliver an outbound activity on the conversation.
#[derive(Debug, thiserror::Error)]
pub enum ReplyDeliveryError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Connector rejected activity with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Token acquisition failed: {reason}")]
    Token { reason: String },

    #[error("Activity has no {field} to reply on")]
    MissingConversation { field: &'static str },

    #[error("Invalid serviceUrl {url:?}: {source}")]
    InvalidServiceUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("serviceUrl {url:?} cannot carry a reply path")]
    UnsupportedServiceUrl { url: String },

    #[error("serviceUrl host {host:?} is not a trusted connector")]
    UntrustedServiceUrl { host: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
