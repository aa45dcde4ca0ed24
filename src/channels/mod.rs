//! Outbound reply delivery.

pub mod connector;
pub mod sender;
pub mod token;

pub use connector::ConnectorClient;
pub use sender::{ReplySender, TurnContext, outbound_activity};
pub use token::TokenProvider;
