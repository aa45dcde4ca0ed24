//! Card template store: the Adaptive Card sent in reply to "show card".
//!
//! The card is parsed once at startup and shared read-only by every request.
//! A template that fails to parse aborts startup: there is no fallback
//! rendering path.

use std::path::Path;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::info;

use crate::activity::{ADAPTIVE_CARD_CONTENT_TYPE, Attachment};
use crate::error::CardError;

/// Card shipped inside the binary, used when no external file is configured.
const BUNDLED_CARD: &str = include_str!("../../cards/adaptive_card.json");

/// Immutable, cheaply cloneable Adaptive Card document.
#[derive(Debug, Clone, PartialEq)]
pub struct CardTemplate {
    document: Arc<serde_json::Map<String, serde_json::Value>>,
}

impl CardTemplate {
    /// Parse a card from JSON text. The document must be a JSON object.
    pub fn from_json(raw: &str) -> Result<Self, CardError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CardError> {
        match value {
            serde_json::Value::Object(document) => Ok(Self {
                document: Arc::new(document),
            }),
            other => Err(CardError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    /// Load a card from a file on disk.
    pub fn load(path: &Path) -> Result<Self, CardError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CardError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let card = Self::from_json(&raw)?;
        info!(path = %path.display(), fields = card.fields().len(), "Loaded card template");
        Ok(card)
    }

    /// The card bundled with the binary.
    pub fn bundled() -> Result<Self, CardError> {
        Self::from_json(BUNDLED_CARD)
    }

    /// Load from `path` when given, otherwise fall back to the bundled card.
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, CardError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    /// Read-only view of the top-level card fields.
    pub fn fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.document
    }

    /// The card as a standalone JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object((*self.document).clone())
    }

    /// Wrap the card as an Adaptive Card attachment.
    pub fn to_attachment(&self) -> Attachment {
        Attachment {
            content_type: ADAPTIVE_CARD_CONTENT_TYPE.to_string(),
            content: self.to_value(),
        }
    }
}

impl Serialize for CardTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
