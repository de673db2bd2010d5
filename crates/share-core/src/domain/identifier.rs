//! The session identifier.
//!
//! Identifiers are issued outside this system (they are printed as QR codes
//! on devices) and are opaque to the broker.  The only normalisation applied
//! is trimming surrounding whitespace, which matches how the allow-list file
//! is parsed line by line.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BrokerError;

/// Upper bound on identifier length in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// An opaque, externally issued token naming one pairing session.
///
/// Deserializing goes through [`Identifier::parse`], so a value read from
/// JSON or TOML is validated exactly like one built in code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Parses a raw identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidIdentifier`] if the trimmed value is
    /// empty, longer than [`MAX_IDENTIFIER_LEN`] bytes, or contains control
    /// characters.
    pub fn parse(raw: &str) -> Result<Self, BrokerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BrokerError::InvalidIdentifier("empty".to_string()));
        }
        if trimmed.len() > MAX_IDENTIFIER_LEN {
            return Err(BrokerError::InvalidIdentifier(format!(
                "longer than {MAX_IDENTIFIER_LEN} bytes"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(BrokerError::InvalidIdentifier(
                "contains control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = BrokerError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
