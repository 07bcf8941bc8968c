//! Namespace: the isolation boundary (one per chatbot) inside the vector index.
//!
//! A `Namespace` can only be built through [`Namespace::parse`], so every query
//! that reaches an index carries a concrete, non-empty namespace. There is no
//! wildcard and no "search everything" value.
//!
//! ```
//! use veil_core::models::Namespace;
//!
//! let ns = Namespace::parse("bot-42").unwrap();
//! assert_eq!(ns.as_str(), "bot-42");
//! assert!(Namespace::parse("   ").is_err());
//! assert!(Namespace::parse("*").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::RetrievalError;

const MAX_NAMESPACE_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a raw namespace string.
    ///
    /// Accepts ASCII letters, digits, `-`, `_`, `.` and `:`. Surrounding
    /// whitespace is rejected rather than trimmed so two spellings can never
    /// alias the same tenant.
    pub fn parse(raw: &str) -> Result<Self, RetrievalError> {
        if raw.is_empty() {
            return Err(RetrievalError::InvalidNamespace {
                reason: "namespace is empty".to_string(),
            });
        }
        if raw.len() > MAX_NAMESPACE_LEN {
            return Err(RetrievalError::InvalidNamespace {
                reason: format!("namespace longer than {MAX_NAMESPACE_LEN} bytes"),
            });
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')))
        {
            return Err(RetrievalError::InvalidNamespace {
                reason: format!("illegal character {bad:?} in namespace"),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = RetrievalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}
