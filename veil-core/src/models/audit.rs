use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a leaked fingerprint was derived from its learn-only chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintKind {
    /// Multi-word n-gram.
    NGram,
    /// Single code-like token (letters mixed with digits).
    DistinctiveToken,
    /// The whole of a short chunk.
    WholeChunk,
}

impl FingerprintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NGram => "ngram",
            Self::DistinctiveToken => "distinctive_token",
            Self::WholeChunk => "whole_chunk",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ngram" => Some(Self::NGram),
            "distinctive_token" => Some(Self::DistinctiveToken),
            "whole_chunk" => Some(Self::WholeChunk),
            _ => None,
        }
    }
}

/// A learn-only chunk that leaked into generated text. Carries ids only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub chunk_id: String,
    pub source_id: String,
    pub kind: FingerprintKind,
    /// Number of distinct fingerprints of this chunk found in the text.
    pub matches: usize,
}

/// Result of auditing one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditVerdict {
    Clean,
    Violations(Vec<Violation>),
}

impl AuditVerdict {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Clean => &[],
            Self::Violations(v) => v,
        }
    }
}

/// Audit-log row written for operator review when a response is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub session_id: String,
    pub conversation_id: String,
    pub chatbot_id: String,
    pub chunk_id: String,
    pub source_id: String,
    pub kind: FingerprintKind,
    pub recorded_at: DateTime<Utc>,
}
