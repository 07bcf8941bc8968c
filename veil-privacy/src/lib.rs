//! # veil-privacy
//!
//! [`PrivacyAuditor`] decides whether a finished response leaked learn-only
//! knowledge. Each learn-only chunk is reduced to distinguishing fingerprints
//! (word n-grams, code-like tokens, or the whole of a short chunk) and the
//! response is scanned for any of them verbatim, case-insensitively and on
//! word boundaries.
//!
//! The check is explainable and conservative. Paraphrased disclosure is not
//! detected.

pub mod auditor;
pub mod fingerprint;
pub mod normalize;

pub use auditor::{PreparedAudit, PrivacyAuditor};
pub use fingerprint::{ChunkFingerprints, Fingerprint};
