//! PrivacyAuditor: scans a finished response for learn-only fingerprints.
//!
//! Fingerprints are prepared once per turn, before generation starts, so the
//! audit itself is a set of substring checks over the normalised response.

use veil_core::config::AuditConfig;
use veil_core::models::{AuditVerdict, FingerprintKind, ScoredChunk, Violation};
use tracing::debug;

use crate::fingerprint::{extract, ChunkFingerprints};
use crate::normalize::{normalize, padded};

/// Builds per-turn fingerprint sets from retrieved learn-only chunks.
#[derive(Debug, Clone, Default)]
pub struct PrivacyAuditor {
    config: AuditConfig,
}

impl PrivacyAuditor {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Fingerprint every learn-only chunk of the turn.
    ///
    /// A fingerprint that also occurs in retrieved citable content is
    /// dropped: quoting a citable source that happens to share wording with
    /// a private note is not a leak.
    pub fn prepare(&self, learn_only: &[ScoredChunk], citable: &[ScoredChunk]) -> PreparedAudit {
        let citable_text: Vec<String> = citable
            .iter()
            .map(|c| padded(&normalize(&c.content)))
            .collect();

        let mut chunks = Vec::with_capacity(learn_only.len());
        let mut dropped = 0usize;
        for chunk in learn_only {
            let mut fingerprints = extract(&chunk.content, &self.config);
            let before = fingerprints.len();
            fingerprints.retain(|fp| {
                let needle = padded(&fp.text);
                !citable_text.iter().any(|c| c.contains(&needle))
            });
            dropped += before - fingerprints.len();
            chunks.push(ChunkFingerprints {
                chunk_id: chunk.chunk_id.clone(),
                source_id: chunk.source_id.clone(),
                fingerprints,
            });
        }

        debug!(
            chunks = chunks.len(),
            fingerprints = chunks.iter().map(|c| c.fingerprints.len()).sum::<usize>(),
            dropped_citable_overlap = dropped,
            "fingerprints prepared"
        );
        PreparedAudit { chunks }
    }

    /// One-shot audit for callers without a prepared set.
    pub fn audit(&self, text: &str, learn_only: &[ScoredChunk]) -> AuditVerdict {
        self.prepare(learn_only, &[]).audit(text)
    }
}

/// Fingerprints of one turn, ready to scan responses against.
#[derive(Debug, Clone, Default)]
pub struct PreparedAudit {
    chunks: Vec<ChunkFingerprints>,
}

impl PreparedAudit {
    pub fn from_chunks(chunks: Vec<ChunkFingerprints>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[ChunkFingerprints] {
        &self.chunks
    }

    pub fn fingerprint_count(&self) -> usize {
        self.chunks.iter().map(|c| c.fingerprints.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprint_count() == 0
    }

    /// Scan `text`. One violation per leaked chunk, ordered by chunk id.
    /// The reported kind is the strongest evidence found for that chunk.
    pub fn audit(&self, text: &str) -> AuditVerdict {
        if self.is_empty() {
            return AuditVerdict::Clean;
        }
        let haystack = padded(&normalize(text));

        let mut violations: Vec<Violation> = Vec::new();
        for chunk in &self.chunks {
            let mut matches = 0usize;
            let mut strongest: Option<FingerprintKind> = None;
            for fp in &chunk.fingerprints {
                if haystack.contains(&padded(&fp.text)) {
                    matches += 1;
                    strongest = Some(match strongest {
                        Some(kind) => kind.max(fp.kind),
                        None => fp.kind,
                    });
                }
            }
            if let Some(kind) = strongest {
                violations.push(Violation {
                    chunk_id: chunk.chunk_id.clone(),
                    source_id: chunk.source_id.clone(),
                    kind,
                    matches,
                });
            }
        }

        if violations.is_empty() {
            debug!(chunks = self.chunks.len(), "audit clean");
            return AuditVerdict::Clean;
        }
        violations.sort_by(|a, b| a.chunk_id.cmp(&b.chunk_id));
        debug!(
            chunks = self.chunks.len(),
            violations = violations.len(),
            "audit found leaked fingerprints"
        );
        AuditVerdict::Violations(violations)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use veil_core::models::Partition;

    use super::*;

    fn scored(id: &str, content: &str, partition: Partition) -> ScoredChunk {
        ScoredChunk {
            chunk_id: id.to_string(),
            source_id: format!("src-{id}"),
            source_title: None,
            content: content.to_string(),
            partition,
            created_at: Utc::now(),
            similarity: 0.5,
        }
    }

    #[test]
    fn empty_prepared_set_is_clean() {
        let audit = PreparedAudit::default();
        assert!(audit.audit("anything at all").is_clean());
    }

    #[test]
    fn strongest_kind_wins() {
        let auditor = PrivacyAuditor::default();
        let chunk = scored(
            "b",
            "Internal discount code: ZX-91-PRIVATE",
            Partition::LearnOnly,
        );
        let verdict = auditor.audit(
            "Use internal discount code ZX-91-PRIVATE today",
            std::slice::from_ref(&chunk),
        );
        let v = verdict.violations();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, FingerprintKind::DistinctiveToken);
        assert_eq!(v[0].matches, 3);
    }

    #[test]
    fn citable_overlap_is_not_a_fingerprint() {
        let auditor = PrivacyAuditor::default();
        let private = scored(
            "p",
            "Refunds are issued within five business days of receipt",
            Partition::LearnOnly,
        );
        let public = scored(
            "c",
            "Refunds are issued within five business days of receipt.",
            Partition::Citable,
        );
        let prepared = auditor.prepare(&[private], &[public]);
        assert!(prepared.is_empty());
        assert!(prepared
            .audit("Refunds are issued within five business days of receipt")
            .is_clean());
    }
}
