//! Audit soundness: verbatim leaks are always caught, unrelated text never is.

use chrono::Utc;
use proptest::prelude::*;
use veil_core::config::AuditConfig;
use veil_core::models::{Partition, ScoredChunk};
use veil_privacy::PrivacyAuditor;

fn learn_only(content: String) -> ScoredChunk {
    ScoredChunk {
        chunk_id: "secret".to_string(),
        source_id: "notes".to_string(),
        source_title: None,
        content,
        partition: Partition::LearnOnly,
        created_at: Utc::now(),
        similarity: 0.5,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_verbatim_copy_is_always_a_violation(
        words in prop::collection::vec("[a-z]{4,9}", 5..20),
        prefix in "[A-Za-z ,.]{0,40}",
        suffix in "[A-Za-z ,.]{0,40}",
    ) {
        let content = words.join(" ");
        let auditor = PrivacyAuditor::new(AuditConfig::default());
        let text = format!("{prefix} {content} {suffix}");
        let verdict = auditor.audit(&text, &[learn_only(content)]);
        prop_assert!(!verdict.is_clean());
    }

    #[test]
    fn prop_digit_free_text_never_matches_code_token(
        text in "[a-z ]{0,200}",
        code in "[a-z]{3}[0-9]{4}",
    ) {
        let auditor = PrivacyAuditor::default();
        let content = format!("code {code}");
        let verdict = auditor.audit(&text, &[learn_only(content)]);
        prop_assert!(verdict.is_clean());
    }
}
