//! Fingerprint extraction from learn-only chunks.

use std::collections::BTreeSet;

use veil_core::config::AuditConfig;
use veil_core::models::FingerprintKind;

use crate::normalize::normalize;

/// Function words that make an n-gram built only from them meaningless as
/// evidence of a leak.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "do", "does", "for", "from", "has", "have", "he", "her", "his", "how",
    "i", "if", "in", "into", "is", "it", "its", "may", "more", "no", "not", "of", "on", "or",
    "our", "she", "so", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "to", "up", "us", "was", "we", "were", "what", "when", "which", "who",
    "will", "with", "would", "you", "your",
];

fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// One normalised phrase that, found verbatim in a response, proves a leak.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fingerprint {
    pub kind: FingerprintKind,
    pub text: String,
}

/// All fingerprints of one learn-only chunk. Holds normalised phrases, never
/// the original content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFingerprints {
    pub chunk_id: String,
    pub source_id: String,
    pub fingerprints: Vec<Fingerprint>,
}

impl ChunkFingerprints {
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

/// Extract fingerprints from `content`.
///
/// - every `ngram_size`-word window that is not made only of stopwords and
///   is at least `min_fingerprint_chars` long;
/// - every code-like token (letters mixed with digits, or a long digit run)
///   of at least `min_distinctive_token_chars` characters, normalised so
///   `ZX-91-PRIVATE` matches `zx 91 private`;
/// - every all-caps or camel-case token (`SUMMERSECRET`, `OrchidVault`) of
///   at least `min_distinctive_token_chars` letters that is not a stopword;
/// - for chunks with fewer words than an n-gram: every shorter window of two
///   or more words that passes the same length and stopword rules, plus the
///   whole chunk.
pub fn extract(content: &str, config: &AuditConfig) -> Vec<Fingerprint> {
    let mut out: BTreeSet<Fingerprint> = BTreeSet::new();
    let normalized = normalize(content);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    let n = config.ngram_size.max(2);

    if words.len() >= n {
        insert_windows(&mut out, &words, n, config.min_fingerprint_chars);
    } else {
        for size in 2..words.len() {
            insert_windows(&mut out, &words, size, config.min_fingerprint_chars);
        }
        if normalized.len() >= config.min_fingerprint_chars
            && !words.iter().all(|w| is_stopword(w))
        {
            out.insert(Fingerprint {
                kind: FingerprintKind::WholeChunk,
                text: normalized.clone(),
            });
        }
    }

    for raw in content.split_whitespace() {
        let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
        if is_distinctive(token, config.min_distinctive_token_chars) {
            let text = normalize(token);
            if !text.is_empty() {
                out.insert(Fingerprint {
                    kind: FingerprintKind::DistinctiveToken,
                    text,
                });
            }
        }
    }

    out.into_iter().collect()
}

fn insert_windows(out: &mut BTreeSet<Fingerprint>, words: &[&str], size: usize, min_chars: usize) {
    for window in words.windows(size) {
        if window.iter().all(|w| is_stopword(w)) {
            continue;
        }
        let phrase = window.join(" ");
        if phrase.len() >= min_chars {
            out.insert(Fingerprint {
                kind: FingerprintKind::NGram,
                text: phrase,
            });
        }
    }
}

/// Letters mixed with digits (`ZX-91-PRIVATE`, `sku4431`), or a digit run
/// long enough to be an identifier.
fn is_distinctive(token: &str, min_chars: usize) -> bool {
    if token.chars().count() < min_chars {
        return false;
    }
    let has_alpha = token.chars().any(char::is_alphabetic);
    let digits = token.chars().filter(char::is_ascii_digit).count();
    (has_alpha && digits > 0) || (!has_alpha && digits >= min_chars) || is_unusual_word(token, min_chars)
}

/// A long word whose casing marks it as a name or code rather than prose:
/// all capitals (`SUMMERSECRET`) or a capital after a lowercase letter
/// (`OrchidVault`).
fn is_unusual_word(token: &str, min_chars: usize) -> bool {
    let letters: Vec<char> = token.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < min_chars || is_stopword(&token.to_lowercase()) {
        return false;
    }
    let all_caps = letters.iter().all(|c| c.is_uppercase());
    let interior_capital = letters
        .windows(2)
        .any(|pair| pair[0].is_lowercase() && pair[1].is_uppercase());
    all_caps || interior_capital
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(fps: &[Fingerprint], kind: FingerprintKind) -> Vec<String> {
        fps.iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.text.clone())
            .collect()
    }

    #[test]
    fn stopword_list_is_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn discount_code_yields_distinctive_token_and_ngrams() {
        let fps = extract("Internal discount code: ZX-91-PRIVATE", &AuditConfig::default());
        assert_eq!(
            texts(&fps, FingerprintKind::DistinctiveToken),
            vec!["zx 91 private".to_string()]
        );
        assert_eq!(
            texts(&fps, FingerprintKind::NGram),
            vec![
                "discount code zx 91 private".to_string(),
                "internal discount code zx 91".to_string(),
            ]
        );
    }

    #[test]
    fn short_chunk_is_fingerprinted_whole() {
        let fps = extract("Churn is rising fast", &AuditConfig::default());
        assert_eq!(
            texts(&fps, FingerprintKind::WholeChunk),
            vec!["churn is rising fast".to_string()]
        );
    }

    #[test]
    fn stopword_only_ngrams_are_skipped() {
        let config = AuditConfig {
            ngram_size: 3,
            ..AuditConfig::default()
        };
        let fps = extract("it is what it is", &config);
        assert!(texts(&fps, FingerprintKind::NGram).is_empty());
    }

    #[test]
    fn plain_words_and_short_numbers_are_not_distinctive() {
        assert!(!is_distinctive("policy", 6));
        assert!(!is_distinctive("30", 6));
        assert!(!is_distinctive("v2", 6));
        assert!(is_distinctive("sku4431", 6));
        assert!(is_distinctive("4111111111", 6));
        assert!(!is_distinctive("Policy", 6));
    }

    #[test]
    fn capitalised_codes_are_distinctive() {
        assert!(is_distinctive("SUMMERSECRET", 6));
        assert!(is_distinctive("OrchidVault", 6));
        assert!(!is_distinctive("FAQ", 6));
        assert!(!is_distinctive("Internal", 6));
    }

    #[test]
    fn short_chunk_yields_sub_windows() {
        let fps = extract("Internal discount code: SUMMERSECRET", &AuditConfig::default());
        assert_eq!(
            texts(&fps, FingerprintKind::DistinctiveToken),
            vec!["summersecret".to_string()]
        );
        let ngrams = texts(&fps, FingerprintKind::NGram);
        assert!(ngrams.contains(&"discount code summersecret".to_string()));
        assert!(ngrams.contains(&"code summersecret".to_string()));
        assert!(ngrams.contains(&"internal discount".to_string()));
        assert!(!ngrams.contains(&"internal discount code summersecret".to_string()));
        assert_eq!(
            texts(&fps, FingerprintKind::WholeChunk),
            vec!["internal discount code summersecret".to_string()]
        );
    }
}
