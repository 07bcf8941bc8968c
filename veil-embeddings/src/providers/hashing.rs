//! Feature-hashing provider.
//!
//! Hashes terms into fixed-dimension buckets weighted by term frequency.
//! Deterministic and dependency-free, so it serves offline deployments and
//! tests. Not semantically rich.

use std::collections::HashMap;

use async_trait::async_trait;
use veil_core::errors::VeilResult;
use veil_core::traits::EmbeddingProvider;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// FNV-1a bucket for a term.
    fn bucket(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h as usize) % dims
    }

    fn terms(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() >= 2)
            .map(|s| s.to_lowercase())
            .collect()
    }

    /// Dense vector for `text`. Empty input yields the zero vector.
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return out;
        }
        let terms = Self::terms(text);
        if terms.is_empty() {
            return out;
        }

        let mut tf: HashMap<&str, f32> = HashMap::new();
        for term in &terms {
            *tf.entry(term.as_str()).or_default() += 1.0;
        }

        let total = terms.len() as f32;
        for (term, count) in tf {
            // Longer terms carry more signal than short function words.
            let weight = 1.0 + (term.len() as f32).ln();
            out[Self::bucket(term, self.dimensions)] += (count / total) * weight;
        }

        let norm: f32 = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut out {
                *v /= norm;
            }
        }
        out
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> VeilResult<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(32).vector("");
        assert_eq!(v.len(), 32);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn output_has_unit_norm() {
        let v = HashingEmbedder::new(256).vector("refund policy for annual plans");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[test]
    fn deterministic() {
        let p = HashingEmbedder::new(128);
        assert_eq!(p.vector("same text"), p.vector("same text"));
    }

    #[test]
    fn overlapping_texts_score_higher() {
        let p = HashingEmbedder::new(256);
        let a = p.vector("refund policy annual subscription");
        let b = p.vector("annual subscription refund window");
        let c = p.vector("office parking garage hours");
        assert!(cosine(&a, &b) > cosine(&a, &c));
    }

    #[tokio::test]
    async fn trait_embed_matches_vector() {
        let p = HashingEmbedder::new(64);
        assert_eq!(p.embed("hello world").await.unwrap(), p.vector("hello world"));
    }
}
