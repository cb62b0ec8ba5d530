//! Deterministic fallback embeddings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Where a stored embedding came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    Model,
    HashFallback,
    Zero,
}

/// Unit-length pseudo-embedding of `dim` values seeded from a SHA-256 of `text`.
///
/// The same text always maps to the same vector. Returns `None` when `dim` is
/// zero or the generated vector has no magnitude.
pub fn hash_embedding(text: &str, dim: usize) -> Option<Vec<f32>> {
    if dim == 0 {
        return None;
    }

    let mut values = Vec::with_capacity(dim);
    let mut block: u32 = 0;
    while values.len() < dim {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(block.to_le_bytes());
        let digest = hasher.finalize();
        for chunk in digest.chunks_exact(4) {
            if values.len() == dim {
                break;
            }
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            values.push((raw as f64 / u32::MAX as f64) * 2.0 - 1.0);
        }
        block = block.wrapping_add(1);
    }

    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    Some(values.into_iter().map(|v| (v / norm) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_unit_length() {
        let a = hash_embedding("hello", 768).unwrap();
        let b = hash_embedding("hello", 768).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 768);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn different_text_gives_different_vectors() {
        assert_ne!(hash_embedding("hello", 16), hash_embedding("world", 16));
    }

    #[test]
    fn zero_dimension_has_no_embedding() {
        assert!(hash_embedding("hello", 0).is_none());
    }

    #[test]
    fn odd_dimensions_are_filled_exactly() {
        assert_eq!(hash_embedding("x", 13).map(|v| v.len()), Some(13));
    }
}
