//! Embedding vectors and similarity math.
//!
//! Vectors are fixed-width f32 arrays produced by the embedding
//! provider. Similarity uses a stabilized cosine so that zero vectors
//! (stored when the provider was unavailable) score near zero instead
//! of dividing by zero.

use super::types::{ConversationId, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Width of every stored embedding vector.
pub const EMBEDDING_DIM: usize = 768;

/// Stabilizer added to the similarity denominator.
const COSINE_EPSILON: f64 = 1e-9;

/// A dense embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Vector components.
    pub values: Vec<f32>,
}

impl Embedding {
    /// Wraps a raw vector.
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// An all-zero vector of the standard width, used as a degraded
    /// stand-in when the provider fails.
    pub fn zero() -> Self {
        Self {
            values: vec![0.0; EMBEDDING_DIM],
        }
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity with a stabilized denominator.
    ///
    /// Returns 0.0 when the dimensions differ. Accumulates in f64 to
    /// keep the sum stable over long vectors.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }

        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;
        for (a, b) in self.values.iter().zip(other.values.iter()) {
            let a = *a as f64;
            let b = *b as f64;
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        (dot / (norm_a.sqrt() * norm_b.sqrt() + COSINE_EPSILON)) as f32
    }

    /// Serializes to little-endian f32 bytes for BLOB storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.values
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    /// Deserializes from little-endian f32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let values = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self { values }
    }
}

/// A stored embedding row, one per message.
#[derive(Debug, Clone)]
pub struct MessageEmbedding {
    /// Message this vector belongs to. Unique per message.
    pub message_id: MessageId,
    /// The vector itself.
    pub vector: Embedding,
    /// When the vector was stored.
    pub created_at: DateTime<Utc>,
}

/// A message joined with its stored embedding, ready for ranking.
#[derive(Debug, Clone)]
pub struct EmbeddedMessage {
    /// Message identifier.
    pub message_id: MessageId,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Message text.
    pub content: String,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
    /// Stored embedding vector.
    pub vector: Embedding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_near_one() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        let b = Embedding::new(vec![1.0, 2.0, 3.0]);
        let sim = a.cosine_similarity(&b);
        assert!((sim - 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_near_zero() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert!(a.cosine_similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_near_negative_one() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![-1.0, 0.0]);
        let sim = a.cosine_similarity(&b);
        assert!((sim + 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn cosine_with_zero_vector_stays_finite() {
        let a = Embedding::zero();
        let b = Embedding::new(vec![1.0; EMBEDDING_DIM]);
        let sim = a.cosine_similarity(&b);
        assert!(sim.is_finite());
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_of_mismatched_dimensions_is_zero() {
        let a = Embedding::new(vec![1.0, 2.0]);
        let b = Embedding::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn zero_vector_has_standard_width() {
        assert_eq!(Embedding::zero().dimension(), EMBEDDING_DIM);
    }

    #[test]
    fn bytes_round_trip() {
        let original = Embedding::new(vec![0.5, -1.25, 3.75, 0.0]);
        let restored = Embedding::from_bytes(&original.to_bytes());
        assert_eq!(original, restored);
    }

    #[test]
    fn from_bytes_ignores_trailing_partial_chunk() {
        let mut bytes = Embedding::new(vec![1.0, 2.0]).to_bytes();
        bytes.push(0xFF);
        let restored = Embedding::from_bytes(&bytes);
        assert_eq!(restored.values, vec![1.0, 2.0]);
    }
}
