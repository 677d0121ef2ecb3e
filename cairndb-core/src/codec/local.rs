//! Deterministic offline embedding model.
//!
//! Text is lowercased and split into alphanumeric words. Each word, and each
//! character trigram of the word padded with spaces, is hashed with CRC-32
//! into a signed bucket of the output vector; the result is L2-normalized.
//! Texts sharing words or word fragments land close under cosine distance.
//!
//! CRC-32 is fixed by its polynomial, so vectors are identical across runs,
//! builds and platforms.

/// Default dimension of the local model.
pub const DEFAULT_LOCAL_DIMENSION: usize = 384;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder with a fixed output dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEmbedder {
    dimension: usize,
}

impl LocalEmbedder {
    /// Creates an embedder producing vectors of `dimension` components.
    ///
    /// A zero dimension is bumped to one.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embeds a single text.
    ///
    /// Text without any alphanumeric character maps to the zero vector.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.accumulate(&mut vector, b'w', word.as_bytes(), WORD_WEIGHT);

            let padded: Vec<char> = std::iter::once(' ')
                .chain(word.chars())
                .chain(std::iter::once(' '))
                .collect();
            let mut buf = String::with_capacity(12);
            for window in padded.windows(3) {
                buf.clear();
                buf.extend(window);
                self.accumulate(&mut vector, b't', buf.as_bytes(), TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    /// Embeds a batch of texts, preserving order.
    pub fn embed(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }

    fn accumulate(&self, vector: &mut [f32], kind: u8, feature: &[u8], weight: f32) {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&[kind]);
        hasher.update(feature);
        let hash = hasher.finalize();

        let bucket = (hash as usize) % self.dimension;
        let sign = if hash >> 31 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_DIMENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::cosine_distance;

    #[test]
    fn test_dimension_and_norm() {
        let embedder = LocalEmbedder::new(64);
        let v = embedder.embed_one("Business class is only permitted for long flights");
        assert_eq!(v.len(), 64);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let embedder = LocalEmbedder::default();
        let a = embedder.embed(&["x"]);
        let b = embedder.embed(&["x"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = LocalEmbedder::default();
        assert_eq!(
            embedder.embed_one("Hotel budget?"),
            embedder.embed_one("hotel, BUDGET")
        );
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = LocalEmbedder::new(8);
        assert_eq!(embedder.embed_one("  ... "), vec![0.0; 8]);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = LocalEmbedder::default();
        let query = embedder.embed_one("international flights policy");
        let flights = embedder.embed_one(
            "Business class is only permitted for international flights over 8 hours.",
        );
        let cars = embedder.embed_one("A mid-size sedan is the standard for car rentals.");

        assert!(cosine_distance(&query, &flights) < cosine_distance(&query, &cars));
    }

    #[test]
    fn test_batch_preserves_order() {
        let embedder = LocalEmbedder::new(32);
        let batch = embedder.embed(&["alpha", "beta"]);
        assert_eq!(batch[0], embedder.embed_one("alpha"));
        assert_eq!(batch[1], embedder.embed_one("beta"));
    }

    #[test]
    fn test_zero_dimension_is_clamped() {
        assert_eq!(LocalEmbedder::new(0).dimension(), 1);
    }
}
