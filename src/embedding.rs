//! Vector-representation providers.
//!
//! The ranker only relies on the [`Embedder`] contract: text in, fixed-length
//! vector out, with the same dimension for the whole run. Providers are
//! heavyweight in general, so one is built at startup and shared as
//! `Arc<dyn Embedder>` across every ranking call.
//!
//! [`HashingEmbedder`] is deterministic, offline, and dependency-free beyond
//! `blake3`. It is *not* a neural embedding model: it hashes word tokens and
//! character trigrams into signed buckets, which is enough to rank spelling
//! variants of cell line names ("MCF7" vs "MCF-7") close together.

use blake3::Hasher;

use crate::error::ConfigError;

/// Default embedding dimensionality for [`HashingEmbedder`].
pub const DEFAULT_EMBEDDING_DIM: usize = 256;

/// Maps a text span to a fixed-length real vector.
pub trait Embedder: Send + Sync {
    /// Dimension of every vector this provider returns.
    fn dim(&self) -> usize;

    /// Embeds `text`. The returned vector has length [`Self::dim`].
    fn embed(&self, text: &str) -> Vec<f32>;
}

fn tokenize(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// Deterministic feature-hashing embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    /// Creates an embedder with the given dimension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ModelUnavailable`] when `dim` is zero.
    pub fn new(dim: usize) -> Result<Self, ConfigError> {
        if dim == 0 {
            return Err(ConfigError::ModelUnavailable {
                reason: "hashing embedder requires a non-zero dimension".to_string(),
            });
        }
        Ok(Self { dim })
    }

    fn add_feature(&self, vec: &mut [f32], namespace: u8, feature: &str, weight: f32) {
        let mut h = Hasher::new();
        h.update(&[namespace]);
        h.update(feature.as_bytes());
        let hash = h.finalize();

        let bytes = hash.as_bytes();
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&bytes[..8]);
        let bucket = u64::from_le_bytes(bucket);

        #[allow(clippy::cast_possible_truncation)]
        let idx = (bucket % self.dim as u64) as usize;
        let sign = if (bytes[8] & 1) == 0 { 1.0f32 } else { -1.0f32 };
        vec[idx] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();
        let mut count = 0u32;

        for token in tokenize(&lowered) {
            self.add_feature(&mut vec, 0, token, 0.5);
            count = count.saturating_add(1);
        }

        // Character trigrams over the punctuation-free form, padded at the ends.
        // Trigrams carry twice the weight of whole tokens.
        let compact: Vec<char> = std::iter::once('^')
            .chain(lowered.chars().filter(|c| c.is_alphanumeric()))
            .chain(std::iter::once('$'))
            .collect();
        if compact.len() > 2 {
            for window in compact.windows(3) {
                let gram: String = window.iter().collect();
                self.add_feature(&mut vec, 1, &gram, 1.0);
                count = count.saturating_add(1);
            }
        }

        if count == 0 {
            return vec;
        }

        // L2-normalize.
        let norm2: f64 = vec.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
        if norm2 > 0.0 {
            #[allow(clippy::cast_possible_truncation)]
            let inv = norm2.sqrt().recip() as f32;
            for x in &mut vec {
                *x *= inv;
            }
        }

        vec
    }
}
