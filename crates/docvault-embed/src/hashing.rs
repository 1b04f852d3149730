//! Deterministic bag-of-hashed-tokens embedder.
//!
//! Text is lowercased and split on non-alphanumeric characters; stop words
//! are dropped and every remaining token adds 1.0 to the bucket
//! `xxh64(token, seed) % dim`. The result is L2-normalized. Texts without
//! content tokens map to the zero vector.

use std::hash::Hasher;

use twox_hash::XxHash64;

use docvault_core::{Embedder, Error, Result};

const STOP_WORDS: &[&str] = &[
    "a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    seed: u64,
    id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize, seed: u64) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("hashing embedder needs dim > 0".to_string()));
        }
        Ok(Self { dim, seed, id: format!("hashing:d{dim}:s{seed}") })
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = XxHash64::with_seed(self.seed);
        hasher.write(token.as_bytes());
        (hasher.finish() % self.dim as u64) as usize
    }
}

pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
}

impl Embedder for HashingEmbedder {
    fn id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains('\0') {
            return Err(Error::embedding(&self.id, "binary input (NUL byte) is not supported"));
        }
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            v[self.bucket(&token)] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        Ok(v)
    }
}
