use rand::Rng;
use sha2::{Digest, Sha256};

use crate::store::{LinkStore, StoreError};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Lowercase hex SHA-256 of a long URL, the key of the dedup index.
pub fn content_hash(long_url: &str) -> String {
    let digest = Sha256::digest(long_url.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hands out fixed-length short codes, reusing the existing code when a
/// long URL has been shortened before.
///
/// Only reads the dedup index; persisting a new code is up to the caller.
/// Fresh codes are not checked against codes issued for other URLs.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Returns `(code, is_new)`. `is_new` is false when the dedup index
    /// already holds a code for `long_url`.
    pub async fn generate(
        &self,
        store: &dyn LinkStore,
        long_url: &str,
    ) -> Result<(String, bool), StoreError> {
        if let Some(existing) = store.get_dedup(&content_hash(long_url)).await? {
            return Ok((existing, false));
        }
        Ok((self.random_code(), true))
    }

    fn random_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
