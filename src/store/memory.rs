use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{LinkStore, StoreError};

/// In-process `LinkStore` for tests.
///
/// `set_offline(true)` makes every call fail, standing in for an
/// unreachable Redis.
#[derive(Debug, Default)]
pub struct MemoryStore {
    mappings: DashMap<String, String>,
    dedup: DashMap<String, String>,
    visits: DashMap<String, u64>,
    offline: AtomicBool,
    mapping_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// How many times `get_mapping` has been called.
    pub fn mapping_reads(&self) -> usize {
        self.mapping_reads.load(Ordering::SeqCst)
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Offline)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn put_mapping(&self, short_code: &str, long_url: &str) -> Result<(), StoreError> {
        self.check()?;
        self.mappings
            .insert(short_code.to_owned(), long_url.to_owned());
        Ok(())
    }

    async fn get_mapping(&self, short_code: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        self.mapping_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.mappings.get(short_code).map(|v| v.clone()))
    }

    async fn get_dedup(&self, url_hash: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.dedup.get(url_hash).map(|v| v.clone()))
    }

    async fn claim_dedup(&self, url_hash: &str, short_code: &str) -> Result<String, StoreError> {
        self.check()?;
        let entry = self
            .dedup
            .entry(url_hash.to_owned())
            .or_insert_with(|| short_code.to_owned());
        Ok(entry.clone())
    }

    async fn increment_visits(&self, short_code: &str) -> Result<(), StoreError> {
        self.check()?;
        *self.visits.entry(short_code.to_owned()).or_insert(0) += 1;
        Ok(())
    }

    async fn get_visits(&self, short_code: &str) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.visits.get(short_code).map(|v| *v).unwrap_or(0))
    }
}
