use dashmap::{mapref::entry::Entry, DashMap};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{task::AbortHandle, time::Instant};

#[derive(Debug)]
struct CachedLink {
    long_url: String,
    /// Identifies the `set` call that installed this entry.
    generation: u64,
    expires_at: Instant,
    /// Timer that removes this entry once `expires_at` passes.
    expiry: AbortHandle,
}

/// Thread-safe in-memory cache mapping short_code -> long URL, where every
/// entry removes itself a fixed TTL after it was written.
///
/// Backed by a DashMap so unrelated codes never contend on the same lock.
/// Each `set` schedules one removal timer and aborts the timer of the entry
/// it replaces; a timer only removes the entry it was scheduled for, so a
/// fresh value is never evicted by an older write's timer.
///
/// `set` must be called from within a tokio runtime.
#[derive(Clone, Debug, Default)]
pub struct LinkCache {
    inner: Arc<DashMap<String, CachedLink>>,
    generation: Arc<AtomicU64>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a mapping that expires after `ttl`.
    pub fn set(&self, short_code: impl Into<String>, long_url: impl Into<String>, ttl: Duration) {
        let short_code = short_code.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        // Holding the shard lock while scheduling keeps the timer from
        // observing the map before this entry is in place.
        let slot = self.inner.entry(short_code.clone());
        let expiry = self.schedule_removal(short_code, generation, ttl);

        let link = CachedLink {
            long_url: long_url.into(),
            generation,
            expires_at: Instant::now() + ttl,
            expiry,
        };

        match slot {
            Entry::Occupied(mut occupied) => occupied.insert(link).expiry.abort(),
            Entry::Vacant(vacant) => {
                vacant.insert(link);
            }
        }
    }

    /// Look up a short code. Returns a clone of the long URL if present and
    /// not yet expired.
    pub fn get(&self, short_code: &str) -> Option<String> {
        let link = self.inner.get(short_code)?;
        (Instant::now() < link.expires_at).then(|| link.long_url.clone())
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    fn schedule_removal(&self, short_code: String, generation: u64, ttl: Duration) -> AbortHandle {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if inner
                .remove_if(&short_code, |_, link| link.generation == generation)
                .is_some()
            {
                tracing::debug!(code = %short_code, "Cache entry expired");
            }
        })
        .abort_handle()
    }
}
