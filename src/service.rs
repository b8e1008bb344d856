use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    cache::LinkCache,
    config::BaseConfig,
    shortcode::{content_hash, CodeGenerator},
    store::{LinkStore, StoreError},
    task,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("short URL not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStats {
    pub short_url: String,
    pub long_url: String,
    pub visits: u64,
}

/// Creates short links and resolves them, reading through the local cache
/// into the durable store. Holds no per-request state; clone freely.
#[derive(Clone)]
pub struct ResolutionService {
    store: Arc<dyn LinkStore>,
    cache: LinkCache,
    generator: CodeGenerator,
    website: String,
    cache_ttl: Duration,
}

impl ResolutionService {
    pub fn new(base: &BaseConfig, store: Arc<dyn LinkStore>, cache: LinkCache) -> Self {
        Self {
            store,
            cache,
            generator: CodeGenerator::new(base.length),
            website: base.website.clone(),
            cache_ttl: base.cache_ttl(),
        }
    }

    /// Shorten `long_url`, returning the full short URL. A URL that was
    /// shortened before gets its existing code back.
    ///
    /// The dedup entry is claimed with a conditional write after the mapping
    /// is stored, so concurrent creates of the same URL all end up with the
    /// code of whichever claim landed first.
    pub async fn create(
        &self,
        long_url: &str,
        custom_domain: Option<&str>,
    ) -> Result<String, ServiceError> {
        if long_url.is_empty() {
            return Err(ServiceError::Validation("long_url is required"));
        }

        let (mut code, is_new) = self.generator.generate(self.store.as_ref(), long_url).await?;

        if is_new {
            self.store.put_mapping(&code, long_url).await?;
            let registered = self.store.claim_dedup(&content_hash(long_url), &code).await?;

            if registered == code {
                self.cache.set(&code, long_url, self.cache_ttl);
                info!(code = %code, "Short link created");
            } else {
                debug!(
                    code = %code,
                    existing = %registered,
                    "Concurrent create won, reusing its code"
                );
                code = registered;
            }
        }

        let domain = custom_domain
            .map(|d| d.trim_end_matches('/'))
            .filter(|d| !d.is_empty())
            .unwrap_or(self.website.as_str());

        Ok(format!("{domain}/{code}"))
    }

    /// Resolve `short_code` to its redirect target with `query` merged in.
    ///
    /// Never fails: unknown codes resolve to `website/short_code`. The visit
    /// counter is bumped in the background.
    pub async fn redirect(&self, short_code: &str, query: Option<&str>) -> String {
        let target = match self.cache.get(short_code) {
            Some(url) => url,
            None => match self.store.get_mapping(short_code).await {
                Ok(found) => {
                    let url = found.unwrap_or_else(|| self.fallback_url(short_code));
                    self.cache.set(short_code, url.clone(), self.cache_ttl);
                    url
                }
                Err(e) => {
                    warn!(error = %e, code = %short_code, "Store lookup failed, using fallback");
                    self.fallback_url(short_code)
                }
            },
        };

        self.record_visit(short_code);

        merge_query(target, query)
    }

    pub async fn stats(&self, short_code: &str) -> Result<LinkStats, ServiceError> {
        let long_url = self
            .store
            .get_mapping(short_code)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let visits = self.store.get_visits(short_code).await?;

        Ok(LinkStats {
            short_url: format!("{}/{}", self.website, short_code),
            long_url,
            visits,
        })
    }

    /// Same-site URL served for codes with no mapping.
    pub fn fallback_url(&self, short_code: &str) -> String {
        format!("{}/{}", self.website, short_code)
    }

    pub fn cache(&self) -> &LinkCache {
        &self.cache
    }

    fn record_visit(&self, short_code: &str) {
        let store = Arc::clone(&self.store);
        let short_code = short_code.to_owned();

        task::spawn_supervised("increment_visits", async move {
            if let Err(e) = store.increment_visits(&short_code).await {
                warn!(error = %e, code = %short_code, "Failed to increment visit counter");
            }
        });
    }
}

/// Append a raw query string to `target`, joining with `&` when the target
/// already carries a query.
pub fn merge_query(mut target: String, query: Option<&str>) -> String {
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push(if target.contains('?') { '&' } else { '?' });
        target.push_str(query);
    }
    target
}
