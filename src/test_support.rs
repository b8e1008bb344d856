use std::sync::Arc;

use axum::{body::Body, http::Response, Router};
use http_body_util::BodyExt;
use serde_json::Value;

use crate::{
    cache::LinkCache, config::BaseConfig, service::ResolutionService, store::memory::MemoryStore,
    AppState,
};

/// Router wired to an in-memory store, with `website = http://example.com`.
pub fn test_app() -> (Router, Arc<MemoryStore>) {
    let base = BaseConfig {
        website: "http://example.com".into(),
        port: 0,
        length: 8,
        cache_time: 30,
    };
    let store = Arc::new(MemoryStore::new());
    let links = ResolutionService::new(&base, store.clone(), LinkCache::new());

    (crate::router(Arc::new(AppState { links })), store)
}

pub async fn body_json(res: Response<Body>) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
