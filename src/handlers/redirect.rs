use crate::AppState;
use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// GET /:code
///
/// 1. Resolve the code through the local cache, then the store; unknown
///    codes resolve to the same-site fallback instead of a 404.
/// 2. Append the incoming query string to the target.
/// 3. Return a 301 redirect. The visit count is recorded in the background.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let target = state.links.redirect(&code, query.as_deref()).await;

    // Stored URLs are passed through unvalidated and may not be legal
    // header values.
    let location = HeaderValue::from_str(&target)
        .or_else(|_| {
            tracing::warn!(code = %code, "Redirect target is not a valid Location header");
            HeaderValue::from_str(&state.links.fallback_url(&code))
        })
        .unwrap_or_else(|_| HeaderValue::from_static("/"));

    let headers = [(header::LOCATION, location)];
    (StatusCode::MOVED_PERMANENTLY, headers).into_response()
}

#[cfg(test)]
mod tests {
    use crate::{
        store::LinkStore,
        test_support::{body_json, test_app},
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    async fn location_of(app: Router, uri: &str) -> String {
        let res = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        res.headers()[header::LOCATION].to_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn redirects_to_stored_url() {
        let (app, store) = test_app();
        store.put_mapping("abc", "http://h/p").await.unwrap();

        assert_eq!(location_of(app, "/abc").await, "http://h/p");
    }

    #[tokio::test]
    async fn merges_query_string() {
        let (app, store) = test_app();
        store.put_mapping("abc", "http://h/p").await.unwrap();
        store.put_mapping("def", "http://h/p?y=2").await.unwrap();

        assert_eq!(location_of(app.clone(), "/abc?x=1").await, "http://h/p?x=1");
        assert_eq!(location_of(app, "/def?x=1").await, "http://h/p?y=2&x=1");
    }

    #[tokio::test]
    async fn unknown_code_falls_back_to_website() {
        let (app, _) = test_app();
        assert_eq!(location_of(app, "/zzz").await, "http://example.com/zzz");
    }

    #[tokio::test]
    async fn store_outage_still_redirects() {
        let (app, store) = test_app();
        store.set_offline(true);
        assert_eq!(location_of(app, "/abc").await, "http://example.com/abc");
    }

    #[tokio::test]
    async fn invalid_header_target_falls_back() {
        let (app, store) = test_app();
        store.put_mapping("bad", "http://h/p\nInjected: 1").await.unwrap();
        assert_eq!(location_of(app, "/bad").await, "http://example.com/bad");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn visits_show_up_in_stats() {
        let (app, store) = test_app();
        store.put_mapping("abc", "http://h/p").await.unwrap();

        for _ in 0..3 {
            location_of(app.clone(), "/abc").await;
        }

        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(20))
            .until_async(|| async {
                let req = Request::get("/stats/abc").body(Body::empty()).unwrap();
                let res = app.clone().oneshot(req).await.unwrap();
                assert_eq!(res.status(), StatusCode::OK);
                body_json(res).await["visit_count"] == 3
            })
            .await;
    }
}
