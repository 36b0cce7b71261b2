//! Response caching as an axum layer. Only GET requests participate; the
//! key is the request path plus query string exactly as received (no
//! parameter-order normalization).

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::extract::State;

use super::{CacheEntry, ResponseCache};

static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Store handle plus the TTL for one route family.
#[derive(Clone)]
pub struct CacheContext {
    pub cache: Arc<ResponseCache>,
    pub ttl: Duration,
}

impl CacheContext {
    pub fn new(cache: Arc<ResponseCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }
}

pub async fn cache_response(
    State(ctx): State<CacheContext>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let key = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    if let Some(entry) = ctx.cache.get(&key) {
        tracing::debug!(key = %key, "cache hit");
        return replay(entry);
    }

    tracing::debug!(key = %key, "cache miss");
    let response = next.run(req).await;
    let (mut parts, body) = response.into_parts();
    parts.headers.insert(&X_CACHE, HeaderValue::from_static("MISS"));

    // Buffering has to succeed to serve the response at all; a body error
    // here means the connection is lost anyway.
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!(key = %key, error = %error, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Error responses are never cached.
    if parts.status.as_u16() < 400 {
        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let entry = CacheEntry::new(bytes.clone(), parts.status.as_u16(), headers, ctx.ttl);
        ctx.cache.set(key, entry);
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// Rebuild a response from a stored entry, marking it as a cache hit.
fn replay(entry: CacheEntry) -> Response<Body> {
    let mut builder = Response::builder().status(entry.status);
    for (name, value) in &entry.headers {
        // Stored headers were valid when captured; skip any that are not.
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            builder = builder.header(name, value);
        }
    }
    match builder.body(Body::from(entry.body)) {
        Ok(mut response) => {
            response
                .headers_mut()
                .insert(&X_CACHE, HeaderValue::from_static("HIT"));
            response
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn app(ctx: CacheContext) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new()
            .route(
                "/dados",
                get(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        "corpo"
                    }
                })
                .post(|| async { "gravado" }),
            )
            .route(
                "/erro",
                get(|| async { (StatusCode::BAD_GATEWAY, "falhou") }),
            )
            .layer(from_fn_with_state(ctx, cache_response));
        (router, calls)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn miss_then_hit_with_identical_body() {
        let cache = Arc::new(ResponseCache::new());
        let (app, _) = app(CacheContext::new(cache.clone(), Duration::from_secs(60)));

        let first = app.clone().oneshot(get_request("/dados?uf=RJ")).await.unwrap();
        assert_eq!(first.headers().get("x-cache").unwrap(), "MISS");
        let first_body = body_string(first).await;

        let second = app.oneshot(get_request("/dados?uf=RJ")).await.unwrap();
        assert_eq!(second.headers().get("x-cache").unwrap(), "HIT");
        assert_eq!(body_string(second).await, first_body);
    }

    #[tokio::test]
    async fn hit_does_not_rerun_handler() {
        let cache = Arc::new(ResponseCache::new());
        let (app, calls) = app(CacheContext::new(cache, Duration::from_secs(60)));

        app.clone().oneshot(get_request("/dados")).await.unwrap();
        app.clone().oneshot(get_request("/dados")).await.unwrap();
        app.oneshot(get_request("/dados")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn query_string_is_part_of_the_key() {
        let cache = Arc::new(ResponseCache::new());
        let (app, _) = app(CacheContext::new(cache.clone(), Duration::from_secs(60)));

        app.clone().oneshot(get_request("/dados?uf=RJ")).await.unwrap();
        let other = app.oneshot(get_request("/dados?uf=SP")).await.unwrap();
        assert_eq!(other.headers().get("x-cache").unwrap(), "MISS");
        assert_eq!(cache.stats().total_entries, 2);
    }

    #[tokio::test]
    async fn non_get_methods_bypass_the_cache() {
        let cache = Arc::new(ResponseCache::new());
        let (app, _) = app(CacheContext::new(cache.clone(), Duration::from_secs(60)));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/dados")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().get("x-cache").is_none());
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[tokio::test]
    async fn error_responses_are_not_cached() {
        let cache = Arc::new(ResponseCache::new());
        let (app, _) = app(CacheContext::new(cache.clone(), Duration::from_secs(60)));

        let first = app.clone().oneshot(get_request("/erro")).await.unwrap();
        assert_eq!(first.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(first.headers().get("x-cache").unwrap(), "MISS");

        let second = app.oneshot(get_request("/erro")).await.unwrap();
        assert_eq!(second.headers().get("x-cache").unwrap(), "MISS");
        assert_eq!(cache.stats().total_entries, 0);
    }
}
