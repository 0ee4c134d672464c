//! Rate limiting middleware backed by the sliding-window limiter.
//!
//! # Keying
//!
//! Each request is keyed by its bearer credential and client address:
//!
//! - `Authorization: Bearer <token>` from `1.2.3.4` → `"<token>:1.2.3.4"`
//! - no credential from `1.2.3.4` → `"1.2.3.4"`
//!
//! so one credential cannot escape the per-address limit by hopping
//! addresses, and one address cannot escape it by rotating credentials.
//!
//! # Response Headers
//!
//! On admission the handler's response (success or error) gets:
//! - `X-RateLimit-Limit`: configured limit
//! - `X-RateLimit-Remaining`: slots left in the window
//! - `X-RateLimit-Reset`: `now + window` as a Unix timestamp
//!
//! On rejection (429) the handler is never called and the response carries:
//! - `Retry-After`: whole seconds until the oldest request leaves the window
//! - `X-RateLimit-Limit`, `X-RateLimit-Remaining: 0`
//! - `X-RateLimit-Reset`: `oldest + window` as a Unix timestamp
//!
//! with the JSON body `{"error": "Rate limit exceeded", "retry_after": "<secs>"}`.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::ip::extract_client_ip;
use crate::limiter::{Admission, Decision, Rejection, SlidingWindowLimiter};
use crate::metrics;

pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

const BEARER_PREFIX: &str = "Bearer ";

/// Body of a 429 response.
#[derive(Debug, Serialize)]
struct RateLimitExceeded {
    error: &'static str,
    retry_after: String,
}

/// Extract the credential from the `Authorization` header.
///
/// A leading `Bearer ` is stripped; any other scheme is used verbatim.
/// Missing, non-UTF-8 or empty values yield `None`.
pub fn extract_credential<B>(req: &Request<B>) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Derive the limiter key for a request.
pub fn rate_limit_key<B>(req: &Request<B>) -> String {
    let client_ip = extract_client_ip(req);
    match extract_credential(req) {
        Some(credential) => format!("{credential}:{client_ip}"),
        None => client_ip.into_owned(),
    }
}

/// Rate limiting layer for the Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(SlidingWindowLimiter::new(100, Duration::from_secs(3600))?);
/// let app = Router::new()
///     .route("/fortune", post(handler))
///     .layer(RateLimitLayer::new(limiter));
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<SlidingWindowLimiter>,
}

impl RateLimitLayer {
    /// Create a layer driving the given limiter instance.
    pub fn new(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<SlidingWindowLimiter>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let key = rate_limit_key(&req);

        // Decided synchronously; the table lock is released before any await.
        let decision = self.limiter.check(&key);

        let mut inner = self.inner.clone();

        Box::pin(async move {
            match decision {
                Decision::Admitted(admission) => {
                    metrics::record_rate_limit_admitted();
                    debug!(
                        key = %key,
                        remaining = admission.remaining,
                        "Request admitted by rate limiter"
                    );

                    let mut response = inner.call(req).await?;
                    apply_admission_headers(response.headers_mut(), &admission);
                    Ok(response)
                }
                Decision::Rejected(rejection) => {
                    metrics::record_rate_limit_rejected();
                    warn!(
                        key = %key,
                        path = %req.uri().path(),
                        retry_after_secs = rejection.retry_after,
                        "Rate limit exceeded"
                    );

                    Ok(rejection_response(&rejection))
                }
            }
        })
    }
}

/// Stamp the admitted-path headers, replacing any set by the handler.
fn apply_admission_headers(headers: &mut HeaderMap, admission: &Admission) {
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(admission.limit));
    headers.insert(
        X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(admission.remaining),
    );
    headers.insert(X_RATELIMIT_RESET.clone(), HeaderValue::from(admission.reset));
}

/// Build the 429 response for a rejected request.
fn rejection_response(rejection: &Rejection) -> Response<Body> {
    let retry_after = rejection.retry_after.to_string();

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitExceeded {
            error: "Rate limit exceeded",
            retry_after,
        }),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(RETRY_AFTER, HeaderValue::from(rejection.retry_after));
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(rejection.limit));
    headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32));
    headers.insert(X_RATELIMIT_RESET.clone(), HeaderValue::from(rejection.reset));

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::extract::ConnectInfo;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    use crate::limiter::ManualClock;

    fn limiter(limit: u32, window_secs: u64) -> (Arc<SlidingWindowLimiter>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0.0));
        let limiter =
            SlidingWindowLimiter::with_clock(limit, Duration::from_secs(window_secs), clock.clone())
                .unwrap();
        (Arc::new(limiter), clock)
    }

    fn request(ip: &str) -> Request<Body> {
        Request::builder()
            .uri("/fortune")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    fn header(response: &Response<Body>, name: &str) -> String {
        response
            .headers()
            .get(name)
            .unwrap_or_else(|| panic!("missing header {name}"))
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_key_without_credential_is_address() {
        let req = request("1.2.3.4");
        assert_eq!(rate_limit_key(&req), "1.2.3.4");
    }

    #[test]
    fn test_key_with_bearer_credential() {
        let req = Request::builder()
            .header("authorization", "Bearer abc123")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();

        assert_eq!(rate_limit_key(&req), "abc123:1.2.3.4");
    }

    #[test]
    fn test_key_with_raw_credential() {
        let req = Request::builder()
            .header("authorization", "sk-raw")
            .body(Body::empty())
            .unwrap();

        assert_eq!(rate_limit_key(&req), "sk-raw:unknown");
    }

    #[test]
    fn test_key_with_peer_address() {
        let mut req = Request::builder()
            .header("authorization", "Bearer tok")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.9:4000".parse::<SocketAddr>().unwrap()));

        assert_eq!(rate_limit_key(&req), "tok:192.0.2.9");
    }

    #[test]
    fn test_empty_bearer_is_no_credential() {
        let req = Request::builder()
            .header("authorization", "Bearer ")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_credential(&req), None);
        assert_eq!(rate_limit_key(&req), "1.2.3.4");
    }

    #[test]
    fn test_whitespace_credential_is_no_credential() {
        let req = Request::builder()
            .header("authorization", "   ")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_credential(&req), None);
        assert_eq!(rate_limit_key(&req), "1.2.3.4");
    }

    #[test]
    fn test_bearer_token_is_trimmed() {
        let req = Request::builder()
            .header("authorization", "Bearer  abc123 ")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();

        assert_eq!(rate_limit_key(&req), "abc123:1.2.3.4");
    }

    #[tokio::test]
    async fn test_admitted_response_carries_headers() {
        let (limiter, _clock) = limiter(3, 60);
        let svc = RateLimitLayer::new(limiter).layer(service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::from("ok")))
        }));

        let response = svc.oneshot(request("1.2.3.4")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-ratelimit-limit"), "3");
        assert_eq!(header(&response, "x-ratelimit-remaining"), "2");
        assert_eq!(header(&response, "x-ratelimit-reset"), "60");
    }

    #[tokio::test]
    async fn test_rejected_request_skips_handler() {
        let (limiter, clock) = limiter(1, 10);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let svc = ServiceBuilder::new()
            .layer(RateLimitLayer::new(limiter))
            .service(service_fn(move |_req: Request<Body>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Infallible>(Response::new(Body::empty())) }
            }));

        svc.clone().oneshot(request("1.2.3.4")).await.unwrap();
        clock.set(3.0);
        let response = svc.oneshot(request("1.2.3.4")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header(&response, "retry-after"), "7");
        assert_eq!(header(&response, "x-ratelimit-remaining"), "0");
        assert_eq!(header(&response, "x-ratelimit-reset"), "10");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Rate limit exceeded");
        assert_eq!(json["retry_after"], "7");
    }

    #[tokio::test]
    async fn test_failed_handler_still_consumes_slot() {
        let (limiter, _clock) = limiter(2, 10);
        let svc = RateLimitLayer::new(limiter.clone()).layer(service_fn(
            |_req: Request<Body>| async { Err::<Response<Body>, _>("boom") },
        ));

        let err = svc.clone().oneshot(request("1.2.3.4")).await.unwrap_err();
        assert_eq!(err, "boom");

        // The failed call kept its slot, so this admission fills the window.
        let decision = limiter.check("1.2.3.4");
        match decision {
            Decision::Admitted(a) => assert_eq!(a.remaining, 0),
            Decision::Rejected(r) => panic!("unexpected rejection {r:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_response_gets_admission_headers() {
        let (limiter, _clock) = limiter(5, 10);
        let svc = RateLimitLayer::new(limiter).layer(service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(StatusCode::BAD_GATEWAY.into_response())
        }));

        let response = svc.oneshot(request("1.2.3.4")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(header(&response, "x-ratelimit-remaining"), "4");
    }

    #[tokio::test]
    async fn test_handler_headers_are_replaced_not_duplicated() {
        let (limiter, clock) = limiter(3, 60);
        let svc = RateLimitLayer::new(limiter).layer(service_fn(|_req: Request<Body>| async {
            let mut response = Response::new(Body::empty());
            let headers = response.headers_mut();
            headers.append("x-ratelimit-limit", HeaderValue::from_static("1000"));
            headers.append("x-ratelimit-remaining", HeaderValue::from_static("999"));
            headers.append("x-ratelimit-remaining", HeaderValue::from_static("998"));
            headers.append("x-ratelimit-reset", HeaderValue::from_static("0"));
            Ok::<_, Infallible>(response)
        }));

        svc.clone().oneshot(request("1.2.3.4")).await.unwrap();
        clock.set(5.0);
        let response = svc.oneshot(request("1.2.3.4")).await.unwrap();

        // Two entries logged, so remaining is 3 - 2.
        for (name, expected) in [
            ("x-ratelimit-limit", "3"),
            ("x-ratelimit-remaining", "1"),
            ("x-ratelimit-reset", "65"),
        ] {
            let values: Vec<&str> = response
                .headers()
                .get_all(name)
                .iter()
                .map(|v| v.to_str().unwrap())
                .collect();
            assert_eq!(values, [expected], "{name}");
        }
    }
}
