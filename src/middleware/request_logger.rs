//! Request logging middleware.
//!
//! # Features
//!
//! - Generates a fresh UUIDv4 request ID for every request
//! - Logs request start, completion and failure with structured fields
//! - Adds `X-Request-ID` and `X-Process-Time` to every response
//! - Runs the downstream chain inside an `http_request` tracing span
//!
//! Sits outside the rate limiter, so `X-Process-Time` covers rate limiting, routing and
//! any upstream calls made by the handler.
//!
//! # Failure Path
//!
//! When the inner service returns `Err`, the error is logged together with
//! the elapsed time and returned unchanged. No headers can be attached since
//! there is no response.
//!
//! # Client Usage
//!
//! ```bash
//! curl -i http://localhost:8000/health
//! # x-request-id: 1b4e28ba-2fa1-41d2-883f-0016d3cca427
//! # x-process-time: 0.000215
//! ```

use std::fmt::Display;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use super::ip::extract_client_ip;
use crate::metrics;

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header name for the processing time in seconds.
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

static X_REQUEST_ID: HeaderName = HeaderName::from_static(REQUEST_ID_HEADER);
static X_PROCESS_TIME: HeaderName = HeaderName::from_static(PROCESS_TIME_HEADER);

/// Per-request record created on entry and dropped once the response is out.
///
/// A clone is inserted into the request extensions so handlers can read it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub client_ip: String,
    pub started_at: Instant,
}

impl RequestContext {
    /// Time since the request entered the logger.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Create the context for an incoming request and log its start.
pub fn on_request_start<B>(req: &Request<B>) -> RequestContext {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
        method: req.method().clone(),
        path: req.uri().path().to_string(),
        client_ip: extract_client_ip(req).into_owned(),
        started_at: Instant::now(),
    };

    info!(
        request_id = %ctx.request_id,
        method = %ctx.method,
        path = %ctx.path,
        client_ip = %ctx.client_ip,
        "Request started"
    );

    ctx
}

/// Log the outcome and stamp headers on success; errors pass through untouched.
pub fn on_request_end<E: Display>(
    ctx: &RequestContext,
    result: Result<Response<Body>, E>,
) -> Result<Response<Body>, E> {
    let duration = ctx.elapsed();
    let duration_secs = duration.as_secs_f64();

    match result {
        Ok(mut response) => {
            let status = response.status().as_u16();
            info!(
                request_id = %ctx.request_id,
                method = %ctx.method,
                path = %ctx.path,
                status,
                duration_secs = format_args!("{duration_secs:.3}"),
                "Request completed"
            );
            metrics::record_http_request(ctx.method.as_str(), status, duration_secs);

            let headers = response.headers_mut();
            // UUID strings are always valid header values.
            if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
                headers.insert(X_REQUEST_ID.clone(), value);
            }
            if let Ok(value) = HeaderValue::from_str(&duration_secs.to_string()) {
                headers.insert(X_PROCESS_TIME.clone(), value);
            }

            Ok(response)
        }
        Err(e) => {
            error!(
                request_id = %ctx.request_id,
                method = %ctx.method,
                path = %ctx.path,
                error = %e,
                duration_secs = format_args!("{duration_secs:.3}"),
                "Request failed"
            );
            Err(e)
        }
    }
}

/// Request logging layer for the Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestLoggerLayer;

impl RequestLoggerLayer {
    /// Create a new request logging layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLoggerLayer {
    type Service = RequestLoggerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggerService { inner }
    }
}

/// Request logging service wrapper.
#[derive(Clone)]
pub struct RequestLoggerService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestLoggerService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Display,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let ctx = on_request_start(&req);

        // Any client-supplied ID is replaced so IDs stay unique per request.
        if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
            req.headers_mut().insert(X_REQUEST_ID.clone(), value);
        }
        req.extensions_mut().insert(ctx.clone());

        let span = info_span!("http_request", request_id = %ctx.request_id);
        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let result = inner.call(req).await;
                on_request_end(&ctx, result)
            }
            .instrument(span),
        )
    }
}

/// Extension trait to read the request ID assigned by the logger.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id.as_str())
    }
}
