//! Per-request telemetry middleware.
//!
//! # Responsibilities
//! - Observe every request exactly once, matched or not
//! - Capture method, URI, client host, status, bytes, duration, request ID
//! - Emit one record after the response body completes
//!
//! # Design Decisions
//! - The record lives in a guard whose `Drop` emits it. The guard travels from
//!   the handler future into the response body, so emission happens on every
//!   exit path: body finished, body failed, client gone, handler panicked.
//! - Byte count is measured on the streamed body, never by buffering
//! - Sinks are pluggable; the default logs via `tracing` and records metrics

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{header, Method, Request, Response, StatusCode},
};
use futures_util::future::BoxFuture;
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use tower::{BoxError, Layer, Service};

use crate::http::forwarder::MatchedSubpath;
use crate::http::request::request_id;
use crate::observability::metrics;

/// How the response ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The response body was sent in full.
    Completed,
    /// The response body failed mid-stream (e.g. upstream reset).
    Interrupted,
    /// The request was dropped before completing (client disconnect, panic).
    Abandoned,
}

/// The structured record emitted once per request.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: Method,
    /// `scheme://host` followed by the original request target.
    pub uri: String,
    /// Client host without the port.
    pub remote_ip: String,
    pub request_id: Option<String>,
    /// Subpath of the forwarder that handled the request, if any.
    pub subpath: Option<String>,
    /// `None` when no response was produced.
    pub status: Option<StatusCode>,
    pub bytes: u64,
    pub duration: Duration,
    pub outcome: Outcome,
}

impl RequestRecord {
    fn from_request<B>(request: &Request<B>) -> Self {
        let uri = request.uri();
        let scheme = uri.scheme_str().unwrap_or("http");
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();
        let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        let remote_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| remote_host(&addr.to_string()).to_owned())
            .unwrap_or_else(|| "-".to_string());

        Self {
            method: request.method().clone(),
            uri: format!("{}://{}{}", scheme, host, target),
            remote_ip,
            request_id: request_id(request),
            subpath: None,
            status: None,
            bytes: 0,
            duration: Duration::ZERO,
            outcome: Outcome::Abandoned,
        }
    }

    /// Status as logged; `0` when no response was produced.
    pub fn status_code(&self) -> u16 {
        self.status.map(|s| s.as_u16()).unwrap_or(0)
    }
}

/// Destination for telemetry records.
pub trait TelemetrySink: Send + Sync + 'static {
    fn emit(&self, record: &RequestRecord);
}

/// Logs records through `tracing` and feeds the request metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn emit(&self, record: &RequestRecord) {
        tracing::debug!(
            status_code = record.status_code(),
            bytes = record.bytes,
            duration = ?record.duration,
            remote_ip = %record.remote_ip,
            method = %record.method,
            request_id = record.request_id.as_deref(),
            subpath = record.subpath.as_deref(),
            outcome = ?record.outcome,
            "{}",
            record.uri
        );

        metrics::record_request(
            record.method.as_str(),
            record.status_code(),
            record.subpath.as_deref().unwrap_or("none"),
            record.duration,
        );
    }
}

/// Emits its record exactly once, when dropped.
struct RecordGuard {
    record: RequestRecord,
    started: Instant,
    sink: Arc<dyn TelemetrySink>,
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        self.record.duration = self.started.elapsed();
        self.sink.emit(&self.record);
    }
}

/// Response body wrapper that counts bytes and carries the record guard.
struct TelemetryBody {
    inner: Body,
    guard: Option<RecordGuard>,
}

impl TelemetryBody {
    fn finish(&mut self, outcome: Outcome) {
        if let Some(mut guard) = self.guard.take() {
            guard.record.outcome = outcome;
        }
    }
}

impl HttpBody for TelemetryBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let (Some(data), Some(guard)) = (frame.data_ref(), this.guard.as_mut()) {
                    guard.record.bytes += data.len() as u64;
                }
                if this.inner.is_end_stream() {
                    this.finish(Outcome::Completed);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finish(Outcome::Interrupted);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finish(Outcome::Completed);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for TelemetryBody {
    fn drop(&mut self) {
        // Bodies known to be empty may be dropped without ever being polled.
        if self.inner.is_end_stream() {
            self.finish(Outcome::Completed);
        }
    }
}

/// Layer that wraps a service with [`Telemetry`].
#[derive(Clone)]
pub struct TelemetryLayer {
    sink: Arc<dyn TelemetrySink>,
}

impl TelemetryLayer {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink }
    }
}

impl Default for TelemetryLayer {
    fn default() -> Self {
        Self::new(Arc::new(LogSink))
    }
}

impl<S> Layer<S> for TelemetryLayer {
    type Service = Telemetry<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Telemetry {
            inner,
            sink: self.sink.clone(),
        }
    }
}

/// Middleware emitting one [`RequestRecord`] per request.
#[derive(Clone)]
pub struct Telemetry<S> {
    inner: S,
    sink: Arc<dyn TelemetrySink>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Telemetry<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let mut guard = RecordGuard {
            record: RequestRecord::from_request(&request),
            started: Instant::now(),
            sink: self.sink.clone(),
        };

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(request).await?;

            guard.record.status = Some(response.status());
            if let Some(MatchedSubpath(subpath)) = response.extensions().get::<MatchedSubpath>() {
                guard.record.subpath = Some(subpath.to_string());
            }

            let (parts, body) = response.into_parts();
            let body = TelemetryBody {
                inner: Body::new(body),
                guard: Some(guard),
            };
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}

/// Strip the port from a `host:port` address; verbatim if it cannot be split.
pub fn remote_host(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.split_once("]:") {
            Some((host, _)) => host,
            None => addr,
        };
    }

    match addr.rsplit_once(':') {
        Some((host, _)) if !host.contains(':') => host,
        _ => addr,
    }
}
