//! Upstream forwarding for a single mounted subpath.
//!
//! # Responsibilities
//! - Rewrite the request target onto the fixed upstream origin
//! - Strip hop-by-hop headers, append provenance headers
//! - Stream request and response bodies without buffering
//! - Turn upstream failures into 502 responses
//!
//! # Design Decisions
//! - One forwarder (and one pooled client) per subpath, fixed for the process lifetime
//! - No retries and no timeouts; the transport defaults apply
//! - Dropping the forward future cancels the upstream request

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, uri::{Parts, PathAndQuery}, Request, Response, StatusCode, Uri, Version},
    response::IntoResponse,
};
use http_body_util::BodyExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::headers;
use crate::routing::{ProxyMapping, UpstreamUri};

/// Request-time forwarding failures.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The configured upstream has no scheme or host to connect to.
    #[error("upstream {0} has no scheme or host")]
    MissingOrigin(UpstreamUri),

    /// The rewritten target could not be assembled.
    #[error("failed to build upstream request: {0}")]
    InvalidTarget(#[from] axum::http::Error),

    /// The upstream refused, reset or otherwise failed before responding.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[from] hyper_util::client::legacy::Error),
}

/// Subpath that handled a request, attached to the response extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedSubpath(pub Arc<str>);

/// Reverse-proxy handler bound to one upstream.
#[derive(Clone)]
pub struct Forwarder {
    subpath: Arc<str>,
    upstream: UpstreamUri,
    /// Request-target form of `upstream`; `None` when it has no origin.
    origin: Option<Uri>,
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    /// Create a forwarder with its own connection pool.
    pub fn new(mapping: &ProxyMapping) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            subpath: Arc::from(mapping.subpath.as_str()),
            upstream: mapping.upstream.clone(),
            origin: mapping.upstream.origin_uri(),
            client,
        }
    }

    pub fn subpath(&self) -> &str {
        &self.subpath
    }

    pub fn upstream(&self) -> &UpstreamUri {
        &self.upstream
    }

    /// Forward `request` to the upstream.
    ///
    /// `remainder` is the request path with the subpath already stripped;
    /// `peer` is the client address used for `X-Forwarded-For`.
    pub async fn forward(
        &self,
        request: Request<Body>,
        remainder: &str,
        peer: Option<IpAddr>,
    ) -> Response<Body> {
        let mut response = match self.try_forward(request, remainder, peer).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    subpath = %self.subpath,
                    upstream = %self.upstream,
                    error = %e,
                    "Upstream request failed"
                );
                (StatusCode::BAD_GATEWAY, "502 bad gateway").into_response()
            }
        };

        response
            .extensions_mut()
            .insert(MatchedSubpath(self.subpath.clone()));
        response
    }

    async fn try_forward(
        &self,
        request: Request<Body>,
        remainder: &str,
        peer: Option<IpAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        let target = self.target_uri(remainder, parts.uri.query())?;
        let original_host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()));
        let inbound_scheme = parts.uri.scheme_str().unwrap_or("http").to_owned();

        headers::remove_hop_by_hop(&mut parts.headers);
        if let Some(ip) = peer {
            headers::append_forwarded_for(&mut parts.headers, ip);
        }
        headers::append_via(&mut parts.headers, parts.version);
        headers::set_forwarded_origin(
            &mut parts.headers,
            original_host.as_deref(),
            &inbound_scheme,
        );
        // The client sets Host from the target authority.
        parts.headers.remove(header::HOST);

        let mut upstream_req = Request::builder()
            .method(parts.method)
            .uri(target)
            .version(Version::HTTP_11)
            .body(body)?;
        *upstream_req.headers_mut() = parts.headers;

        tracing::trace!(
            subpath = %self.subpath,
            target = %upstream_req.uri(),
            "Forwarding request"
        );

        let response = self.client.request(upstream_req).await?;

        let (mut parts, body) = response.into_parts();
        headers::remove_hop_by_hop(&mut parts.headers);

        let subpath = self.subpath.clone();
        let body = body.map_err(move |e| {
            tracing::warn!(subpath = %subpath, error = %e, "Upstream stream interrupted");
            e
        });

        Ok(Response::from_parts(parts, Body::new(body)))
    }

    /// Build the upstream URI for a stripped request path and query.
    pub fn target_uri(&self, remainder: &str, query: Option<&str>) -> Result<Uri, ForwardError> {
        let origin = self
            .origin
            .as_ref()
            .ok_or_else(|| ForwardError::MissingOrigin(self.upstream.clone()))?;
        let (scheme, authority) = match (origin.scheme(), origin.authority()) {
            (Some(scheme), Some(authority)) => (scheme.clone(), authority.clone()),
            _ => return Err(ForwardError::MissingOrigin(self.upstream.clone())),
        };

        let path = join_paths(origin.path(), remainder);
        let query = [origin.query(), query]
            .into_iter()
            .flatten()
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>()
            .join("&");
        let path_and_query = if query.is_empty() {
            path
        } else {
            format!("{}?{}", path, query)
        };

        let mut uri_parts = Parts::default();
        uri_parts.scheme = Some(scheme);
        uri_parts.authority = Some(authority);
        uri_parts.path_and_query = Some(
            path_and_query
                .parse::<PathAndQuery>()
                .map_err(axum::http::Error::from)?,
        );

        Uri::from_parts(uri_parts).map_err(|e| axum::http::Error::from(e).into())
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("subpath", &self.subpath)
            .field("upstream", &self.upstream)
            .finish()
    }
}

/// Join the upstream base path and the stripped request path with one slash.
fn join_paths(base: &str, rest: &str) -> String {
    if rest.is_empty() {
        return if base.is_empty() { "/".to_string() } else { base.to_string() };
    }

    match (base.ends_with('/'), rest.starts_with('/')) {
        (true, true) => format!("{}{}", base, &rest[1..]),
        (false, false) => format!("{}/{}", base, rest),
        _ => format!("{}{}", base, rest),
    }
}
