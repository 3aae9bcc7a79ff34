//! Verbatim single-host relay to the configured downstream.
//!
//! # Responsibilities
//! - Rewrite only the scheme/authority of the verified request
//! - Preserve method, headers, and body unmodified
//! - Return the downstream response unmodified

use axum::body::{Body, Bytes};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{request::Parts, Request, Uri};
use axum::response::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwardError {
    /// The configured downstream URL has no usable scheme/authority.
    #[error("invalid forward target {0:?}")]
    InvalidTarget(String),

    /// The relay request could not be assembled.
    #[error("failed to build relay request: {0}")]
    Request(#[from] axum::http::Error),

    /// The downstream could not be reached or answered with a broken
    /// connection.
    #[error("upstream relay failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Relays verified webhook requests to one fixed downstream host.
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
}

impl Forwarder {
    /// Build a forwarder for the given target URL.
    pub fn new(target: &str) -> Result<Self, ForwardError> {
        let uri: Uri = target
            .parse()
            .map_err(|_| ForwardError::InvalidTarget(target.to_string()))?;
        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| ForwardError::InvalidTarget(target.to_string()))?;
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| ForwardError::InvalidTarget(target.to_string()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            scheme,
            authority,
        })
    }

    /// Relay a request (already split and buffered by the handler) to the
    /// downstream, returning its response verbatim.
    pub async fn forward(&self, parts: Parts, body: Bytes) -> Result<Response, ForwardError> {
        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(self.scheme.clone());
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        let uri = Uri::from_parts(uri_parts)
            .map_err(|_| ForwardError::InvalidTarget(self.authority.to_string()))?;

        let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            // The builder map starts empty, so append reproduces repeated
            // header values exactly as received.
            for (name, value) in parts.headers.iter() {
                headers.append(name.clone(), value.clone());
            }
        }
        let request = builder.body(Body::from(body))?;

        let response = self.client.request(request).await?;
        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
