//! Capabilities fetch: the only asynchronous step.
//!
//! One request per call, bounded by a timeout and an optional cancellation
//! token. Failures are returned as-is; nothing here retries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tile_common::{NetworkError, SourceError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::capabilities::{parse_capabilities, Capabilities};
use crate::config::{
    CapabilitiesWmts, LayerCommon, ServiceEndpointConfig, WmtsLayerConfig, WmtsSource,
};
use crate::source::{BuildOptions, SourceHandoff};
use crate::wmts::{create_wmts_source, resolve_explicit, resolve_wmts};

/// Timeout applied when the caller does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The outgoing capabilities request, before it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitiesRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Rewrites the capabilities request once before it is sent (auth, signing).
///
/// Unlike the per-tile transform this may await, e.g. to refresh a token.
#[async_trait]
pub trait RequestTransform: Send + Sync {
    async fn transform(&self, request: CapabilitiesRequest)
        -> Result<CapabilitiesRequest, NetworkError>;
}

#[derive(Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub cancel: Option<CancellationToken>,
    pub headers: Vec<(String, String)>,
    pub request_transform: Option<Arc<dyn RequestTransform>>,
    /// Reuse a client across calls; a fresh default client otherwise
    pub client: Option<reqwest::Client>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cancel: None,
            headers: Vec::new(),
            request_transform: None,
            client: None,
        }
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("timeout", &self.timeout)
            .field("cancel", &self.cancel.is_some())
            .field("headers", &self.headers.len())
            .field("request_transform", &self.request_transform.is_some())
            .finish()
    }
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_transform(mut self, transform: Arc<dyn RequestTransform>) -> Self {
        self.request_transform = Some(transform);
        self
    }
}

/// Fetch a capabilities document as text.
///
/// The timeout covers the request transform, the request and reading the
/// body. Whichever of timeout and cancellation fires first drops the
/// in-flight request.
#[instrument(skip(options), fields(timeout_ms = options.timeout.as_millis() as u64))]
pub async fn fetch_capabilities(url: &str, options: &FetchOptions) -> Result<String, NetworkError> {
    let cancel = options.cancel.clone().unwrap_or_default();
    if cancel.is_cancelled() {
        return Err(NetworkError::Aborted);
    }

    let result = tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(NetworkError::Aborted),
        _ = tokio::time::sleep(options.timeout) => {
            Err(NetworkError::Timeout(options.timeout.as_millis() as u64))
        }
        result = send(url, options) => result,
    };

    match &result {
        Ok(body) => debug!(bytes = body.len(), "Fetched capabilities"),
        Err(e) => warn!(error = %e, code = e.code(), "Capabilities fetch failed"),
    }
    result
}

async fn send(url: &str, options: &FetchOptions) -> Result<String, NetworkError> {
    let mut request = CapabilitiesRequest {
        url: url.to_string(),
        headers: options.headers.clone(),
    };
    if let Some(transform) = &options.request_transform {
        request = transform.transform(request).await?;
    }

    let client = options.client.clone().unwrap_or_default();
    let mut builder = client.get(&request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let response = builder
        .send()
        .await
        .map_err(|e| NetworkError::Network(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::Http {
            status: status.as_u16(),
            url: request.url,
        });
    }
    response
        .text()
        .await
        .map_err(|e| NetworkError::Network(e.to_string()))
}

/// Fetch and parse a capabilities document.
pub async fn load_capabilities(
    url: &str,
    options: &FetchOptions,
) -> Result<Capabilities, SourceError> {
    let body = fetch_capabilities(url, options).await?;
    Ok(parse_capabilities(&body)?)
}

/// Fetch, parse and resolve a capabilities-driven WMTS layer into an explicit one.
pub async fn discover_wmts(
    common: &LayerCommon,
    cfg: &CapabilitiesWmts,
    options: &FetchOptions,
) -> Result<WmtsLayerConfig, SourceError> {
    let capabilities = load_capabilities(&cfg.capabilities_url, options).await?;
    Ok(resolve_wmts(&capabilities, common, cfg)?)
}

/// [`discover_wmts`] followed by building the source.
pub async fn discover_wmts_source(
    common: &LayerCommon,
    cfg: &CapabilitiesWmts,
    fetch: &FetchOptions,
    build: &BuildOptions,
) -> Result<(WmtsLayerConfig, SourceHandoff), SourceError> {
    let capabilities = load_capabilities(&cfg.capabilities_url, fetch).await?;
    let explicit = resolve_explicit(&capabilities, cfg)?;
    let handoff = create_wmts_source(common, &explicit, build)?;
    let resolved = WmtsLayerConfig {
        common: common.clone(),
        source: WmtsSource::Explicit(explicit),
    };
    Ok((resolved, handoff))
}

/// Resolve any configuration that still needs a capabilities document; others pass through.
pub async fn resolve_endpoint(
    config: &ServiceEndpointConfig,
    options: &FetchOptions,
) -> Result<ServiceEndpointConfig, SourceError> {
    config.validate()?;
    match config {
        ServiceEndpointConfig::Wmts(WmtsLayerConfig {
            common,
            source: WmtsSource::Capabilities(caps),
        }) => Ok(ServiceEndpointConfig::Wmts(
            discover_wmts(common, caps, options).await?,
        )),
        other => Ok(other.clone()),
    }
}
