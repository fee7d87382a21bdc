//! Error types shared by the source builders, the capabilities parser and the fetcher.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using SourceError.
pub type SourceResult<T> = Result<T, SourceError>;

/// Stable machine codes for configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigErrorCode {
    MissingField,
    StylesLayersMismatch,
    InvalidZoomRange,
    InvalidZoom,
    InvalidOpacity,
    UnsafeUrl,
    UnresolvedCapabilities,
    LayerNotFound,
    NoMatrixSet,
    NoFormat,
}

impl ConfigErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorCode::MissingField => "MISSING_FIELD",
            ConfigErrorCode::StylesLayersMismatch => "STYLES_LAYERS_MISMATCH",
            ConfigErrorCode::InvalidZoomRange => "INVALID_ZOOM_RANGE",
            ConfigErrorCode::InvalidZoom => "INVALID_ZOOM",
            ConfigErrorCode::InvalidOpacity => "INVALID_OPACITY",
            ConfigErrorCode::UnsafeUrl => "UNSAFE_URL",
            ConfigErrorCode::UnresolvedCapabilities => "UNRESOLVED_CAPABILITIES",
            ConfigErrorCode::LayerNotFound => "LAYER_NOT_FOUND",
            ConfigErrorCode::NoMatrixSet => "NO_MATRIX_SET",
            ConfigErrorCode::NoFormat => "NO_FORMAT",
        }
    }
}

impl fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contradictory or missing field in a caller-supplied configuration.
///
/// Always fatal and raised synchronously when a source is built.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {message} ({code})")]
pub struct ConfigError {
    /// Dotted path of the offending field, e.g. `wms.styles`
    pub field: String,
    pub message: String,
    pub code: ConfigErrorCode,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ConfigErrorCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("'{}' is required", field);
        Self::new(field, message, ConfigErrorCode::MissingField)
    }
}

/// Failures of the capabilities fetch. Propagated as-is; nothing here retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Request aborted")]
    Aborted,

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl NetworkError {
    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            NetworkError::Timeout(_) => "TIMEOUT",
            NetworkError::Aborted => "ABORTED",
            NetworkError::Http { .. } => "HTTP_ERROR",
            NetworkError::Network(_) => "NETWORK_ERROR",
        }
    }
}

/// Failures while turning a capabilities document into a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed XML at position {position}: {message}")]
    MalformedXml { position: usize, message: String },

    #[error("Service exception {code}: {message}")]
    ServiceException { code: String, message: String },

    #[error("Unsupported capabilities document root <{0}>")]
    UnsupportedDocument(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::MalformedXml { .. } => "MALFORMED_XML",
            ParseError::ServiceException { .. } => "SERVICE_EXCEPTION",
            ParseError::UnsupportedDocument(_) => "UNSUPPORTED_DOCUMENT",
            ParseError::MissingElement(_) => "MISSING_ELEMENT",
        }
    }
}

/// Umbrella error for operations that span configuration, network and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl SourceError {
    /// Stable machine code of the underlying error.
    pub fn code(&self) -> &'static str {
        match self {
            SourceError::Configuration(e) => e.code.as_str(),
            SourceError::Network(e) => e.code(),
            SourceError::Parse(e) => e.code(),
        }
    }
}
