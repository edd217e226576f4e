//! Error taxonomy for waypoint handling, provider calls and transit suggestions.

use thiserror::Error;

use crate::waypoints::Slot;

/// Bodies longer than this are cut before they are stored or logged.
const MAX_BODY_CHARS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaypointError {
    /// The slot already holds a waypoint; `clear` must run first.
    #[error("{0} location is already set, clear it before choosing a new one")]
    AlreadySet(Slot),

    /// Pin-based assignment was attempted with no pin on the map.
    #[error("no pin has been dropped yet")]
    NoPin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    #[error("polyline ends mid-value at byte {offset}")]
    Truncated { offset: usize },

    #[error("byte {byte:#04x} at offset {offset} is outside the polyline alphabet")]
    InvalidByte { offset: usize, byte: u8 },

    #[error("value starting before byte {offset} does not fit in 64 bits")]
    Overflow { offset: usize },
}

/// Failure of a single external provider call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("{provider}: request timed out")]
    Timeout { provider: String },

    #[error("{provider}: connection failed: {message}")]
    Connection { provider: String, message: String },

    #[error("{provider}: HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: malformed response: {message}")]
    Malformed { provider: String, message: String },

    #[error("{provider}: response contained no route")]
    EmptyRoute { provider: String },

    #[error("{provider}: {source}")]
    Decode {
        provider: String,
        #[source]
        source: PolylineError,
    },

    #[error("{provider}: implausible route: {message}")]
    Implausible { provider: String, message: String },

    #[error("{provider}: nothing found for {query}")]
    NotFound { provider: String, query: String },

    #[error("{provider}: not configured: {message}")]
    Configuration { provider: String, message: String },
}

impl ProviderError {
    /// Maps a transport error from reqwest, keeping timeouts distinct.
    ///
    /// The URL is stripped from the message because some providers carry
    /// their API key in the query string.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else if err.is_decode() {
            Self::Malformed {
                provider: provider.to_string(),
                message: err.without_url().to_string(),
            }
        } else {
            Self::Connection {
                provider: provider.to_string(),
                message: err.without_url().to_string(),
            }
        }
    }

    pub fn status(provider: &str, status: u16, body: &str) -> Self {
        Self::Status {
            provider: provider.to_string(),
            status,
            body: truncate_body(body),
        }
    }

    pub fn malformed(provider: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Timeout { provider }
            | Self::Connection { provider, .. }
            | Self::Status { provider, .. }
            | Self::Malformed { provider, .. }
            | Self::EmptyRoute { provider }
            | Self::Decode { provider, .. }
            | Self::Implausible { provider, .. }
            | Self::NotFound { provider, .. }
            | Self::Configuration { provider, .. } => provider,
        }
    }

    /// Upstream HTTP status, when the provider answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SuggestionError {
    /// `from` or `to` is absent, or lacks a coordinate.
    #[error("missing waypoint: {0}")]
    MissingWaypoint(&'static str),

    #[error("invalid waypoint coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("transit provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("malformed transit suggestion: {0}")]
    MalformedResponse(String),
}

impl SuggestionError {
    /// Returns true if asking again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::MalformedResponse(_))
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Waypoint(#[from] WaypointError),

    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    #[error(transparent)]
    Lookup(#[from] ProviderError),

    #[error("both From and To must be set before routing")]
    MissingWaypoint,

    #[error("transit suggestions are not configured")]
    TransitUnavailable,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read transit catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transit catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure while wiring providers together from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to start label worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Cuts `body` to a loggable length on a char boundary.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
