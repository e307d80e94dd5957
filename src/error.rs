//! Error types shared by the fetch, parse and location layers.

/// Failures of the cached, retrying HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: String,
    },
    #[error("{url} returned non-retryable status {status}")]
    Status { url: String, status: u16 },
    #[error("could not build request: {0}")]
    Request(String),
}

/// Failures while turning a coordinate into a `ParsedForecast`.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed forecast response: {0}")]
    Malformed(String),
}

impl ForecastError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Location acquisition errors. None of these are fatal to the dashboard.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("location request timed out")]
    Timeout,
    #[error("geolocation is not supported by this client")]
    Unsupported,
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}
