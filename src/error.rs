//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the JWKS aggregation crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] http::Error),
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	/// A fetch attempt failed in a way that must be recorded as the IDP's
	/// `last_error` rather than propagated. Never escapes a Refresher's run loop.
	#[error("Upstream HTTP status {status} from {url}")]
	HttpStatus { status: http::StatusCode, url: url::Url },
	#[error("Upstream response was not a JSON object with a `keys` array: {reason}")]
	MalformedJwks { reason: String },

	/// Bootstrap-only, fatal configuration errors.
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },

	/// Query View failure kinds.
	#[error("IDP '{0}' is not configured")]
	NotFound(String),
	#[error("IDP '{0}' is configured but has never completed a successful fetch")]
	NotReady(String),
}
#[cfg(feature = "metrics")]
impl<T> From<metrics::SetRecorderError<T>> for Error
where
	T: std::fmt::Display,
{
	fn from(value: metrics::SetRecorderError<T>) -> Self {
		Self::Config(format!("Failed to install metrics recorder: {value}"))
	}
}
