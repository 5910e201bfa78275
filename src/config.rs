//! IDP configuration entries and validation.
//!
//! The crate owns the typed, validated representation of a configured IDP
//! (`IdpConfig`); reading a specific document format and wiring it into a
//! running process remains a bootstrap collaborator's job.

// std
use std::time::Duration;
// crates.io
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::error::{Error, Result};

/// Default ceiling on retained keys per IDP when `max_keys` is absent or non-positive.
pub const DEFAULT_MAX_KEYS: u32 = 10;
/// Default client-facing cache floor in seconds when `cache_duration` is absent or non-positive.
pub const DEFAULT_CACHE_DURATION_SECS: u64 = 900;

/// Configuration for a single upstream Identity Provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdpConfig {
	/// Registry key and URL path segment; must be unique and URL-safe.
	pub name: String,
	/// Upstream JWKS endpoint.
	pub url: Url,
	/// Seconds between fetches; must be greater than zero.
	pub refresh_interval: Duration,
	/// Ceiling on retained keys.
	#[serde(default = "default_max_keys")]
	pub max_keys: u32,
	/// Operator-chosen client cache floor in seconds.
	#[serde(default = "default_cache_duration")]
	pub cache_duration: u64,
}
impl IdpConfig {
	/// Construct a new configuration entry with default ceilings.
	pub fn new(
		name: impl Into<String>,
		url: impl AsRef<str>,
		refresh_interval: Duration,
	) -> Result<Self> {
		let url = Url::parse(url.as_ref())?;

		Ok(Self {
			name: name.into(),
			url,
			refresh_interval,
			max_keys: DEFAULT_MAX_KEYS,
			cache_duration: DEFAULT_CACHE_DURATION_SECS,
		})
	}

	/// Apply the documented defaulting rule: a non-positive `max_keys` or
	/// `cache_duration` falls back to its default.
	pub fn apply_defaults(&mut self) {
		if self.max_keys == 0 {
			self.max_keys = DEFAULT_MAX_KEYS;
		}
		if self.cache_duration == 0 {
			self.cache_duration = DEFAULT_CACHE_DURATION_SECS;
		}
	}

	/// Validate the entry against the documented constraints.
	pub fn validate(&self) -> Result<()> {
		if self.name.is_empty() {
			return Err(Error::Validation { field: "name", reason: "Must not be empty.".into() });
		}
		if !self.name.as_bytes().iter().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_')) {
			return Err(Error::Validation {
				field: "name",
				reason: "May only contain ASCII letters, numbers, '-', or '_' (must be URL-safe)."
					.into(),
			});
		}
		if self.refresh_interval.is_zero() {
			return Err(Error::Validation {
				field: "refresh_interval",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.max_keys == 0 {
			return Err(Error::Validation {
				field: "max_keys",
				reason: "Must be greater than zero after defaulting.".into(),
			});
		}
		if self.cache_duration == 0 {
			return Err(Error::Validation {
				field: "cache_duration",
				reason: "Must be greater than zero after defaulting.".into(),
			});
		}
		if self.url.host_str().is_none() {
			return Err(Error::Validation { field: "url", reason: "Must include a host.".into() });
		}

		Ok(())
	}
}

/// Validate a full set of IDP entries: individual validity plus uniqueness and
/// non-emptiness. An empty list or a duplicate name is fatal — the process
/// should not start.
///
/// Applies the documented defaulting rule (`max_keys`/`cache_duration` ≤ 0 ⇒
/// default) to each entry before validating it, so an explicit `0` is
/// defaulted rather than rejected as fatal.
pub fn validate_idp_configs(configs: &mut [IdpConfig]) -> Result<()> {
	if configs.is_empty() {
		return Err(Error::Config("At least one IDP must be configured.".into()));
	}

	let mut seen = std::collections::HashSet::with_capacity(configs.len());

	for config in configs.iter_mut() {
		config.apply_defaults();
		config.validate()?;

		if !seen.insert(config.name.clone()) {
			return Err(Error::Config(format!("Duplicate IDP name '{}'.", config.name)));
		}
	}

	Ok(())
}

fn default_max_keys() -> u32 {
	DEFAULT_MAX_KEYS
}

fn default_cache_duration() -> u64 {
	DEFAULT_CACHE_DURATION_SECS
}
