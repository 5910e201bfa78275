//! Upstream JWKS HTTP fetch.

// std
use std::time::{Duration, Instant};
// crates.io
use reqwest::Client;
use serde_json::Value;
// self
use crate::{
	arbiter,
	config::IdpConfig,
	error::{Error, Result},
	jwk::Jwks,
};

/// Outcome of a single successful fetch: the parsed JWKS plus the upstream's
/// suggested cache duration (0 if absent or unparseable).
#[derive(Debug)]
pub struct FetchedJwks {
	/// Parsed key set, in upstream order, untruncated.
	pub jwks: Jwks,
	/// `max-age` parsed from the response's `Cache-Control` header, 0 if absent.
	pub idp_suggested_cache: u64,
}

/// Issue a single GET against the IDP's endpoint.
///
/// Bounded by `timeout`. Never retries; the next attempt comes from the
/// caller's tick loop. Transport failures, non-200 statuses, and malformed
/// bodies all surface as `Err` for the caller to record as `last_error`.
#[tracing::instrument(skip(client, config), fields(idp = %config.name, url = %config.url))]
pub async fn fetch_jwks(client: &Client, config: &IdpConfig, timeout: Duration) -> Result<FetchedJwks> {
	let started = Instant::now();
	let response =
		client.get(config.url.clone()).header("accept", "application/json").timeout(timeout).send().await?;
	let status = response.status();

	if status != reqwest::StatusCode::OK {
		return Err(Error::HttpStatus { status, url: config.url.clone() });
	}

	let idp_suggested_cache = arbiter::parse_max_age(response.headers());
	let bytes = response.bytes().await?;
	let body: Value = serde_json::from_slice(&bytes).map_err(|err| Error::MalformedJwks {
		reason: format!("body is not valid JSON: {err}"),
	})?;
	let Some(object) = body.as_object() else {
		return Err(Error::MalformedJwks { reason: "body is not a JSON object".into() });
	};
	let keys_value = match object.get("keys") {
		Some(value) if !value.is_null() => value,
		_ => return Err(Error::MalformedJwks { reason: "`keys` field is missing or null".into() }),
	};
	let Some(keys_array) = keys_value.as_array() else {
		return Err(Error::MalformedJwks { reason: "`keys` field is not an array".into() });
	};

	let mut jwks = Jwks::empty();

	for raw_key in keys_array {
		let key = serde_json::from_value(raw_key.clone())?;

		jwks.keys.push(key);
	}

	tracing::debug!(
		idp = %config.name,
		status = %status,
		elapsed = ?started.elapsed(),
		key_count = jwks.keys.len(),
		idp_suggested_cache,
		"jwks fetch complete"
	);

	for key in &jwks.keys {
		if !key.is_well_formed() {
			tracing::warn!(idp = %config.name, "received a key without a `kty` field; retaining it passthrough");
		}
	}

	Ok(FetchedJwks { jwks, idp_suggested_cache })
}

/// Build the per-Refresher HTTP client: bounded redirects, a descriptive
/// `User-Agent`, and a short connect timeout.
pub fn build_client() -> Result<Client> {
	Ok(Client::builder()
		.redirect(reqwest::redirect::Policy::limited(10))
		.user_agent(concat!("jwks-aggregator/", env!("CARGO_PKG_VERSION")))
		.connect_timeout(Duration::from_secs(5))
		.build()?)
}
