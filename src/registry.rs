//! Shared IDP state registry.
//!
//! The Registry is pure data: it validates nothing and never fails. Every
//! `publish` installs a brand-new, fully-populated [`IDPState`] for a name,
//! never mutating a previously-published one in place — the swap-only
//! discipline that makes `get`/`get_all` snapshots internally consistent
//! for free via `Arc::clone`.

// std
use std::{collections::HashMap, sync::Arc};
// crates.io
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Snapshot of one IDP's refresh state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IDPState {
	/// IDP name; the Registry key.
	pub name: String,
	/// Last successfully parsed and truncated JWKS, empty until the first success.
	pub jwks: crate::jwk::Jwks,
	/// Wall-clock time of the last successful publish, if any.
	pub last_updated: Option<DateTime<Utc>>,
	/// Textual description of the most recent failure, empty if the last attempt succeeded.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub last_error: String,
	/// Monotonic count of attempts (success + failure).
	pub update_count: u64,
	/// `jwks.keys.len()` after truncation.
	pub key_count: usize,
	/// Ceiling in effect at the last update.
	pub max_keys: u32,
	/// Client-facing cache seconds chosen by the Arbiter at the last attempt.
	pub cache_duration: u64,
	/// `max-age` observed from the upstream response at the last attempt, 0 if absent.
	pub idp_suggested_cache: u64,
	/// Effective fetch period in effect.
	#[serde(rename = "refresh_interval")]
	pub refresh_interval_secs: u64,
	/// `last_updated + cache_duration`, if ever successfully published.
	pub cache_until: Option<DateTime<Utc>>,
}
impl IDPState {
	/// The state immediately after registering an IDP but before any fetch attempt.
	fn uninitialized(name: impl Into<String>, max_keys: u32, refresh_interval_secs: u64) -> Self {
		Self {
			name: name.into(),
			jwks: crate::jwk::Jwks::empty(),
			last_updated: None,
			last_error: String::new(),
			update_count: 0,
			key_count: 0,
			max_keys,
			cache_duration: 0,
			idp_suggested_cache: 0,
			refresh_interval_secs,
			cache_until: None,
		}
	}

	/// Whether at least one successful fetch has ever been published.
	pub fn is_loaded(&self) -> bool {
		!self.jwks.is_empty()
	}
}

/// Thread-safe, in-memory store of the latest [`IDPState`] per configured IDP.
#[derive(Clone, Debug, Default)]
pub struct Registry {
	inner: Arc<RwLock<HashMap<String, Arc<IDPState>>>>,
}
impl Registry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Atomically install a new state snapshot for `name`. Never fails.
	pub async fn publish(&self, name: &str, update: IDPState) {
		let mut state = self.inner.write().await;

		state.insert(name.to_string(), Arc::new(update));
	}

	/// Read the current snapshot for `name`, if any attempt has occurred.
	pub async fn get(&self, name: &str) -> Option<Arc<IDPState>> {
		let state = self.inner.read().await;

		state.get(name).cloned()
	}

	/// Read independent copies of every known IDP's state.
	pub async fn get_all(&self) -> HashMap<String, Arc<IDPState>> {
		let state = self.inner.read().await;

		state.clone()
	}
}

/// Helper for Refreshers composing the next [`IDPState`] to publish.
#[derive(Debug)]
pub struct StateBuilder;
impl StateBuilder {
	/// Build the success-path state.
	#[allow(clippy::too_many_arguments)]
	pub fn success(
		name: &str,
		jwks: crate::jwk::Jwks,
		now: DateTime<Utc>,
		previous_update_count: u64,
		max_keys: u32,
		cache_duration: u64,
		idp_suggested_cache: u64,
		refresh_interval_secs: u64,
	) -> IDPState {
		let key_count = jwks.keys.len();

		IDPState {
			name: name.to_string(),
			jwks,
			last_updated: Some(now),
			last_error: String::new(),
			update_count: previous_update_count + 1,
			key_count,
			max_keys,
			cache_duration,
			idp_suggested_cache,
			refresh_interval_secs,
			cache_until: Some(now + chrono::Duration::seconds(cache_duration as i64)),
		}
	}

	/// Build the failure-path state, leaving `jwks`/`last_updated`/`key_count`/`cache_until`
	/// untouched.
	pub fn failure(previous: &IDPState, error: String, max_keys: u32, refresh_interval_secs: u64) -> IDPState {
		IDPState {
			name: previous.name.clone(),
			jwks: previous.jwks.clone(),
			last_updated: previous.last_updated,
			last_error: error,
			update_count: previous.update_count + 1,
			key_count: previous.key_count,
			max_keys,
			cache_duration: previous.cache_duration,
			idp_suggested_cache: previous.idp_suggested_cache,
			refresh_interval_secs,
			cache_until: previous.cache_until,
		}
	}

	/// Build the state for the very first attempt against a never-seen IDP, when that
	/// first attempt fails.
	pub fn first_failure(name: &str, error: String, max_keys: u32, refresh_interval_secs: u64) -> IDPState {
		let mut state = IDPState::uninitialized(name, max_keys, refresh_interval_secs);

		state.last_error = error;
		state.update_count = 1;

		state
	}
}
