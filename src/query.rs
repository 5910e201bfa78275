//! Query View: stateless read-only derivations over [`Registry`] snapshots.
//!
//! This module has no HTTP framework dependency by design: it returns plain
//! structs and a typed [`Error`], leaving status-code translation and
//! routing to whatever external layer embeds this crate.

// std
use std::collections::HashMap;
// crates.io
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// self
use crate::{
	config::IdpConfig,
	error::{Error, Result},
	jwk::Jwks,
	registry::{IDPState, Registry},
};

/// Fallback merged cache duration when no configured IDP has ever loaded.
pub const MERGED_FALLBACK_CACHE_DURATION: u64 = 900;

/// Per-IDP read-only view, shaped for a single-IDP endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdpView {
	/// IDP name.
	pub name: String,
	/// Current key set.
	pub jwks: Jwks,
	/// Client-facing cache seconds in effect.
	pub cache_duration: u64,
	/// Last successful publish time.
	pub last_updated: Option<DateTime<Utc>>,
}
impl From<&IDPState> for IdpView {
	fn from(state: &IDPState) -> Self {
		Self {
			name: state.name.clone(),
			jwks: state.jwks.clone(),
			cache_duration: state.cache_duration,
			last_updated: state.last_updated,
		}
	}
}

/// Merged read-only view across every loaded IDP, shaped for the aggregate endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergedView {
	/// Concatenation of every loaded IDP's keys, in IDP-configuration order.
	pub keys: Vec<crate::jwk::Jwk>,
	/// `keys.len()`.
	pub total_keys: usize,
	/// Number of IDPs that have ever loaded successfully.
	pub idp_count: usize,
	/// The minimum `cache_duration` across loaded IDPs, or the fallback if none have loaded.
	pub merged_cache_duration: u64,
}

/// Look up the current view for a single configured IDP.
///
/// Returns [`Error::NotFound`] if `name` is not a configured IDP at all, and
/// [`Error::NotReady`] if it is configured but has never completed a
/// successful fetch.
pub async fn idp_view(registry: &Registry, configs: &[IdpConfig], name: &str) -> Result<IdpView> {
	if !configs.iter().any(|config| config.name == name) {
		return Err(Error::NotFound(name.to_string()));
	}

	let state = registry.get(name).await;

	match state {
		Some(state) if state.is_loaded() => Ok(IdpView::from(state.as_ref())),
		_ => Err(Error::NotReady(name.to_string())),
	}
}

/// Merge every loaded IDP's keys into one view.
///
/// IDPs that have never successfully loaded contribute no keys and no
/// contribution to the minimum, but are still counted in `idp_count` — it
/// reports the full configured IDP count, not just the loaded ones.
pub async fn merged_view(registry: &Registry, configs: &[IdpConfig]) -> MergedView {
	let mut keys = Vec::new();
	let mut min_cache_duration: Option<u64> = None;

	for config in configs {
		let Some(state) = registry.get(&config.name).await else { continue };

		if !state.is_loaded() {
			continue;
		}

		keys.extend(state.jwks.keys.iter().cloned());
		min_cache_duration =
			Some(min_cache_duration.map_or(state.cache_duration, |current| current.min(state.cache_duration)));
	}

	let total_keys = keys.len();

	MergedView {
		keys,
		total_keys,
		idp_count: configs.len(),
		merged_cache_duration: min_cache_duration.unwrap_or(MERGED_FALLBACK_CACHE_DURATION),
	}
}

/// The `/jwks`-shaped projection: loaded IDPs only, keyed by name.
pub async fn jwks_shaped_map(registry: &Registry, configs: &[IdpConfig]) -> HashMap<String, Jwks> {
	let mut map = HashMap::with_capacity(configs.len());

	for config in configs {
		if let Some(state) = registry.get(&config.name).await
			&& state.is_loaded()
		{
			map.insert(config.name.clone(), state.jwks.clone());
		}
	}

	map
}

/// The `/status`-shaped projection: every configured IDP, loaded or not, with full state.
pub async fn status_shaped_map(registry: &Registry, configs: &[IdpConfig]) -> HashMap<String, IDPState> {
	let mut map = HashMap::with_capacity(configs.len());

	for config in configs {
		let state = match registry.get(&config.name).await {
			Some(state) => (*state).clone(),
			None => crate::registry::StateBuilder::first_failure(&config.name, String::new(), config.max_keys, config.refresh_interval.as_secs()),
		};

		map.insert(config.name.clone(), state);
	}

	map
}
