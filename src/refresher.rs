//! Per-IDP background refresh loop.
//!
//! Each configured IDP gets one independent Refresher task. A Refresher never
//! waits for a caller: it fetches once on startup, then on every
//! `refresh_interval` tick, and always publishes — success or failure —
//! before sleeping again. There is no retry within an attempt and no
//! conditional/ETag request; the next tick *is* the retry.

// std
use std::time::Duration;
// crates.io
use chrono::Utc;
use reqwest::Client;
use tokio::sync::broadcast;
// self
use crate::{
	arbiter, config::IdpConfig, http_fetch, registry::{IDPState, Registry, StateBuilder},
};

/// Run one IDP's fetch-publish-sleep loop until `shutdown` fires.
///
/// Spawned once per configured IDP by [`crate::spawn_refreshers`]; never
/// returns an `Err` — every failure is captured in the published
/// [`IDPState::last_error`] and the loop continues.
#[tracing::instrument(skip(client, registry, shutdown, metrics), fields(idp = %config.name))]
pub async fn run(
	config: IdpConfig,
	client: Client,
	registry: Registry,
	mut shutdown: broadcast::Receiver<()>,
	metrics: crate::IdpMetricsHandle,
) {
	let mut ticker = tokio::time::interval(config.refresh_interval);

	// The first tick of an `interval` fires immediately, covering the
	// fetch-on-startup step.
	loop {
		tokio::select! {
			_ = ticker.tick() => {
				attempt(&config, &client, &registry, &metrics).await;
			},
			_ = shutdown.recv() => {
				tracing::debug!(idp = %config.name, "refresher shutting down");
				return;
			},
		}
	}
}

/// One fetch attempt: run the fetch, build the next [`IDPState`], publish it.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
async fn attempt(config: &IdpConfig, client: &Client, registry: &Registry, metrics: &crate::IdpMetricsHandle) {
	let previous = registry.get(&config.name).await;
	let timeout = Duration::from_secs(10);

	match http_fetch::fetch_jwks(client, config, timeout).await {
		Ok(fetched) => {
			let mut jwks = fetched.jwks;
			let dropped = jwks.truncate(config.max_keys as usize);

			if dropped > 0 {
				tracing::warn!(
					idp = %config.name,
					dropped,
					max_keys = config.max_keys,
					"truncated jwks to configured max_keys"
				);
			}

			let cache_duration = arbiter::choose_cache_duration(fetched.idp_suggested_cache, config.cache_duration);
			let previous_update_count = previous.as_ref().map_or(0, |state| state.update_count);
			let key_count = jwks.keys.len();
			let next = StateBuilder::success(
				&config.name,
				jwks,
				Utc::now(),
				previous_update_count,
				config.max_keys,
				cache_duration,
				fetched.idp_suggested_cache,
				config.refresh_interval.as_secs(),
			);

			registry.publish(&config.name, next).await;

			#[cfg(feature = "metrics")]
			{
				crate::metrics::record_fetch_success(&config.name, dropped, key_count);
				metrics.record_success(dropped);
			}
		},
		Err(error) => {
			tracing::warn!(idp = %config.name, %error, "jwks fetch attempt failed");

			let next = match &previous {
				Some(state) => StateBuilder::failure(
					state,
					error.to_string(),
					config.max_keys,
					config.refresh_interval.as_secs(),
				),
				None => StateBuilder::first_failure(
					&config.name,
					error.to_string(),
					config.max_keys,
					config.refresh_interval.as_secs(),
				),
			};

			registry.publish(&config.name, next).await;

			#[cfg(feature = "metrics")]
			{
				crate::metrics::record_fetch_error(&config.name);
				metrics.record_error();
			}
		},
	}
}
