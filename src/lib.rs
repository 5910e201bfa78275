//! Federated JWKS aggregation core — per-IDP refresh loops, a concurrent
//! registry, and a merged-view query surface for modern Rust identity
//! systems.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

// std
use std::collections::HashMap;
// crates.io
use tokio::{sync::broadcast, task::JoinHandle};

pub mod arbiter;
pub mod config;
pub mod http_fetch;
pub mod jwk;
#[cfg(feature = "metrics")] pub mod metrics;
pub mod query;
pub mod refresher;
pub mod registry;

mod error;
mod _prelude {
	pub use std::sync::Arc;

	pub use crate::{Error, Result};
}
#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	arbiter::choose_cache_duration,
	config::IdpConfig,
	error::{Error, Result},
	jwk::{Jwk, Jwks},
	query::{IdpView, MergedView},
	registry::{IDPState, Registry},
};

/// Per-Refresher telemetry handle threaded from [`spawn_refreshers`] into
/// [`refresher::run`]. A real accumulator under the `metrics` feature, a
/// zero-sized no-op otherwise, so the refresh loop doesn't need two code
/// paths.
#[cfg(feature = "metrics")]
type IdpMetricsHandle = std::sync::Arc<metrics::IdpMetrics>;
#[cfg(not(feature = "metrics"))]
type IdpMetricsHandle = ();

#[cfg(feature = "metrics")]
fn new_idp_metrics_handle() -> IdpMetricsHandle {
	metrics::IdpMetrics::new()
}
#[cfg(not(feature = "metrics"))]
fn new_idp_metrics_handle() -> IdpMetricsHandle {}

/// Handle to a running set of per-IDP Refresher tasks.
///
/// Dropping this handle does not stop the Refreshers; call [`Self::shutdown`]
/// to signal every task via the shared broadcast channel and await their
/// exit.
#[derive(Debug)]
pub struct Refreshers {
	tasks: Vec<JoinHandle<()>>,
	shutdown_tx: broadcast::Sender<()>,
	idp_metrics: HashMap<String, IdpMetricsHandle>,
}
impl Refreshers {
	/// Signal every Refresher to stop and wait for them all to exit.
	///
	/// Errors from individual tasks (e.g. a panic) are logged and otherwise
	/// ignored — shutdown always completes.
	pub async fn shutdown(self) {
		let _ = self.shutdown_tx.send(());

		for task in self.tasks {
			if let Err(error) = task.await {
				tracing::warn!(%error, "refresher task did not exit cleanly");
			}
		}
	}
}
#[cfg(feature = "metrics")]
impl Refreshers {
	/// Point-in-time telemetry snapshot for one IDP's Refresher, if `name` was configured.
	pub fn metrics(&self, name: &str) -> Option<metrics::IdpMetricsSnapshot> {
		self.idp_metrics.get(name).map(|handle| handle.snapshot())
	}
}

/// Validate `configs`, build one shared HTTP client, and spawn one
/// independent Refresher task per IDP against `registry`.
///
/// Returns the bootstrap-fatal [`Error::Config`]/[`Error::Validation`]
/// immediately if validation fails, before any task is spawned — a process
/// embedding this crate is expected to treat that as a reason not to start.
pub fn spawn_refreshers(mut configs: Vec<IdpConfig>, registry: Registry) -> Result<Refreshers> {
	config::validate_idp_configs(&mut configs)?;

	let client = http_fetch::build_client()?;
	let (shutdown_tx, _) = broadcast::channel(1);
	let mut idp_metrics = HashMap::with_capacity(configs.len());
	let tasks = configs
		.into_iter()
		.map(|config| {
			let metrics_handle = new_idp_metrics_handle();

			idp_metrics.insert(config.name.clone(), metrics_handle.clone());

			tokio::spawn(refresher::run(
				config,
				client.clone(),
				registry.clone(),
				shutdown_tx.subscribe(),
				metrics_handle,
			))
		})
		.collect();

	Ok(Refreshers { tasks, shutdown_tx, idp_metrics })
}
