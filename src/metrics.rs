//! Per-IDP telemetry, gated behind the `metrics`/`prometheus` features.
//!
//! Purely additive observability: the crate emits structured counters for an
//! embedder's own exporter to pick up, independent of the refresh logic
//! itself.

// std
use std::sync::{
	Arc, OnceLock,
	atomic::{AtomicU64, Ordering},
};
// crates.io
use metrics::Label;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use smallvec::SmallVec;
// self
use crate::error::{Error, Result};

type LabelSet = SmallVec<[Label; 2]>;

const METRIC_ATTEMPTS_TOTAL: &str = "jwks_aggregator_fetch_attempts_total";
const METRIC_SUCCESS_TOTAL: &str = "jwks_aggregator_fetch_success_total";
const METRIC_ERROR_TOTAL: &str = "jwks_aggregator_fetch_errors_total";
const METRIC_TRUNCATED_TOTAL: &str = "jwks_aggregator_truncated_keys_total";
const METRIC_KEY_COUNT: &str = "jwks_aggregator_key_count";

/// Shared Prometheus handle installed by [`install_default_exporter`].
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Thread-safe counters for a single IDP's refresh attempts.
#[derive(Debug, Default)]
pub struct IdpMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	errors: AtomicU64,
	keys_truncated: AtomicU64,
}
impl IdpMetrics {
	/// Create a new, zeroed counter set, shared between the Refresher that updates it and
	/// whatever status-reporting code reads it back.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a successful fetch attempt, and how many keys (if any) were dropped by truncation.
	pub fn record_success(&self, dropped: usize) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
		self.successes.fetch_add(1, Ordering::Relaxed);
		self.keys_truncated.fetch_add(dropped as u64, Ordering::Relaxed);
	}

	/// Record a failed fetch attempt.
	pub fn record_error(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
		self.errors.fetch_add(1, Ordering::Relaxed);
	}

	/// Take a point-in-time snapshot.
	pub fn snapshot(&self) -> IdpMetricsSnapshot {
		IdpMetricsSnapshot {
			attempts: self.attempts.load(Ordering::Relaxed),
			successes: self.successes.load(Ordering::Relaxed),
			errors: self.errors.load(Ordering::Relaxed),
			keys_truncated: self.keys_truncated.load(Ordering::Relaxed),
		}
	}
}

/// Read-only snapshot of an [`IdpMetrics`] accumulator.
#[derive(Clone, Debug)]
pub struct IdpMetricsSnapshot {
	/// Total fetch attempts (success + failure).
	pub attempts: u64,
	/// Successful fetch attempts.
	pub successes: u64,
	/// Failed fetch attempts.
	pub errors: u64,
	/// Cumulative count of keys dropped by `max_keys` truncation.
	pub keys_truncated: u64,
}
impl IdpMetricsSnapshot {
	/// Ratio of successful attempts to total attempts.
	pub fn success_rate(&self) -> f64 {
		if self.attempts == 0 { 0.0 } else { self.successes as f64 / self.attempts as f64 }
	}
}

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new().install_recorder().map_err(|err| Error::Config(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record a successful fetch attempt for `idp`, plus the number of keys dropped by truncation
/// and the resulting live key count.
pub fn record_fetch_success(idp: &str, dropped: usize, key_count: usize) {
	let labels = idp_labels(idp);

	metrics::counter!(METRIC_ATTEMPTS_TOTAL, labels.iter()).increment(1);
	metrics::counter!(METRIC_SUCCESS_TOTAL, labels.iter()).increment(1);

	if dropped > 0 {
		metrics::counter!(METRIC_TRUNCATED_TOTAL, labels.iter()).increment(dropped as u64);
	}

	metrics::gauge!(METRIC_KEY_COUNT, labels.iter()).set(key_count as f64);
}

/// Record a failed fetch attempt for `idp`.
pub fn record_fetch_error(idp: &str) {
	let labels = idp_labels(idp);

	metrics::counter!(METRIC_ATTEMPTS_TOTAL, labels.iter()).increment(1);
	metrics::counter!(METRIC_ERROR_TOTAL, labels.iter()).increment(1);
}

fn idp_labels(idp: &str) -> LabelSet {
	let mut labels = LabelSet::with_capacity(1);

	labels.push(Label::new("idp", idp.to_owned()));

	labels
}
