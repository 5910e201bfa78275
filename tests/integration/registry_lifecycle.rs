//! Integration coverage for multi-IDP registry bootstrap, the merged view, and the
//! `/status`-shaped projection.

// std
use std::time::Duration;
// crates.io
use jwks_aggregator::{IdpConfig, Registry, query, spawn_refreshers};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

const JWKS_A: &str = r#"{"keys": [{"kty": "RSA", "kid": "idp-a-1"}, {"kty": "RSA", "kid": "idp-a-2"}]}"#;
const JWKS_B: &str = r#"{"keys": [{"kty": "RSA", "kid": "idp-b-1"}]}"#;

async fn wait_until_loaded(registry: &Registry, name: &str) {
	for _ in 0..50 {
		if let Some(state) = registry.get(name).await {
			if state.is_loaded() {
				return;
			}
		}

		tokio::time::sleep(Duration::from_millis(50)).await;
	}

	panic!("idp '{name}' never loaded within the deadline");
}

#[tokio::test]
async fn merged_view_aggregates_keys_and_takes_the_minimum_cache_duration_across_idps() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;
	let path_a = "/idp-a/jwks.json";
	let path_b = "/idp-b/jwks.json";

	Mock::given(method("GET"))
		.and(path(path_a))
		.respond_with(
			ResponseTemplate::new(200).set_body_string(JWKS_A).insert_header("cache-control", "max-age=600"),
		)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(path_b))
		.respond_with(
			ResponseTemplate::new(200).set_body_string(JWKS_B).insert_header("cache-control", "max-age=120"),
		)
		.mount(&server)
		.await;

	let config_a = IdpConfig::new("idp-a", format!("{}{path_a}", server.uri()), Duration::from_secs(300))
		.expect("valid config");
	let config_b = IdpConfig::new("idp-b", format!("{}{path_b}", server.uri()), Duration::from_secs(300))
		.expect("valid config");
	let configs = vec![config_a, config_b];

	let registry = Registry::new();
	let refreshers = spawn_refreshers(configs.clone(), registry.clone()).expect("validated");

	wait_until_loaded(&registry, "idp-a").await;
	wait_until_loaded(&registry, "idp-b").await;

	let merged = query::merged_view(&registry, &configs).await;

	assert_eq!(merged.idp_count, 2);
	assert_eq!(merged.total_keys, 3);
	assert_eq!(merged.merged_cache_duration, 120, "the tighter of the two idps' cache durations should win");

	refreshers.shutdown().await;
}

#[tokio::test]
async fn status_shaped_map_reports_every_configured_idp_including_one_that_never_responds() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;
	let path_a = "/idp-a/jwks.json";

	Mock::given(method("GET"))
		.and(path(path_a))
		.respond_with(ResponseTemplate::new(200).set_body_string(JWKS_A))
		.mount(&server)
		.await;
	// No mock registered for idp-down: every request to it 404s from wiremock itself.

	let config_a = IdpConfig::new("idp-a", format!("{}{path_a}", server.uri()), Duration::from_secs(300))
		.expect("valid config");
	let config_down =
		IdpConfig::new("idp-down", format!("{}/idp-down/jwks.json", server.uri()), Duration::from_millis(150))
			.expect("valid config");
	let configs = vec![config_a, config_down];

	let registry = Registry::new();
	let refreshers = spawn_refreshers(configs.clone(), registry.clone()).expect("validated");

	wait_until_loaded(&registry, "idp-a").await;
	tokio::time::sleep(Duration::from_millis(300)).await;

	let statuses = query::status_shaped_map(&registry, &configs).await;

	assert_eq!(statuses.len(), 2);
	assert!(statuses["idp-a"].is_loaded());
	assert!(!statuses["idp-down"].is_loaded());
	assert!(!statuses["idp-down"].last_error.is_empty());

	let jwks_only = query::jwks_shaped_map(&registry, &configs).await;

	assert_eq!(jwks_only.len(), 1, "the /jwks projection must exclude idps that never loaded");
	assert!(jwks_only.contains_key("idp-a"));

	refreshers.shutdown().await;
}

#[tokio::test]
async fn bootstrap_rejects_duplicate_idp_names_before_spawning_any_refresher() {
	let config =
		IdpConfig::new("dup", "https://dup.example.com/jwks.json", Duration::from_secs(60)).expect("valid config");
	let registry = Registry::new();

	let err = spawn_refreshers(vec![config.clone(), config], registry).unwrap_err();

	assert!(matches!(err, jwks_aggregator::Error::Config(_)));
}
