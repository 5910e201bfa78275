//! Integration tests for the per-IDP Refresher loop against a mock upstream.

// std
use std::time::Duration;
// crates.io
use jwks_aggregator::{IdpConfig, Registry, query, spawn_refreshers};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

const JWKS_BODY: &str = r#"{
    "keys": [
        {
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "kid": "primary",
            "n": "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyAhIiMkJSYnKCkqKywtLi8wMTIzNDU2Nzg5Ojs8PT4_QEFCQ0RFRkdISUpLTE1OT1BRUlNUVVZXWFlaW1xdXl9gYWJjZGVmZ2hpamtsbW5vcHFyc3R1dnd4eXp7fH1-f4A",
            "e": "AQAB"
        }
    ]
}"#;

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
async fn stable_idp_loads_on_startup_and_serves_upstream_cache_duration() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;
	let jwks_path = "/.well-known/jwks.json";

	Mock::given(method("GET"))
		.and(path(jwks_path))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_string(JWKS_BODY)
				.insert_header("content-type", "application/json")
				.insert_header("cache-control", "public, max-age=60"),
		)
		.mount(&server)
		.await;

	let config = IdpConfig::new("auth0", format!("{}{jwks_path}", server.uri()), Duration::from_secs(300))
		.expect("valid config");
	let registry = Registry::new();
	let refreshers = spawn_refreshers(vec![config.clone()], registry.clone()).expect("validated");

	wait_until_loaded(&registry, "auth0").await;

	let view = query::idp_view(&registry, &[config], "auth0").await.expect("loaded");

	assert_eq!(view.jwks.keys.len(), 1);
	assert_eq!(view.cache_duration, 60, "upstream's tighter max-age should win over the 900s default");

	refreshers.shutdown().await;
}

#[tokio::test]
async fn fast_rotating_idp_overrides_state_on_every_tick() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;
	let jwks_path = "/.well-known/jwks.json";

	Mock::given(method("GET"))
		.and(path(jwks_path))
		.respond_with(ResponseTemplate::new(200).set_body_string(JWKS_BODY))
		.mount(&server)
		.await;

	let config = IdpConfig::new("fast-rotate", format!("{}{jwks_path}", server.uri()), Duration::from_millis(200))
		.expect("valid config");
	let registry = Registry::new();
	let refreshers = spawn_refreshers(vec![config], registry.clone()).expect("validated");

	wait_until_loaded(&registry, "fast-rotate").await;

	let first = registry.get("fast-rotate").await.expect("published");

	tokio::time::sleep(Duration::from_millis(500)).await;

	let later = registry.get("fast-rotate").await.expect("published");

	assert!(later.update_count > first.update_count, "fast interval should have produced multiple attempts");

	refreshers.shutdown().await;
}

#[tokio::test]
async fn refresher_truncates_keys_beyond_configured_max_keys() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;
	let jwks_path = "/.well-known/jwks.json";
	let body = serde_json::json!({
		"keys": (0..5).map(|i| serde_json::json!({"kty": "RSA", "kid": i.to_string()})).collect::<Vec<_>>(),
	});

	Mock::given(method("GET"))
		.and(path(jwks_path))
		.respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
		.mount(&server)
		.await;

	let mut config = IdpConfig::new("big-idp", format!("{}{jwks_path}", server.uri()), Duration::from_secs(300))
		.expect("valid config");
	config.max_keys = 2;

	let registry = Registry::new();
	let refreshers = spawn_refreshers(vec![config], registry.clone()).expect("validated");

	wait_until_loaded(&registry, "big-idp").await;

	let state = registry.get("big-idp").await.expect("published");

	assert_eq!(state.key_count, 2, "truncation must cap at max_keys regardless of upstream count");

	refreshers.shutdown().await;
}

#[tokio::test]
async fn failure_after_a_prior_success_keeps_serving_the_last_good_jwks() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;
	let jwks_path = "/.well-known/jwks.json";

	Mock::given(method("GET"))
		.and(path(jwks_path))
		.respond_with(ResponseTemplate::new(200).set_body_string(JWKS_BODY))
		.up_to_n_times(1)
		.mount(&server)
		.await;
	Mock::given(method("GET")).and(path(jwks_path)).respond_with(ResponseTemplate::new(503)).mount(&server).await;

	let config = IdpConfig::new("flaky", format!("{}{jwks_path}", server.uri()), Duration::from_millis(150))
		.expect("valid config");
	let registry = Registry::new();
	let refreshers = spawn_refreshers(vec![config], registry.clone()).expect("validated");

	wait_until_loaded(&registry, "flaky").await;

	let after_success = registry.get("flaky").await.expect("published");

	tokio::time::sleep(Duration::from_millis(400)).await;

	let after_failures = registry.get("flaky").await.expect("published");

	assert!(after_failures.update_count > after_success.update_count);
	assert_eq!(
		after_failures.key_count, after_success.key_count,
		"a failed attempt must not discard the last successful jwks"
	);
	assert!(!after_failures.last_error.is_empty());

	refreshers.shutdown().await;
}

#[tokio::test]
async fn unknown_idp_name_is_not_found_not_not_ready() {
	let registry = Registry::new();
	let config = IdpConfig::new("auth0", "https://auth0.example.com/jwks.json", Duration::from_secs(60))
		.expect("valid config");

	let err = query::idp_view(&registry, &[config], "does-not-exist").await.unwrap_err();

	assert!(matches!(err, jwks_aggregator::Error::NotFound(name) if name == "does-not-exist"));
}
