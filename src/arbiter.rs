//! Cache-Duration Arbiter: a pure function over (upstream `max-age`, operator
//! `cache_duration`) plus `Cache-Control` header parsing.

// crates.io
use http::HeaderMap;

/// Compute the client-facing cache duration from the upstream's suggested
/// `max-age` and the operator-configured floor.
///
/// `idp_suggested == 0` means no usable upstream signal was present. Otherwise
/// the shorter of the two wins: an upstream rotating faster than the operator
/// assumed must be respected, but a laxer upstream suggestion never overrides
/// the operator's freshness floor.
pub fn choose_cache_duration(idp_suggested: u64, configured: u64) -> u64 {
	if idp_suggested == 0 { configured } else { idp_suggested.min(configured) }
}

/// Extract `max-age` from a `Cache-Control` header value.
///
/// Directives are comma-separated, whitespace is trimmed around each, and the
/// first directive of the form `max-age=<non-negative integer>` wins. Absent
/// header, absent directive, or an unparseable value all yield 0.
pub fn parse_max_age(headers: &HeaderMap) -> u64 {
	let Some(value) = headers.get(http::header::CACHE_CONTROL).and_then(|v| v.to_str().ok()) else {
		return 0;
	};

	parse_max_age_str(value)
}

/// `Cache-Control` directive parsing over a plain string, independent of `HeaderMap`.
pub fn parse_max_age_str(value: &str) -> u64 {
	value
		.split(',')
		.map(str::trim)
		.find_map(|directive| directive.strip_prefix("max-age="))
		.and_then(|n| n.trim().parse::<u64>().ok())
		.unwrap_or(0)
}
