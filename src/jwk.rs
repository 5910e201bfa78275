//! Passthrough JWK/JWKS representation.
//!
//! Keys are retained verbatim: every field the upstream IDP sent is preserved
//! byte-for-byte through `serde_json::Value`, in the order received, with no
//! reordering, normalization, or algorithm-specific validation. Only `kty`
//! presence is inspected, and only to decide whether a key is well-formed
//! enough to flag in logs — a key lacking it is still retained.

// std
use std::ops::Deref;
// crates.io
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single JSON Web Key, carried as an opaque field map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jwk(Map<String, Value>);
impl Jwk {
	/// The key's `kty` field, if present.
	pub fn kty(&self) -> Option<&str> {
		self.0.get("kty").and_then(Value::as_str)
	}

	/// The key's `kid` field, if present.
	pub fn kid(&self) -> Option<&str> {
		self.0.get("kid").and_then(Value::as_str)
	}

	/// Whether the key is well-formed (only `kty` presence is required).
	pub fn is_well_formed(&self) -> bool {
		self.kty().is_some()
	}
}
impl Deref for Jwk {
	type Target = Map<String, Value>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// A JSON Web Key Set: an ordered sequence of [`Jwk`]s, order preserved verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Jwks {
	/// Keys in upstream order.
	pub keys: Vec<Jwk>,
}
impl Jwks {
	/// An empty key set.
	pub fn empty() -> Self {
		Self { keys: Vec::new() }
	}

	/// Whether this key set carries no keys.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Truncate to the first `max_keys` entries, returning the number of keys dropped.
	pub fn truncate(&mut self, max_keys: usize) -> usize {
		let original = self.keys.len();

		if original > max_keys {
			self.keys.truncate(max_keys);
		}

		original.saturating_sub(self.keys.len())
	}
}
