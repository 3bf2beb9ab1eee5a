//! Deterministic resource identity generation (the Resource Hash Convention).
//!
//! A resource identifier is derived from a canonical, whitespace-free JSON
//! serialization of its type name plus an ordered list of identity-defining
//! (relationship, value) pairs, hashed and rendered in a compact URL-safe
//! alphabet. Identical canonical input yields the identical identifier in
//! the same run and across runs, which is what lets repeated mentions of
//! the same real-world entity fold into a single node.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::collections::HashSet;

/// Deterministic, collision-resistant identifier generator.
///
/// The generator itself is a pure function of its explicit per-call input,
/// except for the monotonic disambiguator applied when no identity data is
/// supplied (unrelated blank resources must not fold together).
#[derive(Debug, Default)]
pub struct IdentityGenerator {
    minted: HashSet<String>,
    blank_counter: u64,
}

impl IdentityGenerator {
    /// Creates a fresh generator with no minted identifiers.
    #[must_use]
    pub fn new() -> Self {
        IdentityGenerator::default()
    }

    /// Mints or folds an identifier for a resource of `type_name` with the
    /// given ordered identity data.
    ///
    /// Returns the identifier and whether this is the first time it has
    /// been produced by this generator (`false` means a fold).
    ///
    /// An empty `identity_pairs` list falls back to a hash of the type name
    /// plus a monotonic disambiguator, so blank resources never fold.
    pub fn next_id(
        &mut self,
        type_name: &str,
        identity_pairs: &[(String, String)],
    ) -> (String, bool) {
        let canonical = if identity_pairs.is_empty() {
            self.blank_counter += 1;
            serde_json::to_string(&(type_name, "@blank", self.blank_counter))
        } else {
            let pairs: Vec<(&str, &str)> = identity_pairs
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            serde_json::to_string(&(type_name, &pairs))
        }
        .unwrap_or_else(|_| format!("{type_name}@fallback"));

        let id = hash_identity(&canonical);
        let first_seen = self.minted.insert(id.clone());
        (id, first_seen)
    }

    /// Returns true if this generator has already produced `id`.
    #[must_use]
    pub fn has_minted(&self, id: &str) -> bool {
        self.minted.contains(id)
    }
}

/// Hashes a canonical identity serialization into a short printable id.
///
/// First 8 bytes of the BLAKE3 digest, base64url without padding: 11
/// characters, 64 bits of collision resistance. Collisions are accepted as
/// negligible rather than detected.
#[must_use]
pub fn hash_identity(canonical: &str) -> String {
    let digest = blake3::hash(canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest.as_bytes()[..8])
}
