//! Canonical serialization for result fingerprints.
//!
//! Two runs over the same evidence with the same policy must produce
//! byte-identical classifications. Fingerprints make that checkable: hash
//! the canonical JSON of a result and compare hex strings.
//!
//! ## Determinism Guarantees
//!
//! - Struct fields serialize in declaration order
//! - Sets and maps in hashed data are BTreeSet/BTreeMap, never HashMap
//! - Vectors are built in canonical `SeriesId` order before hashing

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes.
///
/// Only called on types whose `Serialize` impls cannot fail (plain structs,
/// string-keyed maps).
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("canonical serialization of plain data cannot fail")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
