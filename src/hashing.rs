//! Hashing System - SHA-256 for Build Outcomes
//!
//! Deterministic hashes let a rerun prove that identical inputs produced an
//! identical Document.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compact JSON with object keys in byte order at every depth
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(value)?;
    canonicalize(&mut value);
    serde_json::to_string(&value)
}

fn canonicalize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> = std::mem::take(map)
                .into_iter()
                .map(|(key, mut child)| {
                    canonicalize(&mut child);
                    (key, child)
                })
                .collect();
            map.extend(ordered);
        }
        Value::Array(items) => items.iter_mut().for_each(canonicalize),
        _ => {}
    }
}

/// Hash of a built Document
pub fn compute_document_hash<T: Serialize>(document: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(document)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Hash of everything a page build reads
/// input_hash = sha256(page_id + canonical_page + canonical_context + engine_version)
pub fn compute_input_hash(
    page_id: &str,
    page: &impl Serialize,
    context: &impl Serialize,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_page = canonical_json(page)?;
    let canonical_context = canonical_json(context)?;
    let combined = format!(
        "{}:{}:{}:{}",
        page_id, canonical_page, canonical_context, engine_version
    );
    Ok(sha256_hex(combined.as_bytes()))
}
