//! Canonical JSON form and content fingerprints
//!
//! Every body the engine stores, hashes, diffs, or uploads goes through a
//! single parse/re-emit pass so that whitespace and formatting noise from
//! editors never registers as a change. Fingerprints are the 128-bit xxh3
//! hash of that canonical form, hex-encoded.

use serde_json::Value;
use xxhash_rust::xxh3::xxh3_128;

/// Re-emit JSON bytes in the canonical format.
///
/// The canonical form is 2-space indented, keeps the original key order,
/// and ends with a newline.
///
/// # Errors
///
/// Returns the underlying parse error if the input is not valid JSON.
pub fn canonicalize(data: &[u8]) -> serde_json::Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(data)?;
    canonical_bytes(&value)
}

/// Render an already-parsed value in the canonical format.
pub fn canonical_bytes(value: &Value) -> serde_json::Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(value)?;
    out.push(b'\n');
    Ok(out)
}

/// Compute the hex-encoded 128-bit fingerprint of a byte buffer.
///
/// Callers are expected to pass canonical bytes; the fingerprint of a
/// non-canonical buffer is meaningless for change detection.
pub fn fingerprint(data: &[u8]) -> String {
    format!("{:032x}", xxh3_128(data))
}

/// Canonicalize and fingerprint in one step.
pub fn canonical_fingerprint(data: &[u8]) -> serde_json::Result<String> {
    Ok(fingerprint(&canonicalize(data)?))
}
