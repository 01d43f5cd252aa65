//! Snapshot decoding and verification error types.

use telamon_common::digest::DigestError;
use thiserror::Error;

/// Errors surfaced by stream decoding, manifest building and manifest
/// verification.
///
/// Format errors (`BadEnvelope`, `UnsupportedVersion`, `BadHeader`,
/// `Cbor`) are fatal to decoding and never retried. `EraMismatch` and
/// `IntegrityMismatch` are policy violations over well-formed bytes.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad envelope: {0}")]
    BadEnvelope(String),

    #[error("Unsupported snapshot format version {0}")]
    UnsupportedVersion(u64),

    #[error("Bad header: {0}")]
    BadHeader(String),

    #[error("CBOR error: {0}")]
    Cbor(#[from] minicbor::decode::Error),

    #[error("Era mismatch: expected one of [{expected}], got {actual}")]
    EraMismatch { expected: String, actual: String },

    #[error("Integrity mismatch: manifest says {expected}, computed {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("Manifest JSON error: {0}")]
    ManifestJson(#[from] serde_json::Error),

    #[error("Structural decode error: {0}")]
    StructuralDecode(String),

    #[error(transparent)]
    Digest(#[from] DigestError),
}
