//! Common types and helpers for the Telamon snapshot tooling.
//!
//! This crate holds the pieces shared between the wire codec, the stream
//! validator and the manifest builder:
//! - Fixed-size hash wrapper (`hash.rs`)
//! - Snapshot header and record model (`types.rs`)
//! - Streaming SHA-256 digest (`digest.rs`)
//! - Filename-based tip derivation for the fallback path (`filename.rs`)

pub mod digest;
pub mod filename;
pub mod hash;
pub mod types;

pub use digest::{compute_sha256, compute_sha256_chunked, DigestError};
pub use filename::tip_from_filename;
pub use hash::{BlockHash, Hash};
pub use types::{RecordKind, SnapshotHeader, SnapshotRecord, UtxoEntry};
