//! Snapshot stream validation and manifest generation.
//!
//! This crate provides:
//! - A lazy, forward-only stream decoder over the snapshot container
//!   (`stream.rs`)
//! - An invariant validator over the decoded record stream
//!   (`validator.rs`)
//! - A manifest builder with a size-ceiling fallback path, plus manifest
//!   parsing and integrity verification (`manifest.rs`)
//! - Error types (`error.rs`)

mod error;
mod manifest;
mod stream;
mod validator;

pub use error::SnapshotError;
pub use manifest::{
    build_manifest, parse_manifest, validate_era, validate_integrity, ManifestOverrides,
    Provenance, SnapshotManifest, DEFAULT_ERA, MANIFEST_FORMAT_VERSION, MANIFEST_MAGIC,
};
pub use stream::{SnapshotStream, LARGE_SNAPSHOT_CEILING};
pub use validator::{validate_stream, EraPolicy, ValidationIssue, ValidationReport};
