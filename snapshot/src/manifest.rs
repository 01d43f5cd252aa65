//! Manifest building, parsing and integrity verification.
//!
//! A manifest is the derived, hashable summary of a snapshot file:
//! identity metadata (era, tip height and hash), a whole-file SHA-256
//! digest, and a provenance marker saying how much of the metadata was
//! confirmed. It is built once per invocation and immutable afterwards.

use crate::error::SnapshotError;
use crate::stream::{SnapshotStream, LARGE_SNAPSHOT_CEILING};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use telamon_common::{compute_sha256, tip_from_filename};
use tracing::{debug, info};

/// Constant identifying the artifact type.
pub const MANIFEST_MAGIC: &str = "CARDANO_SNAPSHOT";
/// Semantic version of the manifest document format.
pub const MANIFEST_FORMAT_VERSION: &str = "1.0.0";
/// Era assumed when the fallback path has nothing better to go on.
pub const DEFAULT_ERA: &str = "conway";

/// How much of the manifest metadata was confirmed against the snapshot.
///
/// `Fallback` means structural decoding was skipped or failed and the
/// metadata came from the filename or caller overrides. `HeaderOnly`
/// means the header decoded but the record stream was not validated.
/// `FullyValidated` is set only after a clean validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Fallback,
    HeaderOnly,
    FullyValidated,
}

/// Caller-supplied metadata for the fallback path.
///
/// Overrides win over filename-derived values; decoded header values,
/// when available, take precedence over both.
#[derive(Debug, Clone, Default)]
pub struct ManifestOverrides {
    pub era: Option<String>,
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
}

/// Derived summary document describing a snapshot file's identity and
/// integrity digest.
///
/// `block_height` and `block_hash` are `None` (serialized as `null`)
/// when the fallback path could not derive them; there is no sentinel
/// height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub magic: String,
    pub format_version: String,
    pub era: String,
    pub block_height: Option<u64>,
    pub block_hash: Option<String>,
    pub sha256: String,
    pub created_at: String,
    pub size_bytes: u64,
    pub governance_section_present: bool,
    #[serde(default = "Provenance::fallback")]
    pub provenance: Provenance,
}

impl Provenance {
    // serde default for manifests written before the field existed
    fn fallback() -> Self {
        Provenance::Fallback
    }
}

impl SnapshotManifest {
    /// Upgrade provenance after a clean validation pass over the same
    /// snapshot file.
    pub fn mark_fully_validated(&mut self) {
        self.provenance = Provenance::FullyValidated;
    }
}

/// Build a manifest for a snapshot file.
///
/// Decision procedure: files at or below [`LARGE_SNAPSHOT_CEILING`] are
/// structurally decoded and the header supplies the metadata; larger
/// files, or files whose header fails to parse, take the fallback path
/// (filename pattern `<height>.<hash>.<ext>`, then overrides, then
/// documented defaults). The digest and size are always computed from
/// the raw bytes. A fallback is a recognized lower-confidence success,
/// not an error.
pub fn build_manifest<P: AsRef<Path>>(
    path: P,
    overrides: &ManifestOverrides,
) -> Result<SnapshotManifest, SnapshotError> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(SnapshotError::FileNotFound(path.display().to_string()));
    }
    let size_bytes = fs::metadata(path)?.len();

    let decoded_header = if size_bytes <= LARGE_SNAPSHOT_CEILING {
        match SnapshotStream::open(path) {
            Ok(stream) => Some(stream.header().clone()),
            Err(e) => {
                debug!("structural decode failed, using fallback metadata: {e}");
                None
            }
        }
    } else {
        info!(
            size_bytes,
            "snapshot exceeds decode ceiling, using fallback metadata"
        );
        None
    };

    let (era, block_height, block_hash, governance_section_present, provenance) =
        match decoded_header {
            Some(header) => (
                header.era.clone(),
                Some(header.block_height),
                Some(header.block_hash.to_string()),
                header.has_governance_section(),
                Provenance::HeaderOnly,
            ),
            None => {
                let from_name = tip_from_filename(path);
                let block_height = overrides
                    .block_height
                    .or_else(|| from_name.as_ref().map(|(height, _)| *height));
                let block_hash = overrides
                    .block_hash
                    .as_ref()
                    .map(|h| h.to_lowercase())
                    .or_else(|| from_name.map(|(_, hash)| hash));
                let era = overrides.era.clone().unwrap_or_else(|| DEFAULT_ERA.to_string());
                (era, block_height, block_hash, false, Provenance::Fallback)
            }
        };

    let sha256 = compute_sha256(path)?;

    Ok(SnapshotManifest {
        magic: MANIFEST_MAGIC.to_string(),
        format_version: MANIFEST_FORMAT_VERSION.to_string(),
        era,
        block_height,
        block_hash,
        sha256,
        created_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        size_bytes,
        governance_section_present,
        provenance,
    })
}

/// Parse a manifest JSON file and validate its field shape.
pub fn parse_manifest<P: AsRef<Path>>(path: P) -> Result<SnapshotManifest, SnapshotError> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(SnapshotError::FileNotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path)?;
    let manifest: SnapshotManifest = serde_json::from_str(&content)?;

    if manifest.magic.is_empty() {
        return Err(SnapshotError::StructuralDecode(
            "magic field is empty".to_string(),
        ));
    }
    if manifest.format_version.is_empty() {
        return Err(SnapshotError::StructuralDecode(
            "format_version field is empty".to_string(),
        ));
    }
    if manifest.era.is_empty() {
        return Err(SnapshotError::StructuralDecode(
            "era field is empty".to_string(),
        ));
    }
    if manifest.sha256.len() != 64
        || !manifest
            .sha256
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    {
        return Err(SnapshotError::StructuralDecode(format!(
            "sha256 must be 64 lowercase hex chars, got {:?}",
            manifest.sha256
        )));
    }

    Ok(manifest)
}

/// Check the manifest's era against an allow-list.
pub fn validate_era(
    manifest: &SnapshotManifest,
    policy: &crate::validator::EraPolicy,
) -> Result<(), SnapshotError> {
    if !policy.allows(&manifest.era) {
        return Err(SnapshotError::EraMismatch {
            expected: policy.describe(),
            actual: manifest.era.clone(),
        });
    }
    Ok(())
}

/// Verify a snapshot file against its manifest: size first (cheap), then
/// the SHA-256 digest.
pub fn validate_integrity<P: AsRef<Path>>(
    snapshot_path: P,
    manifest: &SnapshotManifest,
) -> Result<(), SnapshotError> {
    let path = snapshot_path.as_ref();

    let actual_size = fs::metadata(path)?.len();
    if actual_size != manifest.size_bytes {
        return Err(SnapshotError::StructuralDecode(format!(
            "file size mismatch: manifest says {} bytes, file is {} bytes (truncated?)",
            manifest.size_bytes, actual_size
        )));
    }

    let computed = compute_sha256(path)?;
    if computed != manifest.sha256 {
        return Err(SnapshotError::IntegrityMismatch {
            expected: manifest.sha256.clone(),
            actual: computed,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::EraPolicy;
    use minicbor::Encoder;
    use std::path::PathBuf;
    use telamon_codec::encode_envelope;
    use telamon_common::{SnapshotHeader, SnapshotRecord};
    use tempfile::TempDir;

    const TIP: &str = "670ca68c3de580f8469677754a725e86ca72a7be381d3108569f0704a5fca327";

    fn write_valid_snapshot(dir: &TempDir, name: &str) -> PathBuf {
        let header = SnapshotHeader {
            era: "conway".to_string(),
            block_height: 1_000_000,
            block_hash: TIP.parse().unwrap(),
            declared_utxo_count: 0,
            declared_gov_action_count: 3,
            declared_param_set_count: 0,
        };
        let mut e = Encoder::new(Vec::new());
        encode_envelope(&header, &[SnapshotRecord::EndOfSnapshot], &mut e).unwrap();
        let path = dir.path().join(name);
        fs::write(&path, e.into_writer()).unwrap();
        path
    }

    #[test]
    fn decoded_header_wins_over_everything() {
        let dir = TempDir::new().unwrap();
        // Filename metadata deliberately disagrees with the header.
        let path = write_valid_snapshot(&dir, &format!("42.{}.cbor", "ab".repeat(32)));

        let overrides = ManifestOverrides {
            era: Some("byron".to_string()),
            block_hash: Some("ff".repeat(32)),
            block_height: Some(7),
        };
        let manifest = build_manifest(&path, &overrides).unwrap();

        assert_eq!(manifest.era, "conway");
        assert_eq!(manifest.block_height, Some(1_000_000));
        assert_eq!(manifest.block_hash.as_deref(), Some(TIP));
        assert!(manifest.governance_section_present);
        assert_eq!(manifest.provenance, Provenance::HeaderOnly);
    }

    #[test]
    fn fallback_derives_tip_from_filename() {
        let dir = TempDir::new().unwrap();
        let hash_upper = "AABBCC".repeat(10) + "DDEE"; // 64 hex chars, mixed case
        let path = dir.path().join(format!("1000000.{hash_upper}.cbor"));
        fs::write(&path, b"").unwrap();

        let manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();
        assert_eq!(manifest.block_height, Some(1_000_000));
        assert_eq!(
            manifest.block_hash.as_deref(),
            Some(hash_upper.to_lowercase().as_str())
        );
        assert_eq!(manifest.era, DEFAULT_ERA);
        assert!(!manifest.governance_section_present);
        assert_eq!(manifest.provenance, Provenance::Fallback);
        assert_eq!(manifest.size_bytes, 0);
    }

    #[test]
    fn overrides_win_over_filename_in_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("42.{}.cbor", "ab".repeat(32)));
        fs::write(&path, b"not cbor at all").unwrap();

        let overrides = ManifestOverrides {
            era: Some("babbage".to_string()),
            block_hash: Some("FF".repeat(32)),
            block_height: Some(7),
        };
        let manifest = build_manifest(&path, &overrides).unwrap();
        assert_eq!(manifest.era, "babbage");
        assert_eq!(manifest.block_height, Some(7));
        assert_eq!(manifest.block_hash.as_deref(), Some("ff".repeat(32).as_str()));
        assert_eq!(manifest.provenance, Provenance::Fallback);
    }

    #[test]
    fn unknown_tip_is_null_not_a_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("opaque-dump.cbor");
        fs::write(&path, b"\x00\x01\x02").unwrap();

        let manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();
        assert_eq!(manifest.block_height, None);
        assert_eq!(manifest.block_hash, None);

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&manifest).unwrap()).unwrap();
        assert!(json["block_height"].is_null());
        assert!(json["block_hash"].is_null());
    }

    #[test]
    fn manifest_document_is_complete() {
        let dir = TempDir::new().unwrap();
        let path = write_valid_snapshot(&dir, "snapshot-small.cbor");

        let manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&manifest).unwrap()).unwrap();

        for field in [
            "magic",
            "format_version",
            "era",
            "block_height",
            "block_hash",
            "sha256",
            "created_at",
            "size_bytes",
            "governance_section_present",
            "provenance",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(json["magic"], MANIFEST_MAGIC);
        let sha = json["sha256"].as_str().unwrap();
        assert_eq!(sha.len(), 64);
        assert!(sha
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let created = json["created_at"].as_str().unwrap();
        assert!(created.ends_with('Z'), "timestamp must carry a Z suffix");
    }

    #[test]
    fn parse_round_trips_built_manifest() {
        let dir = TempDir::new().unwrap();
        let path = write_valid_snapshot(&dir, "snapshot-small.cbor");
        let manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();

        let manifest_path = dir.path().join("manifest.json");
        fs::write(
            &manifest_path,
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();

        let parsed = parse_manifest(&manifest_path).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn parse_round_trips_genesis_height() {
        // A header may legitimately declare height 0; the parser must
        // accept the manifest the builder emits for it.
        let dir = TempDir::new().unwrap();
        let header = SnapshotHeader {
            era: "conway".to_string(),
            block_height: 0,
            block_hash: TIP.parse().unwrap(),
            declared_utxo_count: 0,
            declared_gov_action_count: 0,
            declared_param_set_count: 0,
        };
        let mut e = Encoder::new(Vec::new());
        encode_envelope(&header, &[SnapshotRecord::EndOfSnapshot], &mut e).unwrap();
        let path = dir.path().join("genesis.cbor");
        fs::write(&path, e.into_writer()).unwrap();

        let manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();
        assert_eq!(manifest.block_height, Some(0));

        let manifest_path = dir.path().join("genesis-manifest.json");
        fs::write(&manifest_path, serde_json::to_string(&manifest).unwrap()).unwrap();
        let parsed = parse_manifest(&manifest_path).unwrap();
        assert_eq!(parsed.block_height, Some(0));
    }

    #[test]
    fn parse_rejects_empty_magic() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("bad.json");
        fs::write(
            &manifest_path,
            format!(
                r#"{{"magic": "", "format_version": "1.0.0", "era": "conway",
                     "block_height": 100, "block_hash": "{TIP}",
                     "sha256": "{}", "created_at": "2025-01-01T00:00:00Z",
                     "size_bytes": 245, "governance_section_present": false}}"#,
                "0".repeat(64)
            ),
        )
        .unwrap();

        assert!(matches!(
            parse_manifest(&manifest_path),
            Err(SnapshotError::StructuralDecode(_))
        ));
    }

    #[test]
    fn parse_rejects_short_sha256() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("bad.json");
        fs::write(
            &manifest_path,
            format!(
                r#"{{"magic": "CARDANO_SNAPSHOT", "format_version": "1.0.0",
                     "era": "conway", "block_height": 100, "block_hash": "{TIP}",
                     "sha256": "abc123", "created_at": "2025-01-01T00:00:00Z",
                     "size_bytes": 245, "governance_section_present": false}}"#
            ),
        )
        .unwrap();

        assert!(matches!(
            parse_manifest(&manifest_path),
            Err(SnapshotError::StructuralDecode(_))
        ));
    }

    #[test]
    fn parse_defaults_missing_provenance_to_fallback() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("old.json");
        fs::write(
            &manifest_path,
            format!(
                r#"{{"magic": "CARDANO_SNAPSHOT", "format_version": "1.0.0",
                     "era": "conway", "block_height": 100, "block_hash": "{TIP}",
                     "sha256": "{}", "created_at": "2025-01-01T00:00:00Z",
                     "size_bytes": 245, "governance_section_present": false}}"#,
                "0".repeat(64)
            ),
        )
        .unwrap();

        let manifest = parse_manifest(&manifest_path).unwrap();
        assert_eq!(manifest.provenance, Provenance::Fallback);
    }

    #[test]
    fn era_policy_check() {
        let dir = TempDir::new().unwrap();
        let path = write_valid_snapshot(&dir, "snapshot-small.cbor");
        let mut manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();

        assert!(validate_era(&manifest, &EraPolicy::default()).is_ok());
        manifest.era = "byron".to_string();
        assert!(matches!(
            validate_era(&manifest, &EraPolicy::default()),
            Err(SnapshotError::EraMismatch { .. })
        ));
    }

    #[test]
    fn integrity_check_matches_and_mismatches() {
        let dir = TempDir::new().unwrap();
        let path = write_valid_snapshot(&dir, "snapshot-small.cbor");
        let mut manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();

        assert!(validate_integrity(&path, &manifest).is_ok());

        manifest.sha256 = "0".repeat(64);
        assert!(matches!(
            validate_integrity(&path, &manifest),
            Err(SnapshotError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn integrity_check_catches_truncation() {
        let dir = TempDir::new().unwrap();
        let path = write_valid_snapshot(&dir, "snapshot-small.cbor");
        let manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 1]).unwrap();
        let err = validate_integrity(&path, &manifest).unwrap_err();
        assert!(err.to_string().contains("size mismatch"));
    }

    #[test]
    fn provenance_upgrade() {
        let dir = TempDir::new().unwrap();
        let path = write_valid_snapshot(&dir, "snapshot-small.cbor");
        let mut manifest = build_manifest(&path, &ManifestOverrides::default()).unwrap();

        assert_eq!(manifest.provenance, Provenance::HeaderOnly);
        manifest.mark_fully_validated();
        assert_eq!(manifest.provenance, Provenance::FullyValidated);
    }
}
