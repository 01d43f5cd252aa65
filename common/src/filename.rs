//! Tip derivation from snapshot filenames.
//!
//! Snapshot dumps this tooling cannot decode structurally (e.g. Amaru
//! ledger-state exports) are conventionally named
//! `<height>.<block_hash>.<extension>`. The manifest fallback path mines
//! that convention for metadata.

use std::path::Path;

/// Derive `(block_height, block_hash)` from a `<uint>.<hex>.<ext>`
/// filename.
///
/// The hash component is lowercased. Returns `None` for any other name
/// shape; an unparseable name is a recognized degradation of the fallback
/// path, not an error.
pub fn tip_from_filename(path: &Path) -> Option<(u64, String)> {
    let name = path.file_name()?.to_str()?;

    // Expect at least: height.hash.extension
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 3 {
        return None;
    }

    let height = parts[0].parse::<u64>().ok()?;
    let hash = parts[1];
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    Some((height, hash.to_lowercase()))
}
