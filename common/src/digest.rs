//! Whole-file integrity digest, computed in bounded memory.
//!
//! The digest covers the raw bytes of the snapshot file, including any
//! trailing or unknown content: it is a provenance record, independent of
//! structural decoding.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Default read chunk size: 16 MiB.
pub const DIGEST_CHUNK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error reading {0}: {1}")]
    Io(String, std::io::Error),
}

/// Compute the SHA-256 of a file as a lowercase hex string (64 chars).
///
/// Reads in fixed-size chunks so that only one chunk plus the hash state
/// is ever held in memory.
pub fn compute_sha256<P: AsRef<Path>>(path: P) -> Result<String, DigestError> {
    compute_sha256_chunked(path, DIGEST_CHUNK_SIZE)
}

/// Same as [`compute_sha256`] with an explicit chunk size.
///
/// The result is identical for every chunk size; chunking is purely a
/// property of the streaming reader.
pub fn compute_sha256_chunked<P: AsRef<Path>>(
    path: P,
    chunk_size: usize,
) -> Result<String, DigestError> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(DigestError::FileNotFound(path.display().to_string()));
    }

    let file = File::open(path)
        .map_err(|e| DigestError::Io(path.display().to_string(), e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| DigestError::Io(path.display().to_string(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let result = hasher.finalize();
    Ok(format!("{result:x}"))
}
