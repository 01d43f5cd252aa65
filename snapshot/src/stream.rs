//! Lazy stream decoder for snapshot containers.
//!
//! `SnapshotStream::open` memory-maps the file, decodes the envelope
//! version and header eagerly, and leaves a forward-only cursor over the
//! records array. Records are decoded one at a time; the full sequence is
//! never held in memory, so arbitrarily long snapshots validate in
//! constant working memory (aside from per-record payload size).

use crate::error::SnapshotError;
use memmap2::Mmap;
use minicbor::Decoder;
use std::fs::File;
use std::path::Path;
use telamon_codec::{decode_header, decode_record};
use telamon_common::types::SNAPSHOT_FORMAT_VERSION;
use telamon_common::{SnapshotHeader, SnapshotRecord};
use tracing::debug;

/// Byte-size ceiling above which callers skip structural decoding and
/// route to the manifest fallback path instead: 64 MiB. Dumps above this
/// size are assumed to be foreign formats (e.g. Amaru ledger state).
pub const LARGE_SNAPSHOT_CEILING: u64 = 64 * 1024 * 1024;

/// An open snapshot container: decoded header plus a non-restartable
/// record cursor.
pub struct SnapshotStream {
    mmap: Mmap,
    pos: usize,
    remaining: u64,
    header: SnapshotHeader,
}

impl SnapshotStream {
    /// Open a snapshot file and decode its envelope prefix.
    ///
    /// Reads only as far as the header; the records array is left to the
    /// cursor. Fails with `BadEnvelope` on any top-level shape other than
    /// `[version, header, records]`, `UnsupportedVersion` for versions
    /// other than 1, and `BadHeader` when required header fields are
    /// missing or mistyped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(SnapshotError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(SnapshotError::BadEnvelope("empty file".to_string()));
        }
        let mmap = unsafe { Mmap::map(&file) }?;

        let mut d = Decoder::new(&mmap);

        let envelope_len = d
            .array()
            .map_err(|e| SnapshotError::BadEnvelope(e.to_string()))?
            .ok_or_else(|| {
                SnapshotError::BadEnvelope("envelope must be a definite-length array".to_string())
            })?;
        if envelope_len != 3 {
            return Err(SnapshotError::BadEnvelope(format!(
                "envelope must be [version, header, records], got {envelope_len} elements"
            )));
        }

        let version = d
            .u64()
            .map_err(|e| SnapshotError::BadEnvelope(format!("version: {e}")))?;
        if version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let header = decode_header(&mut d).map_err(|e| SnapshotError::BadHeader(e.to_string()))?;

        let remaining = d
            .array()
            .map_err(|e| SnapshotError::BadEnvelope(format!("records: {e}")))?
            .ok_or_else(|| {
                SnapshotError::BadEnvelope("records must be a definite-length array".to_string())
            })?;

        let pos = d.position();
        debug!(
            era = %header.era,
            block_height = header.block_height,
            records = remaining,
            "opened snapshot stream"
        );

        Ok(Self {
            mmap,
            pos,
            remaining,
            header,
        })
    }

    /// Decoded snapshot header.
    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }

    /// Records not yet consumed by the cursor.
    pub fn records_remaining(&self) -> u64 {
        self.remaining
    }

    /// Advance the cursor by one record.
    ///
    /// Returns `Ok(None)` once the records array is exhausted and no
    /// bytes trail the envelope. A malformed record or trailing bytes
    /// end the stream; once advanced, a record cannot be re-read.
    pub fn next_record(&mut self) -> Result<Option<SnapshotRecord>, SnapshotError> {
        if self.remaining == 0 {
            let trailing = self.mmap.len() - self.pos;
            if trailing > 0 {
                // Report once, then treat the stream as finished.
                self.pos = self.mmap.len();
                return Err(SnapshotError::BadEnvelope(format!(
                    "{trailing} trailing bytes after envelope"
                )));
            }
            return Ok(None);
        }

        let mut d = Decoder::new(&self.mmap[self.pos..]);
        match decode_record(&mut d) {
            Ok(record) => {
                self.pos += d.position();
                self.remaining -= 1;
                Ok(Some(record))
            }
            Err(e) => {
                // The cursor is forward-only; a malformed record ends it.
                self.remaining = 0;
                self.pos = self.mmap.len();
                Err(SnapshotError::Cbor(e))
            }
        }
    }
}

impl Iterator for SnapshotStream {
    type Item = Result<SnapshotRecord, SnapshotError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
