//! Envelope encoder.
//!
//! The envelope is `[version, header, records]`, exactly three elements.
//! Decoding the envelope is driven by the stream decoder, which needs to
//! classify failures per stage; encoding lives here so fixtures and
//! writer tools produce the canonical shape.

use crate::{encode_header, encode_record};
use minicbor::{encode, Encoder};
use telamon_common::types::SNAPSHOT_FORMAT_VERSION;
use telamon_common::{SnapshotHeader, SnapshotRecord};

/// Encode a complete snapshot envelope at the current format version.
pub fn encode_envelope<W: encode::Write>(
    header: &SnapshotHeader,
    records: &[SnapshotRecord],
    e: &mut Encoder<W>,
) -> Result<(), encode::Error<W::Error>> {
    e.array(3)?;
    e.u64(SNAPSHOT_FORMAT_VERSION)?;
    encode_header(header, e)?;
    e.array(records.len() as u64)?;
    for record in records {
        encode_record(record, e)?;
    }
    Ok(())
}
