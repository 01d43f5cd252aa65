//! Tagged-record codec.
//!
//! Each record is a definite-length CBOR array whose first element is the
//! kind discriminator. Decoding is a pure function over one demarcated
//! wire value; `decode_record(encode_record(r)) == r` for every
//! constructible record.

use minicbor::{decode, encode, Decoder, Encoder};
use telamon_common::{SnapshotRecord, UtxoEntry};

fn check_arity(kind: &str, len: u64, want: u64, pos: usize) -> Result<(), decode::Error> {
    if len != want {
        return Err(decode::Error::message(format!(
            "{kind} record must have {want} elements, got {len} (at byte {pos})"
        )));
    }
    Ok(())
}

/// Decode one record from the decoder's current position.
pub fn decode_record(d: &mut Decoder) -> Result<SnapshotRecord, decode::Error> {
    let pos = d.position();
    let len = d.array()?.ok_or_else(|| {
        decode::Error::message(format!(
            "record must be a definite-length array (at byte {pos})"
        ))
    })?;
    if len == 0 {
        return Err(decode::Error::message(format!(
            "empty record array (at byte {pos})"
        )));
    }

    let tag = d.u64()?;
    match tag {
        0 => {
            check_arity("Utxo", len, 5, pos)?;
            Ok(SnapshotRecord::Utxo(UtxoEntry {
                tx_hash: d.bytes()?.to_vec(),
                output_index: d.u64()?,
                address: d.str()?.to_owned(),
                value: d.u64()?,
            }))
        }
        1 => {
            check_arity("GovernanceActionsDelta", len, 2, pos)?;
            Ok(SnapshotRecord::GovernanceActionsDelta(d.i64()?))
        }
        2 => {
            check_arity("TipUpdate", len, 3, pos)?;
            Ok(SnapshotRecord::TipUpdate {
                height: d.u64()?,
                block_hash: d.decode()?,
            })
        }
        3 => {
            check_arity("ParameterSet", len, 2, pos)?;
            let pairs_len = d.array()?.ok_or_else(|| {
                decode::Error::message("parameter pairs must be a definite-length array")
            })?;
            // The declared length is untrusted input; let the vec grow as
            // pairs actually decode.
            let mut pairs = Vec::new();
            for _ in 0..pairs_len {
                let pair_len = d.array()?.ok_or_else(|| {
                    decode::Error::message("parameter pair must be a definite-length array")
                })?;
                if pair_len != 2 {
                    return Err(decode::Error::message(format!(
                        "parameter pair must be [name, value], got {pair_len} elements"
                    )));
                }
                pairs.push((d.str()?.to_owned(), d.str()?.to_owned()));
            }
            Ok(SnapshotRecord::ParameterSet(pairs))
        }
        4 => {
            check_arity("EndOfSnapshot", len, 1, pos)?;
            Ok(SnapshotRecord::EndOfSnapshot)
        }
        other => Err(decode::Error::message(format!(
            "unknown record tag {other} (at byte {pos})"
        ))),
    }
}

/// Encode one record; the exact inverse of [`decode_record`].
pub fn encode_record<W: encode::Write>(
    record: &SnapshotRecord,
    e: &mut Encoder<W>,
) -> Result<(), encode::Error<W::Error>> {
    match record {
        SnapshotRecord::Utxo(utxo) => {
            e.array(5)?
                .u64(0)?
                .bytes(&utxo.tx_hash)?
                .u64(utxo.output_index)?
                .str(&utxo.address)?
                .u64(utxo.value)?;
        }
        SnapshotRecord::GovernanceActionsDelta(delta) => {
            e.array(2)?.u64(1)?.i64(*delta)?;
        }
        SnapshotRecord::TipUpdate { height, block_hash } => {
            e.array(3)?.u64(2)?.u64(*height)?.bytes(block_hash.as_ref())?;
        }
        SnapshotRecord::ParameterSet(pairs) => {
            e.array(2)?.u64(3)?.array(pairs.len() as u64)?;
            for (name, value) in pairs {
                e.array(2)?.str(name)?.str(value)?;
            }
        }
        SnapshotRecord::EndOfSnapshot => {
            e.array(1)?.u64(4)?;
        }
    }
    Ok(())
}
