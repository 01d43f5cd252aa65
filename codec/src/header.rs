//! Snapshot header codec.
//!
//! The header is a CBOR map from small integer keys to typed values:
//! 0 era, 1 block height, 2 block hash, 3 declared UTXO count,
//! 4 declared governance action count, 5 declared parameter set count.
//! Identity fields (0..=2) are mandatory; declared counts default to 0.

use minicbor::{decode, encode, Decoder, Encoder};
use telamon_common::SnapshotHeader;

const KEY_ERA: u64 = 0;
const KEY_BLOCK_HEIGHT: u64 = 1;
const KEY_BLOCK_HASH: u64 = 2;
const KEY_DECLARED_UTXOS: u64 = 3;
const KEY_DECLARED_GOV_ACTIONS: u64 = 4;
const KEY_DECLARED_PARAM_SETS: u64 = 5;

fn set_once<T>(slot: &mut Option<T>, value: T, key: u64) -> Result<(), decode::Error> {
    if slot.is_some() {
        return Err(decode::Error::message(format!("duplicate header key {key}")));
    }
    *slot = Some(value);
    Ok(())
}

/// Decode the header map from the decoder's current position.
///
/// Rejects missing or mistyped identity fields, unknown keys and
/// duplicate keys before any record is read.
pub fn decode_header(d: &mut Decoder) -> Result<SnapshotHeader, decode::Error> {
    let len = d
        .map()?
        .ok_or_else(|| decode::Error::message("header must be a definite-length map"))?;

    let mut era = None;
    let mut block_height = None;
    let mut block_hash = None;
    let mut declared_utxos = None;
    let mut declared_gov_actions = None;
    let mut declared_param_sets = None;

    for _ in 0..len {
        let key = d.u64()?;
        match key {
            KEY_ERA => set_once(&mut era, d.str()?.to_owned(), key)?,
            KEY_BLOCK_HEIGHT => set_once(&mut block_height, d.u64()?, key)?,
            KEY_BLOCK_HASH => set_once(&mut block_hash, d.decode()?, key)?,
            KEY_DECLARED_UTXOS => set_once(&mut declared_utxos, d.u64()?, key)?,
            KEY_DECLARED_GOV_ACTIONS => set_once(&mut declared_gov_actions, d.u64()?, key)?,
            KEY_DECLARED_PARAM_SETS => set_once(&mut declared_param_sets, d.u64()?, key)?,
            other => {
                return Err(decode::Error::message(format!(
                    "unknown header key {other}"
                )))
            }
        }
    }

    let era = era.ok_or_else(|| decode::Error::message("header missing era (key 0)"))?;
    if era.is_empty() {
        return Err(decode::Error::message("header era must be non-empty"));
    }
    let block_height = block_height
        .ok_or_else(|| decode::Error::message("header missing block_height (key 1)"))?;
    let block_hash =
        block_hash.ok_or_else(|| decode::Error::message("header missing block_hash (key 2)"))?;

    Ok(SnapshotHeader {
        era,
        block_height,
        block_hash,
        declared_utxo_count: declared_utxos.unwrap_or(0),
        declared_gov_action_count: declared_gov_actions.unwrap_or(0),
        declared_param_set_count: declared_param_sets.unwrap_or(0),
    })
}

/// Encode the header map; the inverse of [`decode_header`].
///
/// Always writes all six keys, so declared-zero counts survive a
/// round trip.
pub fn encode_header<W: encode::Write>(
    header: &SnapshotHeader,
    e: &mut Encoder<W>,
) -> Result<(), encode::Error<W::Error>> {
    e.map(6)?;
    e.u64(KEY_ERA)?.str(&header.era)?;
    e.u64(KEY_BLOCK_HEIGHT)?.u64(header.block_height)?;
    e.u64(KEY_BLOCK_HASH)?.bytes(header.block_hash.as_ref())?;
    e.u64(KEY_DECLARED_UTXOS)?.u64(header.declared_utxo_count)?;
    e.u64(KEY_DECLARED_GOV_ACTIONS)?.u64(header.declared_gov_action_count)?;
    e.u64(KEY_DECLARED_PARAM_SETS)?.u64(header.declared_param_set_count)?;
    Ok(())
}
