//! Snapshot domain model: header metadata and the tagged record union.

use crate::hash::BlockHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot container format version understood by this tooling.
pub const SNAPSHOT_FORMAT_VERSION: u64 = 1;

/// Fixed-key metadata block describing a snapshot's identity and the
/// record counts it declares.
///
/// On the wire this is a CBOR map with small integer keys (0..=5). The
/// identity fields are mandatory; the declared counts default to zero
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Named protocol-version epoch the snapshot content conforms to.
    pub era: String,
    /// Chain height (or slot) of the snapshot tip.
    pub block_height: u64,
    /// Hash of the tip block header.
    pub block_hash: BlockHash,
    /// Number of UTXO records the body claims to contain.
    pub declared_utxo_count: u64,
    /// Net governance action count the body's delta records must sum to.
    pub declared_gov_action_count: u64,
    /// Number of parameter-set records the body claims to contain.
    pub declared_param_set_count: u64,
}

impl SnapshotHeader {
    /// True if the header declares any governance content.
    pub fn has_governance_section(&self) -> bool {
        self.declared_gov_action_count > 0 || self.declared_param_set_count > 0
    }
}

/// One unspent output entry in the snapshot body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    /// Hash of the producing transaction.
    pub tx_hash: Vec<u8>,
    /// Output index within the producing transaction.
    pub output_index: u64,
    /// Bech32-encoded address.
    pub address: String,
    /// Lovelace amount.
    pub value: u64,
}

/// One tagged unit in the snapshot body.
///
/// Wire discriminator is the first element of each record array:
/// 0 = Utxo, 1 = GovernanceActionsDelta, 2 = TipUpdate,
/// 3 = ParameterSet, 4 = EndOfSnapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotRecord {
    /// An unspent output.
    Utxo(UtxoEntry),
    /// Signed change to the governance action count. Multiple deltas may
    /// appear; their sum is checked against the declared count.
    GovernanceActionsDelta(i64),
    /// Informational tip observation, not subject to a declared count.
    TipUpdate { height: u64, block_hash: BlockHash },
    /// Protocol parameter name/value pairs.
    ParameterSet(Vec<(String, String)>),
    /// Terminal marker; must appear exactly once, last.
    EndOfSnapshot,
}

impl SnapshotRecord {
    /// Wire tag of this record.
    pub fn tag(&self) -> u64 {
        match self {
            SnapshotRecord::Utxo(_) => 0,
            SnapshotRecord::GovernanceActionsDelta(_) => 1,
            SnapshotRecord::TipUpdate { .. } => 2,
            SnapshotRecord::ParameterSet(_) => 3,
            SnapshotRecord::EndOfSnapshot => 4,
        }
    }

    /// Kind of this record, for counting and diagnostics.
    pub fn kind(&self) -> RecordKind {
        match self {
            SnapshotRecord::Utxo(_) => RecordKind::Utxo,
            SnapshotRecord::GovernanceActionsDelta(_) => RecordKind::GovernanceActionsDelta,
            SnapshotRecord::TipUpdate { .. } => RecordKind::TipUpdate,
            SnapshotRecord::ParameterSet(_) => RecordKind::ParameterSet,
            SnapshotRecord::EndOfSnapshot => RecordKind::EndOfSnapshot,
        }
    }
}

/// Record kinds, used in count-mismatch diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Utxo,
    GovernanceActionsDelta,
    TipUpdate,
    ParameterSet,
    EndOfSnapshot,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Utxo => "Utxo",
            RecordKind::GovernanceActionsDelta => "GovernanceActionsDelta",
            RecordKind::TipUpdate => "TipUpdate",
            RecordKind::ParameterSet => "ParameterSet",
            RecordKind::EndOfSnapshot => "EndOfSnapshot",
        };
        f.write_str(name)
    }
}
