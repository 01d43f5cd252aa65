//! Invariant validation over a decoded record stream.
//!
//! One forward pass with running counters: declared counts must match
//! observed counts, governance deltas must sum to the declared total, and
//! exactly one `EndOfSnapshot` marker must close the stream. All count
//! mismatches are reported together rather than stopping at the first,
//! to maximize diagnostic value.

use crate::stream::SnapshotStream;
use telamon_common::{RecordKind, SnapshotRecord};
use thiserror::Error;
use tracing::{debug, warn};

/// Eras accepted when the caller supplies no policy of its own.
pub const DEFAULT_ALLOWED_ERAS: &[&str] = &["conway"];

/// Caller-supplied era allow-list.
#[derive(Debug, Clone)]
pub struct EraPolicy {
    allowed: Vec<String>,
}

impl EraPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, era: &str) -> bool {
        self.allowed.iter().any(|e| e == era)
    }

    /// Comma-separated list for diagnostics.
    pub fn describe(&self) -> String {
        self.allowed.join(", ")
    }
}

impl Default for EraPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_ERAS.iter().copied())
    }
}

/// One invariant violation found during validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("Era mismatch: expected one of [{allowed}], got {era}")]
    UnsupportedEra { era: String, allowed: String },

    // i128 so a declared u64 count and a signed delta sum both fit
    // without misreporting.
    #[error("Count mismatch for {kind}: declared {declared}, actual {actual}")]
    CountMismatch {
        kind: RecordKind,
        declared: i128,
        actual: i128,
    },

    #[error("governance delta sum overflowed i64")]
    GovernanceDeltaOverflow,

    #[error("missing EndOfSnapshot marker")]
    MissingEndMarker,

    #[error("duplicate EndOfSnapshot marker")]
    DuplicateEndMarker,

    #[error("trailing records after EndOfSnapshot marker")]
    TrailingDataAfterEnd,

    #[error("record decode failed: {0}")]
    RecordDecode(String),
}

/// Outcome of one validation pass, with the counters it observed.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub era: String,
    pub utxos_seen: u64,
    pub gov_delta_sum: i64,
    pub param_sets_seen: u64,
    pub tip_updates_seen: u64,
    pub end_seen: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn new(era: String) -> Self {
        Self {
            era,
            utxos_seen: 0,
            gov_delta_sum: 0,
            param_sets_seen: 0,
            tip_updates_seen: 0,
            end_seen: false,
            issues: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate the record stream against its header declarations.
///
/// The era gate runs first: an era outside the allow-list fails before
/// any record is read. A duplicate end marker or a decode failure aborts
/// the pass; every other issue is collected so one run reports all of
/// them.
pub fn validate_stream(stream: &mut SnapshotStream, policy: &EraPolicy) -> ValidationReport {
    let header = stream.header().clone();
    let mut report = ValidationReport::new(header.era.clone());

    if !policy.allows(&header.era) {
        report.issues.push(ValidationIssue::UnsupportedEra {
            era: header.era.clone(),
            allowed: policy.describe(),
        });
        warn!(era = %header.era, "snapshot era not in allow-list");
        return report;
    }

    let mut trailing_reported = false;
    let mut aborted = false;
    let mut delta_overflowed = false;

    loop {
        match stream.next_record() {
            Ok(Some(record)) => {
                if report.end_seen {
                    if record == SnapshotRecord::EndOfSnapshot {
                        report.issues.push(ValidationIssue::DuplicateEndMarker);
                        aborted = true;
                        break;
                    }
                    if !trailing_reported {
                        report.issues.push(ValidationIssue::TrailingDataAfterEnd);
                        trailing_reported = true;
                    }
                    continue;
                }
                match record {
                    SnapshotRecord::Utxo(_) => report.utxos_seen += 1,
                    SnapshotRecord::GovernanceActionsDelta(delta) => {
                        match report.gov_delta_sum.checked_add(delta) {
                            Some(sum) => report.gov_delta_sum = sum,
                            None => {
                                if !delta_overflowed {
                                    report
                                        .issues
                                        .push(ValidationIssue::GovernanceDeltaOverflow);
                                    delta_overflowed = true;
                                }
                                report.gov_delta_sum =
                                    report.gov_delta_sum.saturating_add(delta);
                            }
                        }
                    }
                    SnapshotRecord::ParameterSet(_) => report.param_sets_seen += 1,
                    SnapshotRecord::TipUpdate { .. } => report.tip_updates_seen += 1,
                    SnapshotRecord::EndOfSnapshot => report.end_seen = true,
                }
            }
            Ok(None) => break,
            Err(e) => {
                report
                    .issues
                    .push(ValidationIssue::RecordDecode(e.to_string()));
                aborted = true;
                break;
            }
        }
    }

    if !report.end_seen && !aborted {
        report.issues.push(ValidationIssue::MissingEndMarker);
    }

    // Counter comparison only makes sense for a stream that terminated
    // cleanly with its end marker.
    if report.end_seen && !aborted {
        let utxos_seen = report.utxos_seen as i128;
        let gov_delta_sum = report.gov_delta_sum as i128;
        let param_sets_seen = report.param_sets_seen as i128;
        check_count(
            &mut report,
            RecordKind::Utxo,
            header.declared_utxo_count as i128,
            utxos_seen,
        );
        // A saturated sum is not comparable; the overflow issue already
        // covers it.
        if !delta_overflowed {
            check_count(
                &mut report,
                RecordKind::GovernanceActionsDelta,
                header.declared_gov_action_count as i128,
                gov_delta_sum,
            );
        }
        check_count(
            &mut report,
            RecordKind::ParameterSet,
            header.declared_param_set_count as i128,
            param_sets_seen,
        );
    }

    debug!(
        utxos = report.utxos_seen,
        gov_delta_sum = report.gov_delta_sum,
        param_sets = report.param_sets_seen,
        issues = report.issues.len(),
        "validation pass complete"
    );

    report
}

fn check_count(report: &mut ValidationReport, kind: RecordKind, declared: i128, actual: i128) {
    if declared != actual {
        report.issues.push(ValidationIssue::CountMismatch {
            kind,
            declared,
            actual,
        });
    }
}
