//! CLI wrapper for snapshot validation and manifest generation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use telamon_snapshot::{
    build_manifest, parse_manifest, validate_era, validate_integrity, validate_stream, EraPolicy,
    ManifestOverrides, Provenance, SnapshotStream,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "snapshot-cli")]
#[command(about = "Validate chain-state snapshots and generate integrity manifests")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Structurally validate a snapshot stream against its header
    Validate {
        /// Path to the snapshot .cbor file
        snapshot: PathBuf,

        /// Allowed era (repeatable); defaults to conway
        #[arg(long = "era")]
        eras: Vec<String>,
    },

    /// Build an integrity manifest for a snapshot file
    Manifest {
        /// Path to the snapshot .cbor file
        snapshot: PathBuf,

        /// Era for unknown formats (fallback path only)
        #[arg(long)]
        era: Option<String>,

        /// Hex block header hash; derived from the filename when possible
        #[arg(long)]
        block_hash: Option<String>,

        /// Block height (or slot); derived from the filename when possible
        #[arg(long)]
        block_height: Option<u64>,

        /// Run full stream validation and mark the manifest accordingly
        #[arg(long)]
        validate: bool,

        /// Write the manifest to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a snapshot file against an existing manifest
    Verify {
        /// Path to the snapshot .cbor file
        snapshot: PathBuf,

        /// Path to the manifest .json file
        #[arg(long)]
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Validate { snapshot, eras } => cmd_validate(&snapshot, &eras),
        Command::Manifest {
            snapshot,
            era,
            block_hash,
            block_height,
            validate,
            output,
        } => cmd_manifest(&snapshot, era, block_hash, block_height, validate, output),
        Command::Verify { snapshot, manifest } => cmd_verify(&snapshot, &manifest),
    }
}

fn era_policy(eras: &[String]) -> EraPolicy {
    if eras.is_empty() {
        EraPolicy::default()
    } else {
        EraPolicy::new(eras.iter().cloned())
    }
}

fn cmd_validate(snapshot: &Path, eras: &[String]) -> Result<()> {
    let mut stream = SnapshotStream::open(snapshot)
        .with_context(|| format!("failed to open snapshot {}", snapshot.display()))?;

    let report = validate_stream(&mut stream, &era_policy(eras));
    info!(
        utxos = report.utxos_seen,
        gov_delta_sum = report.gov_delta_sum,
        param_sets = report.param_sets_seen,
        tip_updates = report.tip_updates_seen,
        "scanned record stream"
    );

    if report.is_valid() {
        info!("snapshot is valid");
        return Ok(());
    }
    for issue in &report.issues {
        error!("{issue}");
    }
    bail!("snapshot failed validation with {} issue(s)", report.issues.len());
}

fn cmd_manifest(
    snapshot: &Path,
    era: Option<String>,
    block_hash: Option<String>,
    block_height: Option<u64>,
    validate: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let overrides = ManifestOverrides {
        era,
        block_hash,
        block_height,
    };
    let mut manifest = build_manifest(snapshot, &overrides)
        .with_context(|| format!("failed to build manifest for {}", snapshot.display()))?;

    if validate {
        // Full validation only applies when the header decoded at all.
        if manifest.provenance == Provenance::HeaderOnly {
            let mut stream = SnapshotStream::open(snapshot)?;
            let report = validate_stream(&mut stream, &EraPolicy::new([manifest.era.clone()]));
            if !report.is_valid() {
                for issue in &report.issues {
                    error!("{issue}");
                }
                bail!(
                    "snapshot failed validation with {} issue(s)",
                    report.issues.len()
                );
            }
            manifest.mark_fully_validated();
        } else {
            bail!("cannot fully validate: snapshot was routed to the fallback path");
        }
    }

    let json = serde_json::to_string_pretty(&manifest)?;
    match output {
        Some(path) => {
            fs::write(&path, &json)
                .with_context(|| format!("failed to write manifest to {}", path.display()))?;
            info!("wrote manifest to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_verify(snapshot: &Path, manifest_path: &Path) -> Result<()> {
    let manifest = parse_manifest(manifest_path)
        .with_context(|| format!("failed to parse manifest {}", manifest_path.display()))?;

    validate_era(&manifest, &EraPolicy::default())?;
    validate_integrity(snapshot, &manifest)?;

    info!(
        sha256 = %manifest.sha256,
        size_bytes = manifest.size_bytes,
        "snapshot matches manifest"
    );
    Ok(())
}
