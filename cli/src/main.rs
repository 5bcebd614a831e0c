//! AuditChain operator CLI.
//!
//! Records operations into a ledger, queries its audit trail, checks chain
//! integrity and produces or re-verifies auditor exports. Results are printed
//! to stdout as JSON; logs go to stderr.
//!
//! Usage:
//!   auditchain --store var/audit.jsonl log --entity-type document --entity-id 12 --operation create
//!   auditchain --config config/ledger.toml trail --entity-type document --limit 20
//!   auditchain --config config/ledger.toml verify
//!   auditchain --config config/ledger.toml export --output audit-export.json
//!   auditchain verify-export audit-export.json

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auditchain_chain::{export::ExportFormat, verify_export};
use auditchain_contracts::{
    entry::{Actor, ComplianceLevel, RequestContext},
    error::{LedgerError, LedgerResult},
    query::{EntryLookup, TrailFilter},
};
use auditchain_core::OperationBuilder;
use auditchain_ledger::{Ledger, LedgerConfig, LogOutcome};

// ── CLI definition ────────────────────────────────────────────────────────────

/// AuditChain: tamper-evident audit ledger.
#[derive(Parser)]
#[command(
    name = "auditchain",
    about = "Tamper-evident, hash-chained audit ledger",
    long_about = "Records audited operations into an append-only SHA-256 hash chain,\n\
                  queries the trail, verifies integrity and exports evidence for auditors."
)]
struct Cli {
    /// Ledger configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSONL store path; overrides `[store].path` from the config.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record one operation.
    Log(LogArgs),
    /// List matching entries, newest first.
    Trail(TrailArgs),
    /// Verify the whole chain; exits non-zero when it is broken.
    Verify,
    /// Print chain length, tail hash and integrity status.
    Info,
    /// Print one entry and check it in place.
    Show(ShowArgs),
    /// Export the chain, or the entries within a period, as JSON.
    Export(ExportArgs),
    /// Re-verify an export file without access to the store.
    VerifyExport {
        /// Path of the export document.
        file: PathBuf,
    },
    /// Merkle root over the chain, or over the entries within a period.
    MerkleRoot(RangeArgs),
}

#[derive(Args)]
struct LogArgs {
    #[arg(long)]
    entity_type: String,
    #[arg(long)]
    entity_id: String,
    #[arg(long)]
    operation: String,
    #[arg(long)]
    entity_code: Option<String>,

    /// Acting user id. Without it the operation is attributed to the system.
    #[arg(long, requires = "actor_name")]
    actor_id: Option<u64>,
    #[arg(long)]
    actor_name: Option<String>,
    #[arg(long, default_value = "user")]
    actor_role: String,

    /// Operation details as a JSON document.
    #[arg(long, value_parser = parse_json)]
    details: Option<Value>,
    #[arg(long = "old", value_parser = parse_json)]
    old_values: Option<Value>,
    #[arg(long = "new", value_parser = parse_json)]
    new_values: Option<Value>,

    #[arg(long, default_value = "standard")]
    compliance: ComplianceLevel,
    #[arg(long)]
    retention_days: Option<u32>,

    #[arg(long)]
    origin: Option<String>,
    #[arg(long)]
    client: Option<String>,
    #[arg(long)]
    session: Option<String>,
}

#[derive(Args)]
struct TrailArgs {
    #[arg(long)]
    entity_type: Option<String>,
    #[arg(long)]
    entity_id: Option<String>,
    #[arg(long)]
    actor_id: Option<u64>,
    /// Inclusive lower bound (RFC 3339).
    #[arg(long)]
    start: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339).
    #[arg(long)]
    end: Option<DateTime<Utc>>,
    #[arg(long, default_value_t = 0)]
    offset: usize,
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct ShowArgs {
    /// Sequence number of the entry.
    #[arg(long, conflicts_with_all = ["entity_type", "entity_id"])]
    sequence: Option<u64>,
    #[arg(long, requires = "entity_id")]
    entity_type: Option<String>,
    #[arg(long, requires = "entity_type")]
    entity_id: Option<String>,
    /// Narrow an entity lookup to one operation.
    #[arg(long, requires = "entity_type")]
    operation: Option<String>,
}

#[derive(Args)]
struct RangeArgs {
    /// Inclusive lower bound (RFC 3339); requires --end.
    #[arg(long, requires = "end")]
    start: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339); requires --start.
    #[arg(long, requires = "start")]
    end: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    range: RangeArgs,
    #[arg(long, default_value = "json")]
    format: ExportFormat,
    /// Write the document here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("not valid JSON: {e}"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-entry output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("auditchain: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> LedgerResult<()> {
    // verify-export works on a file alone; no ledger is opened.
    if let Command::VerifyExport { file } = &cli.command {
        return run_verify_export(file);
    }

    let ledger = open_ledger(cli.config, cli.store)?;
    match cli.command {
        Command::Log(args) => run_log(&ledger, args),
        Command::Trail(args) => run_trail(&ledger, args),
        Command::Verify => run_verify(&ledger),
        Command::Info => print_json(&ledger.info()?),
        Command::Show(args) => run_show(&ledger, args),
        Command::Export(args) => run_export(&ledger, args),
        Command::MerkleRoot(range) => run_merkle_root(&ledger, range),
        Command::VerifyExport { .. } => Ok(()),
    }
}

fn open_ledger(config: Option<PathBuf>, store: Option<PathBuf>) -> LedgerResult<Ledger> {
    let mut config = match config {
        Some(path) => LedgerConfig::from_file(&path)?,
        None => LedgerConfig::default(),
    };
    if let Some(path) = store {
        config.store.path = Some(path);
    }
    if config.store.path.is_none() {
        warn!("no store configured; using an in-memory chain that is discarded on exit");
    }
    Ledger::open(config)
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_log(ledger: &Ledger, args: LogArgs) -> LedgerResult<()> {
    let actor = match (args.actor_id, args.actor_name) {
        (Some(id), Some(name)) => Actor::new(id, name, args.actor_role),
        _ => Actor::system(),
    };

    let mut builder = OperationBuilder::new(args.entity_type, args.entity_id, args.operation)
        .actor(actor)
        .context(RequestContext {
            origin: args.origin,
            client: args.client,
            session: args.session,
        })
        .compliance_level(args.compliance)
        .retention_days(args.retention_days);
    if let Some(code) = args.entity_code {
        builder = builder.entity_code(code);
    }
    if let Some(details) = args.details {
        builder = builder.details(details);
    }
    if let Some(old) = args.old_values {
        builder = builder.old_values(old);
    }
    if let Some(new) = args.new_values {
        builder = builder.new_values(new);
    }

    match ledger.log(builder)? {
        LogOutcome::Logged(entry) => print_json(&entry),
        LogOutcome::Failed { reason } => Err(LedgerError::Persistence { reason }),
    }
}

fn run_trail(ledger: &Ledger, args: TrailArgs) -> LedgerResult<()> {
    let filter = TrailFilter {
        entity_type: args.entity_type,
        entity_id: args.entity_id,
        actor_id: args.actor_id,
        start: args.start,
        end: args.end,
        offset: args.offset,
        limit: args.limit,
    };
    print_json(&ledger.query_trail(&filter)?)
}

fn run_verify(ledger: &Ledger) -> LedgerResult<()> {
    let report = ledger.verify_integrity()?;
    print_json(&report)?;
    report.into_result().map(|_| ())
}

fn run_show(ledger: &Ledger, args: ShowArgs) -> LedgerResult<()> {
    let lookup = match (args.sequence, args.entity_type, args.entity_id) {
        (Some(sequence), _, _) => EntryLookup::Sequence(sequence),
        (None, Some(entity_type), Some(entity_id)) => EntryLookup::Entity {
            entity_type,
            entity_id,
            operation: args.operation,
        },
        _ => {
            return Err(LedgerError::InvalidQuery {
                reason: "pass --sequence, or --entity-type with --entity-id".to_string(),
            })
        }
    };

    let Some(entry) = ledger.entry_at(&lookup) else {
        return Err(LedgerError::InvalidQuery {
            reason: format!("no entry matches {:?}", lookup),
        });
    };
    let verification = ledger.verify_entry(&EntryLookup::Sequence(entry.sequence_number))?;
    print_json(&serde_json::json!({
        "entry": entry,
        "verification": verification,
    }))
}

fn run_export(ledger: &Ledger, args: ExportArgs) -> LedgerResult<()> {
    let bytes = match (args.range.start, args.range.end) {
        (Some(start), Some(end)) => ledger.export_range(start, end, args.format)?,
        _ => ledger.export_chain(args.format)?,
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, &bytes).map_err(|e| LedgerError::Persistence {
                reason: format!("failed to write export to '{}': {}", path.display(), e),
            })?;
            info!(path = %path.display(), bytes = bytes.len(), "export written");
            Ok(())
        }
        None => {
            println!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
    }
}

fn run_verify_export(file: &Path) -> LedgerResult<()> {
    let bytes = std::fs::read(file).map_err(|e| LedgerError::Persistence {
        reason: format!("failed to read export '{}': {}", file.display(), e),
    })?;
    let verification = verify_export(&bytes)?;
    print_json(&verification)?;

    if verification.is_valid() {
        return Ok(());
    }
    let reason = if !verification.chain.is_valid {
        verification.chain.message.clone()
    } else if !verification.entry_count_matches {
        "entry_count does not match the exported chain".to_string()
    } else {
        "merkle_root does not match the exported chain".to_string()
    };
    Err(LedgerError::IntegrityViolation {
        sequence: verification.chain.failed_sequence.unwrap_or_default(),
        reason,
    })
}

fn run_merkle_root(ledger: &Ledger, range: RangeArgs) -> LedgerResult<()> {
    let entries = match (range.start, range.end) {
        (Some(start), Some(end)) => ledger.entries_between(start, end)?,
        _ => ledger.engine().snapshot(),
    };
    print_json(&serde_json::json!({
        "entry_count": entries.len(),
        "merkle_root": ledger.merkle_root(&entries),
    }))
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_json<T: serde::Serialize>(value: &T) -> LedgerResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| LedgerError::Serialization {
        reason: format!("failed to encode output: {e}"),
    })?;
    println!("{}", text);
    Ok(())
}
