//! batchtrace CLI: run lineage traces against a JSONL snapshot.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use batchtrace_core::config::TraceConfig;
use batchtrace_store::{audit_records, read_snapshot_path, MemoryEdgeStore, SnapshotRecord};
use batchtrace_service::{TraceRequest, TraceService};

#[derive(Parser)]
#[command(name = "batchtrace")]
#[command(about = "Batch lineage traces and mass balance for food-safety recalls", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace one batch forward (where did it go) or backward (what went into it)
    Trace {
        #[command(flatten)]
        target: TraceArgs,

        /// forward | backward
        #[arg(short, long)]
        direction: String,
    },

    /// Trace one batch in both directions concurrently
    Both {
        #[command(flatten)]
        target: TraceArgs,
    },

    /// Check write-side invariants over a snapshot
    Validate {
        /// Path to the JSONL snapshot
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct TraceArgs {
    /// Path to the JSONL snapshot
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Tenant UUID
    #[arg(short, long)]
    tenant: String,

    /// Root batch code (case-insensitive)
    #[arg(short, long)]
    code: String,

    /// Maximum hops from the root (overrides config)
    #[arg(long)]
    max_depth: Option<u32>,

    /// Maximum nodes in the graph (overrides config)
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Per-trace deadline in milliseconds (overrides config)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// YAML file with trace configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Variance tolerance in percent (overrides config)
    #[arg(long)]
    tolerance: Option<f64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// Optional overrides read from `--config`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    default_max_depth: Option<u32>,
    default_max_nodes: Option<usize>,
    max_depth_ceiling: Option<u32>,
    max_nodes_ceiling: Option<usize>,
    default_timeout_ms: Option<u64>,
    variance_tolerance_pct: Option<f64>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Trace { target, direction } => {
            if let Err(e) = run_trace(&target, &direction) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Both { target } => {
            if let Err(e) = run_both(&target) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { snapshot } => match validate_snapshot(&snapshot) {
            Ok(0) => println!("✓ Snapshot is valid"),
            Ok(n) => {
                eprintln!("Validation failed: {} violation(s)", n);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_trace(args: &TraceArgs, direction: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (service, request) = prepare(args, direction)?;
    let result = service.trace(&request)?;
    print_json(&result, args.pretty)
}

fn run_both(args: &TraceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (service, request) = prepare(args, "forward")?;
    let both = service.trace_both(&request)?;
    print_json(&both, args.pretty)
}

fn prepare(
    args: &TraceArgs,
    direction: &str,
) -> Result<(TraceService<MemoryEdgeStore>, TraceRequest), Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let store = load_store(&args.snapshot)?;
    let service = TraceService::new(store, config)?;
    let request = build_request(args, direction)?;
    Ok((service, request))
}

/// Env, then the YAML file, then flags.
fn load_config(args: &TraceArgs) -> Result<TraceConfig, Box<dyn std::error::Error>> {
    let mut config = TraceConfig::from_env();
    if let Some(path) = &args.config {
        let doc: ConfigFile = serde_yaml::from_str(&fs::read_to_string(path)?)?;
        apply_config_file(&mut config, &doc);
    }
    if let Some(tolerance) = args.tolerance {
        config.variance_tolerance_pct = Some(tolerance);
    }
    Ok(config)
}

fn apply_config_file(cfg: &mut TraceConfig, doc: &ConfigFile) {
    if let Some(v) = doc.default_max_depth {
        cfg.default_max_depth = v;
    }
    if let Some(v) = doc.default_max_nodes {
        cfg.default_max_nodes = v;
    }
    if let Some(v) = doc.max_depth_ceiling {
        cfg.max_depth_ceiling = v;
    }
    if let Some(v) = doc.max_nodes_ceiling {
        cfg.max_nodes_ceiling = v;
    }
    if let Some(v) = doc.default_timeout_ms {
        cfg.default_timeout_ms = Some(v);
    }
    if let Some(v) = doc.variance_tolerance_pct {
        cfg.variance_tolerance_pct = Some(v);
    }
}

fn build_request(args: &TraceArgs, direction: &str) -> Result<TraceRequest, Box<dyn std::error::Error>> {
    let mut request = TraceRequest::parse(&args.tenant, &args.code, direction)?;
    if let Some(depth) = args.max_depth {
        request = request.with_max_depth(depth);
    }
    if let Some(nodes) = args.max_nodes {
        request = request.with_max_nodes(nodes);
    }
    if let Some(ms) = args.timeout_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }
    Ok(request)
}

fn load_store(path: &Path) -> Result<MemoryEdgeStore, Box<dyn std::error::Error>> {
    let records = read_snapshot_path(path)?;
    let store = MemoryEdgeStore::from_records(records)?;
    tracing::info!(
        snapshot = %path.display(),
        batches = store.batch_count(),
        relations = store.relation_count(),
        "snapshot loaded"
    );
    Ok(store)
}

/// Print every violation; returns how many there were.
fn validate_snapshot(path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let records = read_snapshot_path(path)?;
    let batches = records
        .iter()
        .filter(|r| matches!(r, SnapshotRecord::Batch(_)))
        .count();
    let violations = audit_records(&records);
    println!(
        "Checked {} batches, {} relations",
        batches,
        records.len() - batches
    );
    for v in &violations {
        println!("  ✗ {}", v);
    }
    Ok(violations.len())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
