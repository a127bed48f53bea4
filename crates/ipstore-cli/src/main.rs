//! Command-line interface for `ipstore`.
//!
//! Inspect and manipulate per-client records from the command line:
//! compute tokens, read and write keys, and prune or wipe buckets.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use ipstore::{
    sanitize, storage, Clock, IpStore, Lookup, PruneReport, StoreConfig, SystemClock, Value,
};

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Per-client key-value records with daily rotation.
#[derive(Parser, Debug)]
#[command(
    name = "ipstore",
    about = "ipstore CLI",
    version,
    long_about = "ipstore: per-client key-value store\n\nRead and write keys for a client identity, and prune or wipe\nthe dated buckets records are kept in."
)]
struct Cli {
    /// Storage root (default: $IPSTORE_LOCATION or db/ip)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the flat `undated` bucket instead of daily buckets
    #[arg(long, global = true)]
    no_rotation: bool,

    /// Raw client identity (IP address or any other string)
    #[arg(long, global = true)]
    identity: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the file token for a raw identity
    Token {
        /// Raw identity to sanitize
        raw: String,
    },

    /// Write a key (value is parsed as JSON, or stored as text if it is not JSON)
    Write {
        /// Key name
        key: String,
        /// Value as JSON, e.g. 42, "text", [1,2], {"a":true}
        value: String,
    },

    /// Read a key
    Read {
        /// Key name
        key: String,
    },

    /// Check whether a key is set
    Check {
        /// Key name
        key: String,
    },

    /// Check whether today's record exists
    Exists,

    /// Delete today's record
    Delete,

    /// Print the bucket directory and record file in use today
    Path,

    /// Remove every bucket except today's (no --identity needed)
    Prune,

    /// Remove every bucket (no --identity needed)
    Wipe,
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = match &cli.command {
        Commands::Token { raw } => cmd_token(raw, verbose),
        Commands::Write { key, value } => {
            open_store(&cli).and_then(|store| cmd_write(&store, key, value, verbose))
        }
        Commands::Read { key } => open_store(&cli).and_then(|store| cmd_read(&store, key)),
        Commands::Check { key } => open_store(&cli).and_then(|store| cmd_check(&store, key)),
        Commands::Exists => open_store(&cli).map(|store| println!("{}", store.file_exists())),
        Commands::Delete => open_store(&cli).and_then(|store| cmd_delete(&store, verbose)),
        Commands::Path => open_store(&cli).map(|store| cmd_path(&store)),
        Commands::Prune => load_config(&cli).and_then(|config| cmd_prune(&config, verbose)),
        Commands::Wipe => load_config(&cli).and_then(|config| cmd_wipe(&config, verbose)),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Setup helpers ─────────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let config = match &cli.config {
        Some(path) => StoreConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };

    let mut config = config
        .with_env_overrides()
        .context("invalid environment configuration")?;

    if let Some(root) = &cli.root {
        config = config.with_root(root);
    }
    if cli.no_rotation {
        config = config.with_rotation(false);
    }
    Ok(config)
}

fn open_store(cli: &Cli) -> Result<IpStore> {
    let config = load_config(cli)?;
    let identity = cli
        .identity
        .clone()
        .ok_or_else(|| anyhow!("--identity is required for this command"))?;
    log::debug!(
        "storage root {} (rotation: {})",
        config.root.display(),
        config.rotation
    );
    IpStore::open(config, identity).context("failed to open store")
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw))
}

// ── Command implementations ───────────────────────────────────────────────────

/// `ipstore token <raw>`
fn cmd_token(raw: &str, verbose: bool) -> Result<()> {
    let token = sanitize(raw);
    println!("{token}");
    if verbose {
        println!("  Raw:  {raw:?}");
    }
    Ok(())
}

/// `ipstore write <key> <value>`
fn cmd_write(store: &IpStore, key: &str, raw: &str, verbose: bool) -> Result<()> {
    let value = parse_value(raw);
    let kind = value.type_name();
    store
        .write_key(key, value)
        .with_context(|| format!("failed to write key '{key}'"))?;

    if verbose {
        println!("Wrote {kind} to '{key}'");
        println!("  File: {}", store.record_path().record_file.display());
    }
    Ok(())
}

/// `ipstore read <key>`
fn cmd_read(store: &IpStore, key: &str) -> Result<()> {
    match store
        .read_key(key)
        .with_context(|| format!("failed to read key '{key}'"))?
    {
        Lookup::Found(value) => {
            println!("{value}");
            Ok(())
        }
        Lookup::RecordMissing => Err(anyhow!("record not found")),
        Lookup::KeyMissing => Err(anyhow!("key not found")),
    }
}

/// `ipstore check <key>`
fn cmd_check(store: &IpStore, key: &str) -> Result<()> {
    let present = store
        .check_key(key)
        .with_context(|| format!("failed to check key '{key}'"))?;
    println!("{present}");
    Ok(())
}

/// `ipstore delete`
fn cmd_delete(store: &IpStore, verbose: bool) -> Result<()> {
    let path = store.record_path().record_file;
    if !store.delete_record() {
        return Err(anyhow!("failed to delete {}", path.display()));
    }
    if verbose {
        println!("Deleted {}", path.display());
    }
    Ok(())
}

/// `ipstore path`
fn cmd_path(store: &IpStore) {
    let paths = store.record_path();
    println!("Token:  {}", store.token());
    println!("Bucket: {}", paths.bucket_dir.display());
    println!("Record: {}", paths.record_file.display());
}

/// `ipstore prune`
fn cmd_prune(config: &StoreConfig, verbose: bool) -> Result<()> {
    let current = config
        .root
        .join(storage::bucket_name(config.rotation, SystemClock.today()));
    report_prune(storage::prune_stale(&config.root, &current), verbose)
}

/// `ipstore wipe`
fn cmd_wipe(config: &StoreConfig, verbose: bool) -> Result<()> {
    report_prune(storage::prune_all(&config.root), verbose)
}

/// Print a pruning summary; fail if anything was left behind.
fn report_prune(report: PruneReport, verbose: bool) -> Result<()> {
    println!("Removed {} bucket(s)", report.buckets_removed.len());
    if verbose {
        for bucket in &report.buckets_removed {
            println!("  {}", bucket.display());
        }
    }

    if report.is_clean() {
        return Ok(());
    }
    for failure in &report.failures {
        eprintln!("  could not remove {}: {}", failure.path.display(), failure.error);
    }
    Err(anyhow!(
        "{} path(s) could not be removed",
        report.failures.len()
    ))
}
