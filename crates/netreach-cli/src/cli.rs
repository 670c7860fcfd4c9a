//! Command-line interface for the netreach utility
//!
//! Derives reachability facts from topology documents and syncs them into a
//! file-backed snapshot store.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::debug;

use netreach::core::logging::init_logging;
use netreach::{
    derive_edges, find_scope, parse_topology, FileBackend, ScopeMetrics, ScopeSpec, SnapshotStore,
    SyncCoordinator, SyncOptions, SyncOutcome, Topology, BUILTIN_SCOPES,
};

/// Default directory for the file-backed store
pub const DEFAULT_STORE_DIR: &str = ".netreach";

/// Netreach - derive and sync network reachability facts
#[derive(Parser)]
#[command(name = "netreach")]
#[command(about = "Derive reachability facts from network topologies and keep them in a shared snapshot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the snapshot store (default: $NETREACH_STORE or .netreach)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Derive the edge set of a scope from a topology document
    Derive {
        /// Topology JSON file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Scope to evaluate
        #[arg(short, long, default_value = "home")]
        scope: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Derive a scope's edges and merge them into the store
    Sync {
        /// Topology JSON file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Scope to sync
        #[arg(short, long, default_value = "home")]
        scope: String,

        /// Replace stored facts instead of merging (use after deletions)
        #[arg(long)]
        destructive: bool,

        /// Write even if nothing changed
        #[arg(long)]
        force: bool,

        /// Reason recorded with the sync
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show readiness per scope
    Summary {
        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the stored snapshot
    Show,

    /// Remove the stored snapshot
    Clear,

    /// List built-in scopes and their facts
    Scopes {
        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct FactListing {
    name: &'static str,
    required: bool,
}

#[derive(Serialize)]
struct ScopeListing {
    name: &'static str,
    facts: Vec<FactListing>,
    status: bool,
}

impl From<&ScopeSpec> for ScopeListing {
    fn from(spec: &ScopeSpec) -> Self {
        Self {
            name: spec.name,
            facts: spec
                .rules
                .iter()
                .map(|r| FactListing {
                    name: r.name,
                    required: r.required,
                })
                .collect(),
            status: spec.status.is_some(),
        }
    }
}

/// Main CLI application
pub struct NetreachApp {
    store_dir: PathBuf,
}

impl NetreachApp {
    /// Create an application using the default store location
    pub fn new() -> Self {
        Self::with_store_dir(DEFAULT_STORE_DIR)
    }

    /// Create an application using an explicit store directory
    pub fn with_store_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: dir.into(),
        }
    }

    fn open_store(&self) -> SnapshotStore<FileBackend> {
        SnapshotStore::new(FileBackend::new(&self.store_dir))
    }

    fn scope(name: &str) -> Result<&'static ScopeSpec> {
        find_scope(BUILTIN_SCOPES, name).ok_or_else(|| {
            let known: Vec<&str> = BUILTIN_SCOPES.iter().map(|s| s.name).collect();
            anyhow!("Unknown scope '{}' (expected one of: {})", name, known.join(", "))
        })
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over CLI flags
        let log_level_str = std::env::var("NETREACH_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("NETREACH_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if let Some(dir) = cli
            .store
            .or_else(|| std::env::var_os("NETREACH_STORE").map(PathBuf::from))
        {
            self.store_dir = dir;
        }

        if cli.verbose {
            eprintln!("Netreach v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("Store: {}", self.store_dir.display());
        }
        debug!(store = %self.store_dir.display(), "Dispatching command");

        match cli.command {
            Commands::Derive { input, scope, json } => {
                self.derive_command(input, &scope, json, cli.verbose)
            }
            Commands::Sync {
                input,
                scope,
                destructive,
                force,
                reason,
            } => self.sync_command(input, &scope, destructive, force, reason, cli.verbose),
            Commands::Summary { json } => self.summary_command(json),
            Commands::Show => self.show_command(),
            Commands::Clear => self.clear_command(cli.verbose),
            Commands::Scopes { json } => self.scopes_command(json),
        }
    }

    fn load_topology(&self, input: Option<PathBuf>, verbose: bool) -> Result<Topology> {
        let content = self.read_input(input)?;
        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }
        parse_topology(&content).context("Failed to parse topology document")
    }

    /// Handle the derive command
    fn derive_command(
        &self,
        input: Option<PathBuf>,
        scope: &str,
        json: bool,
        verbose: bool,
    ) -> Result<()> {
        let spec = Self::scope(scope)?;
        let topology = self.load_topology(input, verbose)?;
        let edges = derive_edges(&topology, spec.rules);

        if json {
            println!("{}", serde_json::to_string_pretty(&edges)?);
        } else {
            for rule in spec.rules {
                let mark = if edges.get(rule.name) { "✓" } else { "✗" };
                let optional = if rule.required { "" } else { " (optional)" };
                println!("{} {}{}", mark, rule.name, optional);
            }
            println!();
            println!(
                "{}: {}",
                spec.summary_key(),
                if spec.is_ready(&edges) { "yes" } else { "no" }
            );
        }
        Ok(())
    }

    /// Handle the sync command
    fn sync_command(
        &self,
        input: Option<PathBuf>,
        scope: &str,
        destructive: bool,
        force: bool,
        reason: Option<String>,
        verbose: bool,
    ) -> Result<()> {
        let spec = Self::scope(scope)?;
        let topology = self.load_topology(input, verbose)?;
        let edges = derive_edges(&topology, spec.rules);

        let mut options = SyncOptions::new()
            .destructive(destructive)
            .force(force)
            .metrics(ScopeMetrics::from_topology(&topology));
        options.reason = Some(reason.unwrap_or_else(|| "cli".to_string()));

        let mut coordinator = SyncCoordinator::new(self.open_store());
        let outcome = coordinator
            .sync_edges(spec.name, &edges, options)
            .with_context(|| format!("Failed to sync scope '{}'", spec.name))?;

        match outcome {
            SyncOutcome::Written { edges, ready } => {
                println!(
                    "Synced {} ({} of {} facts true, {}: {})",
                    spec.name,
                    edges.true_count(),
                    edges.len(),
                    spec.summary_key(),
                    if ready { "yes" } else { "no" }
                );
            }
            SyncOutcome::Unchanged => println!("{} unchanged", spec.name),
        }
        Ok(())
    }

    /// Handle the summary command
    fn summary_command(&self, json: bool) -> Result<()> {
        let summary = self.open_store().read_summary();
        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            for (scope, ready) in &summary {
                println!("{:<10} {}", scope, if *ready { "ready" } else { "not ready" });
            }
        }
        Ok(())
    }

    /// Handle the show command
    fn show_command(&self) -> Result<()> {
        match self.open_store().get() {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            None => println!("No snapshot"),
        }
        Ok(())
    }

    /// Handle the clear command
    fn clear_command(&self, verbose: bool) -> Result<()> {
        self.open_store().clear().context("Failed to clear snapshot")?;
        if verbose {
            eprintln!("Snapshot cleared");
        }
        Ok(())
    }

    /// Handle the scopes command
    fn scopes_command(&self, json: bool) -> Result<()> {
        if json {
            let listing: Vec<ScopeListing> = BUILTIN_SCOPES.iter().map(ScopeListing::from).collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        } else {
            println!("Built-in scopes:");
            for spec in BUILTIN_SCOPES {
                let facts: Vec<String> = spec
                    .rules
                    .iter()
                    .map(|r| {
                        if r.required {
                            r.name.to_string()
                        } else {
                            format!("{}?", r.name)
                        }
                    })
                    .collect();
                println!("  {:<10} {}", spec.name, facts.join(", "));
            }
        }
        Ok(())
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }
}

impl Default for NetreachApp {
    fn default() -> Self {
        Self::new()
    }
}
