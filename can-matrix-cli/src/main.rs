//! CAN Matrix CLI Application
//!
//! Command-line front end for the can-matrix-core library. It owns all file
//! I/O and logging and adds:
//! - Consistency checks between the tabular matrix and DBC files
//! - Graph model export as JSON for an external renderer
//! - Statistics and signal detail listings
//! - Draft message validation and append

use anyhow::{bail, Context, Result};
use can_matrix_core::{
    consistency, draft, extract, graph, DraftMessage, Level, Source, TabularDataset,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod config;
mod report;

use config::AppConfig;

/// CAN Matrix - Reconcile and visualize CAN communication matrices
#[derive(Parser, Debug)]
#[command(name = "can-matrix-cli")]
#[command(about = "Reconcile CAN matrices (tabular vs. DBC) and build network graphs", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to DBC file(s) (can be repeated)
    #[arg(long, value_name = "FILE", global = true)]
    dbc: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare the tabular matrix against the DBC file(s)
    Check {
        /// Matrix sheet exported as JSON
        #[arg(short, long, value_name = "FILE")]
        tabular: Option<PathBuf>,
    },

    /// Build the network graph model and write it as JSON
    Graph {
        /// Output file (default: <output_dir>/graph.json)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Link messages present in every loaded DBC file
        #[arg(long)]
        highlight_common: bool,
    },

    /// Show message, signal and ECU counts per DBC file
    Stats,

    /// List message names per DBC file in file order
    Messages,

    /// Write per-message signal details as JSON
    Signals {
        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Validate a draft message (TOML) and append it to the loaded DBC files
    AddMessage {
        /// Draft message definition
        #[arg(long, value_name = "FILE")]
        draft: PathBuf,

        /// Only validate, never append
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Matrix CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using core library v{}", can_matrix_core::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    config.merge_dbc_files(&args.dbc);

    match &args.command {
        Command::Check { tabular } => {
            config.merge_tabular_file(tabular.as_ref());
            run_check(&config)
        }
        Command::Graph {
            output,
            highlight_common,
        } => {
            if *highlight_common {
                config.graph.highlight_common = true;
            }
            run_graph(&config, output.as_deref())
        }
        Command::Stats => run_stats(&config),
        Command::Messages => run_messages(&config),
        Command::Signals { output } => run_signals(&config, output.as_deref()),
        Command::AddMessage { draft, dry_run } => run_add_message(&config, draft, *dry_run),
    }
}

/// Load every configured DBC file
fn load_source(config: &AppConfig) -> Result<Source> {
    if config.input.dbc_files.is_empty() {
        bail!("No DBC file given (use --dbc or [input] dbc_files)");
    }
    Source::load(config.input.dbc_files.as_slice()).context("Failed to load DBC files")
}

fn run_check(config: &AppConfig) -> Result<()> {
    let tabular_path = config
        .input
        .tabular_file
        .as_ref()
        .context("No tabular file given (use --tabular or [input] tabular_file)")?;

    let dataset = TabularDataset::load_json(tabular_path, &config.tabular)
        .with_context(|| format!("Failed to load tabular file: {:?}", tabular_path))?;
    let source = load_source(config)?;

    let mut consistent = true;
    for (name, db) in source.databases() {
        log::info!("Comparing {:?} with {:?}", tabular_path, name);
        let report = consistency::compare(&dataset, db, &config.tabular)
            .with_context(|| format!("Failed to read names from {:?}", tabular_path))?;
        report::log_consistency(&report);
        consistent &= report.is_consistent();
    }

    println!("{}", if consistent { "consistent" } else { "differences found" });
    Ok(())
}

fn run_graph(config: &AppConfig, output: Option<&Path>) -> Result<()> {
    let source = load_source(config)?;
    let model = graph::build(&source, &config.graph);

    log::info!(
        "Graph model: {} networks, {} messages, {} signals, {} edges ({} common-message links)",
        model.nodes_at(Level::Network).count(),
        model.nodes_at(Level::Message).count(),
        model.nodes_at(Level::Signal).count(),
        model.edges.len(),
        model.common_edges().count()
    );

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.graph_path());
    report::write_json(&path, &model)
}

fn run_stats(config: &AppConfig) -> Result<()> {
    let source = load_source(config)?;
    print!("{}", report::stats_table(&source));
    Ok(())
}

fn run_messages(config: &AppConfig) -> Result<()> {
    let source = load_source(config)?;
    print!("{}", report::message_listing(&source));
    Ok(())
}

fn run_signals(config: &AppConfig, output: Option<&Path>) -> Result<()> {
    let source = load_source(config)?;
    let detail = extract::source_signal_detail(&source);

    match output {
        Some(path) => report::write_json(path, &detail),
        None => {
            println!("{}", serde_json::to_string_pretty(&detail)?);
            Ok(())
        }
    }
}

fn run_add_message(config: &AppConfig, draft_path: &Path, dry_run: bool) -> Result<()> {
    let content = std::fs::read_to_string(draft_path)
        .with_context(|| format!("Failed to read draft file: {:?}", draft_path))?;
    let draft_message: DraftMessage = toml::from_str(&content)
        .with_context(|| format!("Failed to parse draft file: {:?}", draft_path))?;

    let mut source = load_source(config)?;

    if dry_run {
        let result = draft::validate(
            &extract::source_message_names(&source),
            &extract::source_ecu_names(&source),
            &draft_message,
        );
        report::log_violations(&result);
        println!("{}", if result.is_valid() { "valid" } else { "invalid" });
        return Ok(());
    }

    let result = draft::append_if_valid(&mut source, &draft_message);
    if !result.is_valid() {
        report::log_violations(&result);
        bail!(
            "Draft {:?} has {} violation(s)",
            draft_message.name,
            result.violations.len()
        );
    }

    log::info!("Appended message {:?}", draft_message.name);

    // the loaded files are never overwritten; write a timestamped snapshot per source
    let now = chrono::Local::now();
    for (name, db) in source.databases() {
        let stem = can_matrix_core::network::strip_extension(name);
        let path = report::snapshot_path(&config.output.output_dir, stem, now);
        report::write_json(&path, db)?;
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
