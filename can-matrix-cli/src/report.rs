//! Report output
//!
//! Logging of consistency reports, statistics tables, and JSON files.

use anyhow::{Context, Result};
use can_matrix_core::{extract, ConsistencyReport, NameDiff, Source, ValidationResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Log a consistency report in the checker's section layout
pub fn log_consistency(report: &ConsistencyReport) {
    log::info!("===CHECKING MESSAGES===");
    log_diff("messages", &report.messages);
    log::info!("===CHECKING SIGNALS===");
    log_diff("signals", &report.signals);

    if report.is_consistent() {
        log::info!("Sources are fully consistent");
    }
}

fn log_diff(what: &str, diff: &NameDiff) {
    log::info!(
        "tabular - dbc ({} only in tabular) = {}",
        what,
        format_set(&diff.only_in_tabular)
    );
    log::info!(
        "dbc - tabular ({} only in dbc) = {}",
        what,
        format_set(&diff.only_in_database)
    );
}

fn format_set(names: &BTreeSet<String>) -> String {
    if names.is_empty() {
        "{}".to_string()
    } else {
        let quoted: Vec<_> = names.iter().map(|n| format!("{:?}", n)).collect();
        format!("{{{}}}", quoted.join(", "))
    }
}

/// Per-source statistics as an aligned text table
pub fn stats_table(source: &Source) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<32} {:>8} {:>8} {:>6}", "Source", "Messages", "Signals", "ECUs");
    for (name, db) in source.databases() {
        let stats = db.stats();
        let _ = writeln!(
            out,
            "{:<32} {:>8} {:>8} {:>6}",
            name,
            stats.num_messages,
            stats.num_signals,
            extract::ecu_names(db).len()
        );
    }
    if source.len() > 1 {
        let total = source.stats();
        let _ = writeln!(
            out,
            "{:<32} {:>8} {:>8} {:>6}",
            "Total",
            total.num_messages,
            total.num_signals,
            extract::source_ecu_names(source).len()
        );
    }
    out
}

/// Message names of every source in file order, duplicates kept
pub fn message_listing(source: &Source) -> String {
    let mut out = String::new();
    for (name, db) in source.databases() {
        let _ = writeln!(out, "{}:", name);
        for message in extract::message_list(db) {
            let _ = writeln!(out, "  {}", message);
        }
    }
    out
}

/// Log every violation of a draft
pub fn log_violations(result: &ValidationResult) {
    for violation in result.iter() {
        log::warn!("Draft rejected: {}", violation);
    }
}

/// Write a value as pretty JSON, creating parent directories
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write file: {:?}", path))?;
    log::info!("Wrote {:?}", path);
    Ok(())
}

/// Timestamped snapshot name: `<stem>.bak_<YYYYmmdd_HHMMSS>.json`
pub fn snapshot_path(dir: &Path, stem: &str, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}.bak_{}.json", stem, now.format("%Y%m%d_%H%M%S")))
}
