//! Cross-source consistency checking
//!
//! Compares the tabular specification against a compiled database by name.
//! Signal names are compared globally, not per message. Differences are
//! informational; an empty report means the sources agree.

use crate::config::TabularLayout;
use crate::extract;
use crate::network::NetworkDatabase;
use crate::tabular::TabularDataset;
use crate::types::{Result, NAN_SENTINEL};
use serde::Serialize;
use std::collections::BTreeSet;

/// Names present in only one of the two sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameDiff {
    pub only_in_tabular: BTreeSet<String>,
    pub only_in_database: BTreeSet<String>,
}

impl NameDiff {
    pub fn is_empty(&self) -> bool {
        self.only_in_tabular.is_empty() && self.only_in_database.is_empty()
    }
}

/// Message-level and signal-level differences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub messages: NameDiff,
    pub signals: NameDiff,
}

impl ConsistencyReport {
    /// True when both sources name exactly the same messages and signals
    pub fn is_consistent(&self) -> bool {
        self.messages.is_empty() && self.signals.is_empty()
    }
}

/// Set difference in both directions, ignoring the `"nan"` sentinel
pub fn compare_names(tabular: &BTreeSet<String>, database: &BTreeSet<String>) -> NameDiff {
    let keep = |name: &&String| name.as_str() != NAN_SENTINEL;
    NameDiff {
        only_in_tabular: tabular.difference(database).filter(keep).cloned().collect(),
        only_in_database: database.difference(tabular).filter(keep).cloned().collect(),
    }
}

/// Compare the tabular specification with one compiled database
///
/// Fails only when a required column is missing from the tabular source.
pub fn compare(
    tabular: &TabularDataset,
    database: &NetworkDatabase,
    layout: &TabularLayout,
) -> Result<ConsistencyReport> {
    let tabular_messages = extract::tabular_message_names(tabular, layout)?;
    let tabular_signals = extract::tabular_signal_names(tabular, layout)?;

    Ok(ConsistencyReport {
        messages: compare_names(&tabular_messages, &extract::message_names(database)),
        signals: compare_names(&tabular_signals, &extract::signal_names(database)),
    })
}
