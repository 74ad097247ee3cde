//! Record extraction
//!
//! Pure projections of loaded sources into name sets and display records.
//! The `"nan"` sentinel never survives into a name set.

use crate::config::TabularLayout;
use crate::format::{format_choices, format_comment, format_names, format_optional};
use crate::network::{Message, NetworkDatabase, Signal};
use crate::source::Source;
use crate::tabular::TabularDataset;
use crate::types::{Result, NAN_SENTINEL};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Human-readable projection of one signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRecord {
    pub name: String,
    pub start_bit: u32,
    /// Length with unit, e.g. `"16 bit"`
    pub length: String,
    pub scale: f64,
    pub offset: f64,
    pub unit: String,
    pub is_signed: bool,
    pub receivers: String,
    pub byte_order: String,
    pub max: String,
    pub min: String,
    /// Raw initial value, `0` when absent
    pub init: String,
    pub invalid: String,
    pub choices: String,
    pub description: String,
}

impl SignalRecord {
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            name: signal.name.clone(),
            start_bit: signal.start_bit,
            length: format!("{} bit", signal.length),
            scale: signal.scale,
            offset: signal.offset,
            unit: signal.unit.clone(),
            is_signed: signal.is_signed,
            receivers: format_names(&signal.receivers),
            byte_order: signal.byte_order.to_string(),
            max: format_optional(signal.maximum),
            min: format_optional(signal.minimum),
            init: signal.initial_or_default().to_string(),
            invalid: format_optional(signal.raw_invalid),
            choices: format_choices(&signal.choices),
            description: format_comment(signal.comment.as_deref()),
        }
    }
}

/// Signal records per message name
pub type MessageSignals = BTreeMap<String, Vec<SignalRecord>>;

/// Signal detail for every loaded source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalDetail {
    Single(MessageSignals),
    /// Keyed by source name, then message name
    Multiple(BTreeMap<String, MessageSignals>),
}

fn is_name(name: &str) -> bool {
    name != NAN_SENTINEL
}

/// Message names of one database
pub fn message_names(db: &NetworkDatabase) -> BTreeSet<String> {
    db.messages
        .iter()
        .map(|m| m.name.as_str())
        .filter(|n| is_name(n))
        .map(str::to_string)
        .collect()
}

/// Message names in file order, duplicates kept
pub fn message_list(db: &NetworkDatabase) -> Vec<String> {
    db.messages.iter().map(|m| m.name.clone()).collect()
}

/// Signal names across all messages of one database
pub fn signal_names(db: &NetworkDatabase) -> BTreeSet<String> {
    db.messages
        .iter()
        .flat_map(|m| m.signals.iter())
        .map(|s| s.name.as_str())
        .filter(|n| is_name(n))
        .map(str::to_string)
        .collect()
}

/// ECU names declared by one database
pub fn ecu_names(db: &NetworkDatabase) -> BTreeSet<String> {
    db.nodes
        .iter()
        .map(|n| n.name.as_str())
        .filter(|n| is_name(n))
        .map(str::to_string)
        .collect()
}

/// Signal records per message for one database
///
/// With duplicate message names the last one wins.
pub fn signal_detail(db: &NetworkDatabase) -> MessageSignals {
    db.messages
        .iter()
        .map(|m| (m.name.clone(), message_records(m)))
        .collect()
}

fn message_records(message: &Message) -> Vec<SignalRecord> {
    message.signals.iter().map(SignalRecord::from_signal).collect()
}

/// Message names across every loaded database
pub fn source_message_names(source: &Source) -> BTreeSet<String> {
    source
        .databases()
        .flat_map(|(_, db)| message_names(db))
        .collect()
}

/// Signal names across every loaded database
pub fn source_signal_names(source: &Source) -> BTreeSet<String> {
    source
        .databases()
        .flat_map(|(_, db)| signal_names(db))
        .collect()
}

/// ECU names across every loaded database
pub fn source_ecu_names(source: &Source) -> BTreeSet<String> {
    source
        .databases()
        .flat_map(|(_, db)| ecu_names(db))
        .collect()
}

/// Signal detail shaped after the source variant
pub fn source_signal_detail(source: &Source) -> SignalDetail {
    match source {
        Source::Single(db) => SignalDetail::Single(signal_detail(db)),
        Source::Multiple(map) => SignalDetail::Multiple(
            map.iter()
                .map(|(name, db)| (name.clone(), signal_detail(db)))
                .collect(),
        ),
    }
}

/// Message names of the tabular source
pub fn tabular_message_names(
    dataset: &TabularDataset,
    layout: &TabularLayout,
) -> Result<BTreeSet<String>> {
    Ok(name_set(dataset.message_column(layout)?))
}

/// Signal names of the tabular source
pub fn tabular_signal_names(
    dataset: &TabularDataset,
    layout: &TabularLayout,
) -> Result<BTreeSet<String>> {
    Ok(name_set(dataset.signal_column(layout)?))
}

fn name_set(cells: Vec<&str>) -> BTreeSet<String> {
    cells
        .into_iter()
        .filter(|n| is_name(n))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ChoiceTable, Node};
    use crate::types::MatrixError;

    fn body_db() -> NetworkDatabase {
        let mut lamp = Signal::new("LampState", 16, 2).with_receivers(["IPK"]);
        lamp.choices = ChoiceTable::from(vec![(0, "Off".to_string()), (1, "On".to_string())]);
        lamp.comment = Some("Lamp".to_string());

        let mut db = NetworkDatabase::new("body.dbc");
        db.nodes = vec![Node::new("BCM"), Node::new("IPK"), Node::new("nan")];
        db.messages = vec![
            Message::new("Speed_Status", 0x123, 8)
                .with_senders(["BCM"])
                .with_signal(Signal::new("VehicleSpeed", 0, 16).with_receivers(["IPK"]))
                .with_signal(lamp),
            Message::new("Body_Status", 0x200, 8)
                .with_signal(Signal::new("VehicleSpeed", 0, 16))
                .with_signal(Signal::new("nan", 16, 1)),
            Message::new("Speed_Status", 0x124, 4),
        ];
        db
    }

    #[test]
    fn test_name_sets_drop_duplicates_and_sentinel() {
        let db = body_db();
        let messages: Vec<_> = message_names(&db).into_iter().collect();
        assert_eq!(messages, vec!["Body_Status", "Speed_Status"]);

        let signals: Vec<_> = signal_names(&db).into_iter().collect();
        assert_eq!(signals, vec!["LampState", "VehicleSpeed"]);

        let ecus: Vec<_> = ecu_names(&db).into_iter().collect();
        assert_eq!(ecus, vec!["BCM", "IPK"]);

        assert_eq!(message_list(&db).len(), 3);
    }

    #[test]
    fn test_signal_record_formatting() {
        let db = body_db();
        let detail = signal_detail(&db);
        let records = &detail["Body_Status"];
        assert_eq!(records.len(), 2);

        let speed = &records[0];
        assert_eq!(speed.length, "16 bit");
        assert_eq!(speed.init, "0");
        assert_eq!(speed.invalid, "None");
        assert_eq!(speed.choices, "None");
        assert_eq!(speed.description, "");
        assert_eq!(speed.receivers, "None");
        assert_eq!(speed.byte_order, "little_endian");
    }

    #[test]
    fn test_duplicate_message_name_keeps_last_detail() {
        let detail = signal_detail(&body_db());
        assert!(detail["Speed_Status"].is_empty());
    }

    #[test]
    fn test_source_detail_follows_variant() {
        let single = Source::Single(body_db());
        assert!(matches!(source_signal_detail(&single), SignalDetail::Single(_)));

        let mut other = body_db();
        other.name = "chassis.dbc".to_string();
        let multiple = Source::from_databases(vec![body_db(), other]).unwrap();
        match source_signal_detail(&multiple) {
            SignalDetail::Multiple(map) => {
                assert_eq!(map.len(), 2);
                assert!(map["chassis.dbc"].contains_key("Body_Status"));
            }
            other => panic!("unexpected detail: {:?}", other),
        }
        assert_eq!(source_ecu_names(&multiple).len(), 2);
        assert_eq!(source_message_names(&multiple).len(), 2);
        assert_eq!(source_signal_names(&multiple).len(), 2);
    }

    #[test]
    fn test_tabular_names() {
        let layout = TabularLayout::default();
        let dataset = TabularDataset::new(
            "Matrix",
            vec![layout.message_column.clone(), layout.signal_column.clone()],
            vec![
                vec!["Speed_Status".to_string(), "VehicleSpeed".to_string()],
                vec!["nan".to_string(), "".to_string()],
            ],
        );

        let messages = tabular_message_names(&dataset, &layout).unwrap();
        assert_eq!(messages.len(), 1);

        // empty text is a distinct, reportable value
        let signals = tabular_signal_names(&dataset, &layout).unwrap();
        assert!(signals.contains(""));
        assert!(!signals.contains("nan"));

        let other = TabularLayout::default().with_columns("Msg", "Sig");
        assert!(matches!(
            tabular_message_names(&dataset, &other),
            Err(MatrixError::MissingColumn { .. })
        ));
    }
}
