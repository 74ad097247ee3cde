//! In-memory network database
//!
//! One `NetworkDatabase` per loaded compiled file. The engine treats it as
//! read-only except for appending new messages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A network participant (ECU)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// ECU name (case-sensitive identity)
    pub name: String,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Byte order of a signal inside the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Intel format
    #[default]
    LittleEndian,
    /// Motorola format
    BigEndian,
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => write!(f, "little_endian"),
            ByteOrder::BigEndian => write!(f, "big_endian"),
        }
    }
}

/// Enumerated value table (raw value -> label), in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceTable(pub Vec<(i64, String)>);

impl ChoiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw: i64, label: impl Into<String>) {
        self.0.push((raw, label.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(i64, String)> {
        self.0.iter()
    }

    /// Label for a raw value, if the table has one
    pub fn label(&self, raw: i64) -> Option<&str> {
        self.0
            .iter()
            .find(|(value, _)| *value == raw)
            .map(|(_, label)| label.as_str())
    }
}

impl From<Vec<(i64, String)>> for ChoiceTable {
    fn from(entries: Vec<(i64, String)>) -> Self {
        Self(entries)
    }
}

/// A bit-field inside a message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    /// Start bit in the payload
    pub start_bit: u32,
    /// Length in bits
    pub length: u32,
    pub byte_order: ByteOrder,
    pub is_signed: bool,
    /// Multiplier applied to the raw value
    pub scale: f64,
    /// Added after scaling
    pub offset: f64,
    /// Physical lower bound
    pub minimum: Option<f64>,
    /// Physical upper bound
    pub maximum: Option<f64>,
    /// Raw start value, `0` when absent
    pub raw_initial: Option<f64>,
    /// Raw value meaning "not available"
    pub raw_invalid: Option<f64>,
    /// Engineering unit, may be empty
    pub unit: String,
    pub choices: ChoiceTable,
    /// Receiving ECU names
    pub receivers: Vec<String>,
    pub comment: Option<String>,
}

impl Signal {
    /// A plain unsigned little-endian signal with identity scaling
    pub fn new(name: impl Into<String>, start_bit: u32, length: u32) -> Self {
        Self {
            name: name.into(),
            start_bit,
            length,
            byte_order: ByteOrder::LittleEndian,
            is_signed: false,
            scale: 1.0,
            offset: 0.0,
            minimum: None,
            maximum: None,
            raw_initial: None,
            raw_invalid: None,
            unit: String::new(),
            choices: ChoiceTable::new(),
            receivers: Vec::new(),
            comment: None,
        }
    }

    /// Builder method: set receivers
    pub fn with_receivers<I, S>(mut self, receivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.receivers = receivers.into_iter().map(Into::into).collect();
        self
    }

    /// Raw initial value with the documented default applied
    pub fn initial_or_default(&self) -> f64 {
        self.raw_initial.unwrap_or(0.0)
    }
}

/// A CAN frame definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    /// Frame identifier (11-bit or 29-bit)
    pub frame_id: u32,
    /// Payload length in bytes (1-64)
    pub length: usize,
    pub is_extended: bool,
    /// Transmitting ECU names
    pub senders: Vec<String>,
    /// Cycle time in milliseconds
    pub cycle_time: Option<u32>,
    /// Send type attribute (e.g. "Cyclic")
    pub send_type: Option<String>,
    pub comment: Option<String>,
    /// Signals in bit layout order
    pub signals: Vec<Signal>,
}

impl Message {
    pub fn new(name: impl Into<String>, frame_id: u32, length: usize) -> Self {
        Self {
            name: name.into(),
            frame_id,
            length,
            is_extended: false,
            senders: Vec::new(),
            cycle_time: None,
            send_type: None,
            comment: None,
            signals: Vec::new(),
        }
    }

    /// Builder method: set senders
    pub fn with_senders<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.senders = senders.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method: append a signal
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Receivers aggregated from all signals
    pub fn receivers(&self) -> BTreeSet<String> {
        self.signals
            .iter()
            .flat_map(|signal| signal.receivers.iter().cloned())
            .collect()
    }
}

/// One parsed compiled network-description file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDatabase {
    /// Source name (usually the file name)
    pub name: String,
    pub nodes: Vec<Node>,
    pub messages: Vec<Message>,
}

impl NetworkDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Source name without its file extension
    pub fn display_name(&self) -> &str {
        strip_extension(&self.name)
    }

    /// Append a message; existing messages are never touched
    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_nodes: self.nodes.len(),
            num_messages: self.messages.len(),
            num_signals: self.messages.iter().map(|m| m.signals.len()).sum(),
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub num_nodes: usize,
    pub num_messages: usize,
    pub num_signals: usize,
}

impl std::ops::Add for DatabaseStats {
    type Output = DatabaseStats;

    fn add(self, other: DatabaseStats) -> DatabaseStats {
        DatabaseStats {
            num_nodes: self.num_nodes + other.num_nodes,
            num_messages: self.num_messages + other.num_messages,
            num_signals: self.num_signals + other.num_signals,
        }
    }
}

/// Strip the last extension from a file name ("body.dbc" -> "body")
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message::new("EngineData", 0x123, 8)
            .with_senders(["ECU1"])
            .with_signal(Signal::new("EngineSpeed", 0, 16).with_receivers(["ECU2", "ECU3"]))
            .with_signal(Signal::new("EngineTemp", 16, 8).with_receivers(["ECU2"]))
    }

    #[test]
    fn test_receivers_are_aggregated_from_signals() {
        let message = sample_message();
        let receivers: Vec<_> = message.receivers().into_iter().collect();
        assert_eq!(receivers, vec!["ECU2".to_string(), "ECU3".to_string()]);
    }

    #[test]
    fn test_stats_and_append() {
        let mut db = NetworkDatabase::new("body.dbc");
        db.nodes.push(Node::new("ECU1"));
        db.append_message(sample_message());
        db.append_message(Message::new("Empty", 0x200, 2));

        let stats = db.stats();
        assert_eq!(stats.num_nodes, 1);
        assert_eq!(stats.num_messages, 2);
        assert_eq!(stats.num_signals, 2);
        assert_eq!(db.messages[1].name, "Empty");
    }

    #[test]
    fn test_display_name_strips_extension() {
        assert_eq!(NetworkDatabase::new("body.dbc").display_name(), "body");
        assert_eq!(strip_extension("matrix.v7.dbc"), "matrix.v7");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn test_choice_table_lookup() {
        let mut choices = ChoiceTable::new();
        choices.push(0, "Off");
        choices.push(1, "On");
        assert_eq!(choices.label(1), Some("On"));
        assert_eq!(choices.label(2), None);
        assert_eq!(choices.len(), 2);
    }

    #[test]
    fn test_signal_defaults() {
        let signal = Signal::new("S", 60, 8);
        assert_eq!(signal.initial_or_default(), 0.0);
        assert_eq!(signal.scale, 1.0);
        assert_eq!(signal.byte_order.to_string(), "little_endian");
    }
}
