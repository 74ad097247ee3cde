//! Hierarchical graph model
//!
//! Builds a three-level tree per loaded source: one root node, one node per
//! message, one node per signal. When several sources are loaded, messages
//! present in all of them can be linked with auxiliary edges.
//!
//! The model is rebuilt from scratch on every call. Identifier counters are
//! local to one `build` call and restart for each source:
//!
//! | level | single source | multiple sources       |
//! |-------|---------------|------------------------|
//! | 0     | `CAN_Network` | `root@<source>`        |
//! | 1     | `msg_1`       | `msg_1@<source>`       |
//! | 2     | `sig_10001`   | `sig_10001@<source>`   |

use crate::config::{GraphOptions, Palette};
use crate::extract;
use crate::format::{
    format_choices, format_comment, format_frame_id, format_names, format_optional,
};
use crate::network::{strip_extension, Message, NetworkDatabase, Signal};
use crate::source::Source;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

/// Root identifier when a single source is loaded
pub const SINGLE_ROOT_ID: &str = "CAN_Network";
const ROOT_TITLE: &str = "Root node of CAN bus messages";
const DEFAULT_ROOT_LABEL: &str = "CAN Network";

const MESSAGE_COUNTER_START: u32 = 0;
const SIGNAL_COUNTER_START: u32 = 10_000;

/// Hierarchy level of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Network,
    Message,
    Signal,
}

impl Level {
    pub fn as_u8(self) -> u8 {
        match self {
            Level::Network => 0,
            Level::Message => 1,
            Level::Signal => 2,
        }
    }
}

impl Serialize for Level {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

/// A node of the rendered graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub level: Level,
    pub color: String,
    /// Multi-line tooltip text
    pub title: String,
    pub size: u32,
}

/// Whether an edge is part of the tree or an auxiliary link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Tree,
    CommonMessage,
}

/// An edge of the rendered graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl GraphEdge {
    fn tree(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            kind: EdgeKind::Tree,
            color: None,
            width: None,
            title: None,
        }
    }
}

/// Nodes and edges ready for an external renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphModel {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_at(&self, level: Level) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.level == level)
    }

    /// Auxiliary edges between common messages
    pub fn common_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges
            .iter()
            .filter(|e| e.kind == EdgeKind::CommonMessage)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Per-source identifier allocation, local to one build call
struct IdAllocator<'a> {
    message: u32,
    signal: u32,
    suffix: Option<&'a str>,
}

impl<'a> IdAllocator<'a> {
    fn new(suffix: Option<&'a str>) -> Self {
        Self {
            message: MESSAGE_COUNTER_START,
            signal: SIGNAL_COUNTER_START,
            suffix,
        }
    }

    fn root(&self) -> String {
        match self.suffix {
            Some(source) => format!("root@{}", source),
            None => SINGLE_ROOT_ID.to_string(),
        }
    }

    fn next_message(&mut self) -> String {
        self.message += 1;
        self.decorate(format!("msg_{}", self.message))
    }

    fn next_signal(&mut self) -> String {
        self.signal += 1;
        self.decorate(format!("sig_{}", self.signal))
    }

    fn decorate(&self, id: String) -> String {
        match self.suffix {
            Some(source) => format!("{}@{}", id, source),
            None => id,
        }
    }
}

/// Build the graph model for every loaded source
pub fn build(source: &Source, options: &GraphOptions) -> GraphModel {
    let mut model = GraphModel::default();

    match source {
        Source::Single(db) => {
            let label = match db.display_name() {
                "" => DEFAULT_ROOT_LABEL,
                name => name,
            };
            add_tree(&mut model, db, label, IdAllocator::new(None), &options.palette);
        }
        Source::Multiple(map) => {
            // message name -> first node id, per source, in source order
            let mut message_ids: Vec<HashMap<String, String>> = Vec::with_capacity(map.len());
            for (name, db) in map {
                let ids = add_tree(
                    &mut model,
                    db,
                    strip_extension(name),
                    IdAllocator::new(Some(name.as_str())),
                    &options.palette,
                );
                message_ids.push(ids);
            }

            if options.highlight_common && map.len() >= 2 {
                let common = common_messages(map.values());
                add_common_edges(&mut model, &common, &message_ids, &options.palette);
            }
        }
    }

    model
}

/// Message names present in every given database
pub fn common_messages<'a, I>(databases: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a NetworkDatabase>,
{
    let mut sets = databases.into_iter().map(extract::message_names);
    let first = sets.next().unwrap_or_default();
    sets.fold(first, |acc, names| acc.intersection(&names).cloned().collect())
}

/// Emit one source's tree; returns message name -> first node id
fn add_tree(
    model: &mut GraphModel,
    db: &NetworkDatabase,
    label: &str,
    mut ids: IdAllocator<'_>,
    palette: &Palette,
) -> HashMap<String, String> {
    let root_id = ids.root();
    model.nodes.push(GraphNode {
        id: root_id.clone(),
        label: label.to_string(),
        level: Level::Network,
        color: palette.root_color.clone(),
        title: ROOT_TITLE.to_string(),
        size: palette.root_size,
    });

    let mut message_ids = HashMap::new();

    for message in &db.messages {
        let message_id = ids.next_message();
        model.nodes.push(GraphNode {
            id: message_id.clone(),
            label: message.name.clone(),
            level: Level::Message,
            color: palette.message_color.clone(),
            title: message_title(message),
            size: palette.message_size,
        });
        model.edges.push(GraphEdge::tree(&root_id, &message_id));

        for signal in &message.signals {
            let signal_id = ids.next_signal();
            model.nodes.push(GraphNode {
                id: signal_id.clone(),
                label: signal.name.clone(),
                level: Level::Signal,
                color: palette.signal_color.clone(),
                title: signal_title(message, signal),
                size: palette.signal_size,
            });
            model.edges.push(GraphEdge::tree(&message_id, &signal_id));
        }

        message_ids
            .entry(message.name.clone())
            .or_insert(message_id);
    }

    message_ids
}

/// One edge per common message per unordered pair of sources
fn add_common_edges(
    model: &mut GraphModel,
    common: &BTreeSet<String>,
    message_ids: &[HashMap<String, String>],
    palette: &Palette,
) {
    for name in common {
        for (i, left) in message_ids.iter().enumerate() {
            for right in &message_ids[i + 1..] {
                if let (Some(from), Some(to)) = (left.get(name), right.get(name)) {
                    model.edges.push(GraphEdge {
                        from: from.clone(),
                        to: to.clone(),
                        kind: EdgeKind::CommonMessage,
                        color: Some(palette.common_edge_color.clone()),
                        width: Some(palette.common_edge_width),
                        title: Some(format!("Common message: {}", name)),
                    });
                }
            }
        }
    }
}

/// Tooltip text for a message node
pub fn message_title(message: &Message) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name message: {}", message.name);
    let _ = writeln!(out, "Sender: {}", format_names(&message.senders));
    let _ = writeln!(out, "Receivers: {}", format_names(message.receivers()));
    let _ = writeln!(out, "Send type: {}", format_optional(message.send_type.as_deref()));
    let _ = writeln!(out, "Cycle time: {}", format_optional(message.cycle_time));
    let _ = writeln!(out, "ID: {}", format_frame_id(message.frame_id));
    let _ = writeln!(out, "Length: {} bytes", message.length);
    let _ = write!(out, "Signals: {}", message.signals.len());
    out
}

/// Tooltip text for a signal node
pub fn signal_title(message: &Message, signal: &Signal) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name signal: {}", signal.name);
    let _ = writeln!(out, "Receivers: {}", format_names(&signal.receivers));
    let _ = writeln!(out, "Byte order: {}", signal.byte_order);
    let _ = writeln!(out, "Cycle time: {}", format_optional(message.cycle_time));
    let _ = writeln!(out, "Start bit: {}", signal.start_bit);
    let _ = writeln!(out, "Min value: {}", format_optional(signal.minimum));
    let _ = writeln!(out, "Max value: {}", format_optional(signal.maximum));
    let _ = writeln!(out, "Signal Value Description: {}", format_choices(&signal.choices));
    let _ = writeln!(out, "Initial value: {}", signal.initial_or_default());
    let _ = writeln!(out, "Invalid value: {}", format_optional(signal.raw_invalid));
    let _ = writeln!(out, "Scale: {}", signal.scale);
    let _ = writeln!(out, "Offset: {}", signal.offset);
    let _ = writeln!(out, "Signed: {}", signal.is_signed);
    let _ = writeln!(out, "Description: {}", format_comment(signal.comment.as_deref()));
    let _ = writeln!(out, "Length: {} bit", signal.length);
    let _ = write!(out, "Unit: {}", signal.unit);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ChoiceTable;

    fn db(name: &str, messages: &[&str]) -> NetworkDatabase {
        let mut db = NetworkDatabase::new(name);
        for (i, msg) in messages.iter().enumerate() {
            db.append_message(
                Message::new(*msg, 0x100 + i as u32, 8)
                    .with_senders(["BCM"])
                    .with_signal(Signal::new(format!("{}_A", msg), 0, 8).with_receivers(["GW"]))
                    .with_signal(Signal::new(format!("{}_B", msg), 8, 8)),
            );
        }
        db
    }

    fn topology(model: &GraphModel) -> (BTreeSet<(String, u8)>, Vec<(String, String)>) {
        let labels: HashMap<&str, &str> = model
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.label.as_str()))
            .collect();
        let nodes = model
            .nodes
            .iter()
            .map(|n| (n.label.clone(), n.level.as_u8()))
            .collect();
        let edges = model
            .edges
            .iter()
            .map(|e| (labels[e.from.as_str()].to_string(), labels[e.to.as_str()].to_string()))
            .collect();
        (nodes, edges)
    }

    #[test]
    fn test_single_source_tree() {
        let source = Source::Single(db("body.dbc", &["Speed_Status", "Door_Status"]));
        let model = build(&source, &GraphOptions::default());

        assert_eq!(model.nodes.len(), 1 + 2 + 4);
        assert_eq!(model.edges.len(), 2 + 4);

        let root = model.node(SINGLE_ROOT_ID).unwrap();
        assert_eq!(root.label, "body");
        assert_eq!(root.level, Level::Network);
        assert_eq!(root.color, "#862633");
        assert_eq!(root.size, 25);

        let msg = model.node("msg_1").unwrap();
        assert_eq!(msg.label, "Speed_Status");
        assert_eq!(msg.size, 15);
        assert!(model.node("msg_2").is_some());
        assert_eq!(model.node("sig_10001").unwrap().label, "Speed_Status_A");
        assert_eq!(model.node("sig_10004").unwrap().label, "Door_Status_B");

        assert_eq!(model.edges[0].from, SINGLE_ROOT_ID);
        assert_eq!(model.edges[0].to, "msg_1");
        assert_eq!(model.edges[1].from, "msg_1");
        assert_eq!(model.edges[1].to, "sig_10001");
    }

    #[test]
    fn test_unnamed_single_source_gets_default_label() {
        let source = Source::Single(NetworkDatabase::default());
        let model = build(&source, &GraphOptions::default());
        assert_eq!(model.nodes.len(), 1);
        assert_eq!(model.nodes[0].label, "CAN Network");
    }

    #[test]
    fn test_build_is_idempotent() {
        let source = Source::Single(db("body.dbc", &["A", "B", "C"]));
        let options = GraphOptions::default();
        let first = build(&source, &options);
        let second = build(&source, &options);

        assert_eq!(topology(&first), topology(&second));
        // counters restart on every call
        assert_eq!(first, second);
    }

    #[test]
    fn test_multiple_sources_never_collide() {
        let source = Source::from_databases(vec![
            db("body.dbc", &["Speed_Status"]),
            db("chassis.dbc", &["Speed_Status"]),
        ])
        .unwrap();
        let model = build(&source, &GraphOptions::default());

        let ids: BTreeSet<_> = model.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), model.nodes.len());
        assert!(ids.contains("root@body.dbc"));
        assert!(ids.contains("msg_1@body.dbc"));
        assert!(ids.contains("msg_1@chassis.dbc"));
        assert!(ids.contains("sig_10002@chassis.dbc"));

        let roots: Vec<_> = model.nodes_at(Level::Network).map(|n| n.label.as_str()).collect();
        assert_eq!(roots, vec!["body", "chassis"]);

        // roots are never linked to each other
        assert!(model.edges.iter().all(|e| !(e.from.starts_with("root@") && e.to.starts_with("root@"))));
        assert_eq!(model.common_edges().count(), 0);
    }

    #[test]
    fn test_single_source_has_no_common_edges() {
        let source = Source::Single(db("body.dbc", &["Speed_Status"]));
        let model = build(&source, &GraphOptions::new().with_highlight_common(true));
        assert_eq!(model.common_edges().count(), 0);
    }

    #[test]
    fn test_two_sources_one_common_edge() {
        let source = Source::from_databases(vec![
            db("body.dbc", &["Speed_Status", "Door_Status"]),
            db("chassis.dbc", &["Brake_Status", "Speed_Status"]),
        ])
        .unwrap();
        let model = build(&source, &GraphOptions::new().with_highlight_common(true));

        let common: Vec<_> = model.common_edges().collect();
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].from, "msg_1@body.dbc");
        assert_eq!(common[0].to, "msg_2@chassis.dbc");
        assert_eq!(common[0].color.as_deref(), Some("#FF6D00"));
        assert_eq!(common[0].width, Some(3));
        assert_eq!(common[0].title.as_deref(), Some("Common message: Speed_Status"));
    }

    #[test]
    fn test_three_sources_edge_per_pair() {
        let source = Source::from_databases(vec![
            db("a.dbc", &["Speed_Status", "Only_A"]),
            db("b.dbc", &["Speed_Status"]),
            db("c.dbc", &["Speed_Status", "Only_A"]),
        ])
        .unwrap();
        let model = build(&source, &GraphOptions::new().with_highlight_common(true));

        assert_eq!(model.common_edges().count(), 3);
        let common = common_messages(match &source {
            Source::Multiple(map) => map.values().collect::<Vec<_>>(),
            Source::Single(_) => unreachable!(),
        });
        assert_eq!(common.into_iter().collect::<Vec<_>>(), vec!["Speed_Status"]);
    }

    #[test]
    fn test_message_title_contents() {
        let mut message = Message::new("Speed_Status", 0x1A0, 8)
            .with_senders(["BCM"])
            .with_signal(Signal::new("VehicleSpeed", 0, 16).with_receivers(["IPK", "GW"]));
        message.cycle_time = Some(100);

        let title = message_title(&message);
        assert!(title.contains("Name message: Speed_Status"));
        assert!(title.contains("Sender: BCM"));
        assert!(title.contains("Receivers: GW, IPK"));
        assert!(title.contains("Send type: None"));
        assert!(title.contains("Cycle time: 100"));
        assert!(title.contains("ID: 0x1A0"));
        assert!(title.contains("Length: 8 bytes"));
        assert!(title.ends_with("Signals: 1"));
    }

    #[test]
    fn test_signal_title_defaults() {
        let message = Message::new("M", 1, 8);
        let mut signal = Signal::new("Lamp", 4, 2);
        signal.choices = ChoiceTable::from(vec![(0, "Off".to_string()), (1, "On".to_string())]);

        let title = signal_title(&message, &signal);
        assert!(title.contains("Signal Value Description: 0x0: Off 0x1: On \n"));
        assert!(title.contains("Initial value: 0\n"));
        assert!(title.contains("Invalid value: None\n"));
        assert!(title.contains("Description: \n"));
        assert!(title.contains("Length: 2 bit"));
        assert!(title.contains("Min value: None"));
    }

    #[test]
    fn test_json_shape() {
        let source = Source::Single(db("body.dbc", &["M"]));
        let json = build(&source, &GraphOptions::default()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["nodes"][0]["level"], 0);
        assert_eq!(value["nodes"][1]["level"], 1);
        assert_eq!(value["edges"][0]["kind"], "tree");
        assert!(value["edges"][0].get("color").is_none());
    }
}
