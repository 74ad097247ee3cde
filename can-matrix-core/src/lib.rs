//! CAN Matrix Core Library
//!
//! Reconciles two independently authored descriptions of an in-vehicle CAN
//! network (a tabular communication matrix and compiled DBC files) and builds
//! a hierarchical network → message → signal model for visual inspection.
//!
//! # Architecture
//!
//! - `network` and `tabular` load sources; they are the only modules that
//!   touch the filesystem or log.
//! - `extract` projects loaded sources into name sets and display records.
//! - `consistency` reports names present in only one source.
//! - `graph` builds the node/edge model, with optional links between
//!   messages shared by every loaded DBC file.
//! - `draft` validates user-authored messages before they are appended.
//!
//! Results are plain data. Differences and validation violations are never
//! errors; only malformed input is.
//!
//! # Example Usage
//!
//! ```no_run
//! use can_matrix_core::{consistency, graph, GraphOptions, Source, TabularDataset, TabularLayout};
//! use std::path::Path;
//!
//! let layout = TabularLayout::default();
//! let sheet = TabularDataset::load_json(Path::new("matrix.json"), &layout).unwrap();
//! let source = Source::load(&[Path::new("body.dbc")]).unwrap();
//!
//! if let Source::Single(db) = &source {
//!     let report = consistency::compare(&sheet, db, &layout).unwrap();
//!     println!("consistent: {}", report.is_consistent());
//! }
//!
//! let model = graph::build(&source, &GraphOptions::new().with_highlight_common(true));
//! println!("{} nodes", model.nodes.len());
//! ```

// Public modules
pub mod config;
pub mod consistency;
pub mod draft;
pub mod extract;
pub mod format;
pub mod graph;
pub mod network;
pub mod source;
pub mod tabular;
pub mod types;

// Re-export main types for convenience
pub use config::{GraphOptions, Palette, TabularLayout};
pub use consistency::{ConsistencyReport, NameDiff};
pub use draft::{DraftMessage, DraftSignal, ValidationResult, Violation};
pub use extract::{SignalDetail, SignalRecord};
pub use graph::{GraphEdge, GraphModel, GraphNode, Level};
pub use network::{ByteOrder, ChoiceTable, DatabaseStats, Message, NetworkDatabase, Node, Signal};
pub use source::Source;
pub use tabular::TabularDataset;
pub use types::{MatrixError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty database builds a lone root node
        let source = Source::Single(NetworkDatabase::new("empty.dbc"));
        let model = graph::build(&source, &GraphOptions::default());
        assert_eq!(model.nodes.len(), 1);
        assert_eq!(source.stats().num_messages, 0);
    }
}
