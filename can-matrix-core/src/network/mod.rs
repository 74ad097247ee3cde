//! Network database model and compiled-file loaders
//!
//! `model` holds the in-memory representation the engine works on.
//! `dbc` is the only place that knows about the DBC encoding.

pub mod dbc;
pub mod model;

// Re-export key types for convenience
pub use model::{
    strip_extension, ByteOrder, ChoiceTable, DatabaseStats, Message, NetworkDatabase, Node,
    Signal,
};
