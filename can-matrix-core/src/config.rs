//! Configuration types for the core engine
//!
//! Only presentation knobs and tabular column names live here. Everything
//! else the engine needs comes from the loaded sources themselves.

use serde::{Deserialize, Serialize};

/// Default sheet holding the communication matrix
pub const DEFAULT_SHEET: &str = "Matrix";
/// Default header of the message-name column (bilingual, with line break)
pub const DEFAULT_MESSAGE_COLUMN: &str = "Msg Name\n报文名称";
/// Default header of the signal-name column (bilingual, with line break)
pub const DEFAULT_SIGNAL_COLUMN: &str = "Signal Name\n信号名称";

/// Options for building the hierarchical graph model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphOptions {
    /// Add auxiliary edges between messages shared by every loaded source
    #[serde(default)]
    pub highlight_common: bool,

    /// Colors and sizes for each node level
    #[serde(default)]
    pub palette: Palette,
}

/// Colors and sizes used for graph nodes and auxiliary edges
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Palette {
    #[serde(default = "default_root_color")]
    pub root_color: String,
    #[serde(default = "default_root_size")]
    pub root_size: u32,

    #[serde(default = "default_message_color")]
    pub message_color: String,
    #[serde(default = "default_message_size")]
    pub message_size: u32,

    #[serde(default = "default_signal_color")]
    pub signal_color: String,
    #[serde(default = "default_signal_size")]
    pub signal_size: u32,

    /// Color of the edges linking common messages across sources
    #[serde(default = "default_common_edge_color")]
    pub common_edge_color: String,
    /// Width of the edges linking common messages across sources
    #[serde(default = "default_common_edge_width")]
    pub common_edge_width: u32,
}

fn default_root_color() -> String {
    "#862633".to_string()
}

fn default_root_size() -> u32 {
    25
}

fn default_message_color() -> String {
    "#4285F4".to_string()
}

fn default_message_size() -> u32 {
    15
}

fn default_signal_color() -> String {
    "#34A853".to_string()
}

fn default_signal_size() -> u32 {
    10
}

fn default_common_edge_color() -> String {
    "#FF6D00".to_string()
}

fn default_common_edge_width() -> u32 {
    3
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            root_color: default_root_color(),
            root_size: default_root_size(),
            message_color: default_message_color(),
            message_size: default_message_size(),
            signal_color: default_signal_color(),
            signal_size: default_signal_size(),
            common_edge_color: default_common_edge_color(),
            common_edge_width: default_common_edge_width(),
        }
    }
}

impl GraphOptions {
    /// Create graph options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable common-message highlighting
    pub fn with_highlight_common(mut self, enabled: bool) -> Self {
        self.highlight_common = enabled;
        self
    }

    /// Builder method: replace the palette
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }
}

/// Where the names live inside the tabular dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabularLayout {
    #[serde(default = "default_sheet")]
    pub sheet: String,

    #[serde(default = "default_message_column")]
    pub message_column: String,

    #[serde(default = "default_signal_column")]
    pub signal_column: String,
}

fn default_sheet() -> String {
    DEFAULT_SHEET.to_string()
}

fn default_message_column() -> String {
    DEFAULT_MESSAGE_COLUMN.to_string()
}

fn default_signal_column() -> String {
    DEFAULT_SIGNAL_COLUMN.to_string()
}

impl Default for TabularLayout {
    fn default() -> Self {
        Self {
            sheet: default_sheet(),
            message_column: default_message_column(),
            signal_column: default_signal_column(),
        }
    }
}

impl TabularLayout {
    /// Create the default layout (`Matrix` sheet, bilingual headers)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: read from another sheet
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = sheet.into();
        self
    }

    /// Builder method: use other column headers
    pub fn with_columns(
        mut self,
        message_column: impl Into<String>,
        signal_column: impl Into<String>,
    ) -> Self {
        self.message_column = message_column.into();
        self.signal_column = signal_column.into();
        self
    }
}
