//! Error and result types shared by the loaders and the core engine
//!
//! Only malformed input is an error here. Validation violations and
//! consistency differences are ordinary data returned by their modules.

use std::path::PathBuf;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, MatrixError>;

/// Sentinel used by both sources to mean "no entry"
pub const NAN_SENTINEL: &str = "nan";

/// Errors that can occur while loading sources
#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    #[error("Failed to parse DBC file {path:?}: {reason}")]
    DbcParse { path: PathBuf, reason: String },

    #[error("Failed to parse tabular file {path:?}: {reason}")]
    TabularParse { path: PathBuf, reason: String },

    #[error("Sheet not found: {sheet:?}")]
    SheetNotFound { sheet: String },

    #[error("Missing required column: {column:?}")]
    MissingColumn { column: String },

    #[error("No network database could be loaded")]
    NoSources,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message_keeps_line_break() {
        let err = MatrixError::MissingColumn {
            column: "Msg Name\n报文名称".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required column: \"Msg Name\\n报文名称\""
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MatrixError = io.into();
        assert!(matches!(err, MatrixError::Io(_)));
    }
}
