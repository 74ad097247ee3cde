//! Configuration loading and parsing

use anyhow::{Context, Result};
use can_matrix_core::{GraphOptions, TabularLayout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub tabular: TabularLayout,
    #[serde(default)]
    pub graph: GraphOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub dbc_files: Vec<PathBuf>,
    /// Matrix sheet exported as JSON
    pub tabular_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_graph_file")]
    pub graph_file: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_graph_file() -> String {
    "graph.json".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            graph_file: default_graph_file(),
        }
    }
}

impl AppConfig {
    /// Command-line DBC files replace the configured ones when given
    pub fn merge_dbc_files(&mut self, dbc: &[PathBuf]) {
        if !dbc.is_empty() {
            self.input.dbc_files = dbc.to_vec();
        }
    }

    /// Command-line tabular file replaces the configured one when given
    pub fn merge_tabular_file(&mut self, tabular: Option<&PathBuf>) {
        if let Some(path) = tabular {
            self.input.tabular_file = Some(path.clone());
        }
    }

    /// Path of the graph JSON inside the output directory
    pub fn graph_path(&self) -> PathBuf {
        self.output.output_dir.join(&self.output.graph_file)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r##"
            [input]
            dbc_files = ["body.dbc", "chassis.dbc"]
            tabular_file = "matrix.json"

            [tabular]
            sheet = "Matrix"

            [graph]
            highlight_common = true

            [graph.palette]
            common_edge_color = "#FF0000"

            [output]
            output_dir = "out"
        "##;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.dbc_files.len(), 2);
        assert!(config.graph.highlight_common);
        assert_eq!(config.graph.palette.common_edge_color, "#FF0000");
        assert_eq!(config.graph.palette.root_color, "#862633");
        assert_eq!(config.tabular.message_column, "Msg Name\n报文名称");
        assert_eq!(config.graph_path(), PathBuf::from("out").join("graph.json"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.input.dbc_files.is_empty());
        assert!(!config.graph.highlight_common);
        assert_eq!(config.output.graph_file, "graph.json");
    }

    #[test]
    fn test_command_line_overrides() {
        let mut config = AppConfig::default();
        config.input.dbc_files = vec![PathBuf::from("a.dbc")];

        config.merge_dbc_files(&[]);
        assert_eq!(config.input.dbc_files, vec![PathBuf::from("a.dbc")]);

        config.merge_dbc_files(&[PathBuf::from("b.dbc")]);
        assert_eq!(config.input.dbc_files, vec![PathBuf::from("b.dbc")]);

        config.merge_tabular_file(Some(&PathBuf::from("m.json")));
        assert_eq!(config.input.tabular_file, Some(PathBuf::from("m.json")));
    }
}
