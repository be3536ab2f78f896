//! Graph configuration YAML schema

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;

use super::substitution::{SubstitutionContext, SubstitutionError};

/// Root graph configuration: namespace -> node record.
///
/// ```yaml
/// log:
///   type: compgraph::log::BasicLogProvider
///   level: debug
///
/// date:
///   type: compgraph::date::FixedDate
///   date: "2023-01-01"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphConfig {
    /// Node records (ordered map for deterministic construction order)
    pub nodes: IndexMap<String, NodeRecord>,
}

/// Configuration of a single node: a type locator plus the fields of that
/// type's configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Registry key of the concrete node type
    #[serde(rename = "type")]
    pub locator: String,

    /// Remaining fields, validated by the node type's config struct
    #[serde(flatten)]
    pub fields: Mapping,
}

impl NodeRecord {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            fields: Mapping::new(),
        }
    }

    /// Add a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(Value::String(key.into()), value.into());
        self
    }
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node record under `namespace`
    pub fn with_node(mut self, namespace: impl Into<String>, record: NodeRecord) -> Self {
        self.nodes.insert(namespace.into(), record);
        self
    }

    /// Load a graph configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with(path, &SubstitutionContext::new())
    }

    /// Load a graph configuration from a YAML file, resolving `$(..)`
    /// patterns with the given context
    pub fn from_file_with(
        path: impl AsRef<Path>,
        ctx: &SubstitutionContext,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_with(&content, ctx)
    }

    /// Parse a graph configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_with(content, &SubstitutionContext::new())
    }

    /// Parse a graph configuration, substituting every string scalar first
    pub fn from_yaml_with(content: &str, ctx: &SubstitutionContext) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut raw: Value = serde_yaml::from_str(content)?;
        if raw.is_null() {
            raw = Value::Mapping(Mapping::new());
        }
        ctx.substitute_value(&mut raw)?;

        let config: GraphConfig = serde_yaml::from_value(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the structure of the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (namespace, record) in &self.nodes {
            if namespace.is_empty() || namespace.split('.').any(str::is_empty) {
                return Err(ConfigError::Validation(format!(
                    "Invalid namespace '{}'",
                    namespace
                )));
            }
            if record.locator.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Node '{}': 'type' must not be empty",
                    namespace
                )));
            }
        }
        Ok(())
    }

    /// Namespaces in declaration order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

/// Errors that can occur when loading a graph configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read graph config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse graph config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Substitution failed: {0}")]
    Substitution(#[from] SubstitutionError),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_graph_config() {
        let yaml = r#"
log:
  type: compgraph::log::BasicLogProvider
  level: debug
date:
  type: compgraph::date::FixedDate
  date: "2023-01-01"
"#;
        let config = GraphConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.namespaces().collect::<Vec<_>>(), vec!["log", "date"]);

        let log = &config.nodes["log"];
        assert_eq!(log.locator, "compgraph::log::BasicLogProvider");
        assert_eq!(log.fields.len(), 1);
        assert_eq!(log.fields.get("level").and_then(Value::as_str), Some("debug"));
    }

    #[test]
    fn test_nested_namespace_keys() {
        let yaml = r#"
dummy.a:
  type: tests::DummyA
dummy.b:
  type: tests::DummyB
"#;
        let config = GraphConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.nodes.len(), 2);
        assert!(config.nodes["dummy.a"].fields.is_empty());
    }

    #[test]
    fn test_missing_type_is_rejected() {
        let yaml = r#"
log:
  level: debug
"#;
        assert!(matches!(
            GraphConfig::from_yaml(yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_namespace_is_rejected() {
        let yaml = r#"
"a..b":
  type: tests::Dummy
"#;
        assert!(matches!(
            GraphConfig::from_yaml(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_document() {
        let config = GraphConfig::from_yaml("").unwrap();
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn test_substitution_applies_to_fields() {
        let yaml = r#"
date:
  type: compgraph::date::FixedDate
  date: "$(arg as_of)"
"#;
        let ctx = SubstitutionContext::new().with_arg("as_of", "2024-02-29");
        let config = GraphConfig::from_yaml_with(yaml, &ctx).unwrap();
        assert_eq!(
            config.nodes["date"].fields.get("date").and_then(Value::as_str),
            Some("2024-02-29")
        );
    }

    #[test]
    fn test_builder() {
        let config = GraphConfig::new().with_node(
            "log",
            NodeRecord::new("compgraph::log::BasicLogProvider").with_field("level", "warn"),
        );
        assert_eq!(config.nodes["log"].fields.len(), 1);
        assert!(config.validate().is_ok());
    }
}
