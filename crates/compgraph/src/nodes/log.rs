//! Log provider node: hands out named loggers backed by the `log` facade

use log::{Level, LevelFilter};
use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::NodeError;
use crate::node::{Factory, Node, NodeCore, Requires};

/// Capability of the node bound at the `log` namespace
pub trait LogProvider: Send + Sync {
    /// A logger for `name`
    fn logger(&self, name: &str) -> NodeLogger;
}

/// A named logger with its own level threshold.
///
/// Records go through the global `log` facade with the logger's name as
/// their target, so whatever logger the process installed decides where
/// they end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLogger {
    target: String,
    level: LevelFilter,
}

impl NodeLogger {
    pub fn new(target: impl Into<String>, level: LevelFilter) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    fn emit(&self, level: Level, message: impl Display) {
        if self.enabled(level) {
            log::log!(target: self.target.as_str(), level, "{}", message);
        }
    }

    pub fn debug(&self, message: impl Display) {
        self.emit(Level::Debug, message);
    }

    pub fn info(&self, message: impl Display) {
        self.emit(Level::Info, message);
    }

    pub fn warning(&self, message: impl Display) {
        self.emit(Level::Warn, message);
    }

    pub fn error(&self, message: impl Display) {
        self.emit(Level::Error, message);
    }

    /// `log` has no level above error; critical records are errors tagged
    /// with a `[critical]` prefix.
    pub fn critical(&self, message: impl Display) {
        self.emit(Level::Error, format_args!("[critical] {}", message));
    }
}

/// Parse a level name, accepting `warning` and `critical` as aliases
pub fn parse_level(level: &str) -> Result<LevelFilter, NodeError> {
    let normalized = match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" => "error".to_string(),
        other => other.to_string(),
    };
    LevelFilter::from_str(&normalized)
        .map_err(|_| NodeError::Config(format!("Unknown log level '{}'", level)))
}

fn default_level() -> String {
    "info".to_string()
}

fn default_name() -> String {
    "compgraph".to_string()
}

fn default_init_logger() -> bool {
    true
}

/// Configuration for [`BasicLogProvider`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicLogConfig {
    /// Threshold for every logger handed out
    #[serde(default = "default_level")]
    pub level: String,

    /// Prefix of every logger target
    #[serde(default = "default_name")]
    pub name: String,

    /// Install `env_logger` during setup unless a logger already exists
    #[serde(default = "default_init_logger")]
    pub init_logger: bool,
}

/// Log provider configured from a level and a base name.
///
/// The logger for `name` has target `<base>.<name>`.
pub struct BasicLogProvider {
    core: NodeCore,
    name: String,
    level: LevelFilter,
    init_logger: bool,
}

impl LogProvider for BasicLogProvider {
    fn logger(&self, name: &str) -> NodeLogger {
        NodeLogger::new(format!("{}.{}", self.name, name), self.level)
    }
}

#[async_trait::async_trait]
impl Node for BasicLogProvider {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    async fn setup(&self) -> Result<(), NodeError> {
        if self.init_logger {
            let env = env_logger::Env::default().default_filter_or(self.level.as_str());
            if env_logger::Builder::from_env(env).try_init().is_err() {
                log::debug!("A logger is already installed; keeping it");
            }
        }
        Ok(())
    }
}

impl Factory for BasicLogProvider {
    const NAMESPACE: &'static str = "log";
    type Config = BasicLogConfig;

    fn requires() -> Requires {
        Requires::none()
    }

    fn new(config: BasicLogConfig) -> Result<Self, NodeError> {
        if config.name.is_empty() {
            return Err(NodeError::Config("Logger name must not be empty".into()));
        }
        Ok(Self {
            core: NodeCore::new(),
            level: parse_level(&config.level)?,
            name: config.name,
            init_logger: config.init_logger,
        })
    }
}
