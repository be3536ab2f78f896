//! compgraph: a declarative component-graph runtime
//!
//! # Overview
//!
//! A graph is built from a YAML mapping of namespace to node record. The
//! runtime:
//! - Instantiates one factory per namespace through a [`NodeRegistry`]
//! - Resolves each factory's declared dependencies into namespaces
//! - Injects a restricted subgraph holding only those dependencies
//! - Runs every setup hook concurrently as one fail-fast group
//! - Later runs every run hook the same way
//!
//! # Example Graph Config
//!
//! ```yaml
//! log:
//!   type: compgraph::log::BasicLogProvider
//!   level: debug
//!
//! date:
//!   type: compgraph::date::FixedDate
//!   date: "$(arg as_of)"
//!
//! calendar:
//!   type: compgraph::calendar::AllWeekDaysCalendar
//!   holidays: ["2023-01-02"]
//!
//! event_sender:
//!   type: compgraph::event::EventSenderFactory
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod namespace;
pub mod node;
pub mod nodes;
pub mod runtime;

pub use cli::GraphArgs;
pub use config::{
    ConfigError, FactoryEntry, GraphConfig, NodeRecord, NodeRegistry, SubstitutionContext,
    SubstitutionError,
};
pub use error::{GraphError, NodeError};
pub use namespace::{Namespace, NamespaceError};
pub use node::{start_node, Component, Factory, Node, NodeCore, NodeSetupState, Requires};
pub use runtime::{DependencyGraph, FactoryHandle, Graph, TaskGroup, TaskGroupError};
