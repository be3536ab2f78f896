//! Error types for graph construction and node operation.

use thiserror::Error;

use crate::namespace::NamespaceError;
use crate::runtime::TaskGroupError;

/// Errors raised while wiring or driving a [`Graph`](crate::Graph).
#[derive(Debug, Error)]
pub enum GraphError {
    /// Malformed path, collision or traversal through a leaf
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    /// One or more requested namespaces are not bound in the graph
    #[error("Missing dependencies: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    /// A factory was configured under a key other than its static namespace
    #[error("Expected `{locator}` to be registered under `{expected}`, got `{found}`")]
    WrongNamespace {
        locator: String,
        expected: String,
        found: String,
    },

    /// The dependency accessor was used before the subgraph was injected
    #[error("Dependencies for `{0}` node are not ready")]
    DependenciesNotReady(String),

    /// A subgraph was injected twice into the same node
    #[error("Dependencies for `{0}` node were already injected")]
    AlreadyInjected(String),

    /// No constructor is registered for a type locator
    #[error("Could not locate: `{0}`")]
    UnresolvableLocator(String),

    /// The configuration record does not match the node's schema
    #[error("Invalid configuration for '{namespace}' ({locator}): {source}")]
    InvalidConfig {
        namespace: String,
        locator: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The node's constructor rejected its configuration
    #[error("Failed to construct '{namespace}': {source}")]
    Construction {
        namespace: String,
        #[source]
        source: NodeError,
    },

    /// A typed lookup asked for the wrong concrete type or capability
    #[error("Node '{namespace}' does not provide `{expected}`")]
    WrongNodeType {
        namespace: String,
        expected: &'static str,
    },

    #[error("Graph setup failed: {0}")]
    Setup(#[source] TaskGroupError),

    #[error("Graph run failed: {0}")]
    Run(#[source] TaskGroupError),
}

/// Errors returned by node hooks and node-level helpers.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Invalid or inconsistent configuration values
    #[error("Config error: {0}")]
    Config(String),

    /// Node initialization failed
    #[error("Init error: {0}")]
    Init(String),

    /// Runtime error during node execution
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A graph operation performed by the node failed
    #[error("Graph error: {0}")]
    Graph(Box<GraphError>),

    /// A task group started by the node failed
    #[error("Task group error: {0}")]
    Group(#[from] TaskGroupError),

    /// Generic I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GraphError> for NodeError {
    fn from(err: GraphError) -> Self {
        NodeError::Graph(Box::new(err))
    }
}

impl From<NamespaceError> for NodeError {
    fn from(err: NamespaceError) -> Self {
        NodeError::Graph(Box::new(GraphError::Namespace(err)))
    }
}
