//! Core traits for graph nodes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use super::requires::Requires;
use super::state::NodeSetupState;
use crate::error::{GraphError, NodeError};
use crate::nodes::log::NodeLogger;
use crate::runtime::Graph;

static NO_DEPENDENCIES: BTreeSet<String> = BTreeSet::new();

/// Lifecycle bookkeeping embedded in every node.
///
/// Holds the setup state, the resolved dependency set and the injected
/// subgraph. Each concrete node owns one and hands it out through
/// [`Node::core`].
#[derive(Debug, Default)]
pub struct NodeCore {
    state: Mutex<NodeSetupState>,
    resolved: OnceLock<BTreeSet<String>>,
    deps: OnceLock<Graph>,
}

impl NodeCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NodeSetupState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: NodeSetupState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Concrete namespaces this node depends on (empty before resolution)
    pub fn resolved_dependencies(&self) -> &BTreeSet<String> {
        self.resolved.get().unwrap_or(&NO_DEPENDENCIES)
    }

    /// The injected subgraph, if any
    pub fn subgraph(&self) -> Option<&Graph> {
        self.deps.get()
    }

    /// Record the resolved dependency set. Only the first call has effect.
    pub(crate) fn resolve(&self, dependencies: BTreeSet<String>) {
        if self.resolved.set(dependencies).is_ok() {
            self.set_state(NodeSetupState::DepsResolved);
        }
    }

    pub(crate) fn inject(&self, name: &str, subgraph: Graph) -> Result<(), GraphError> {
        self.deps
            .set(subgraph)
            .map_err(|_| GraphError::AlreadyInjected(name.to_string()))?;
        self.set_state(NodeSetupState::DepsAvailable);
        Ok(())
    }
}

/// A lifecycle-bearing unit of the graph.
///
/// Both hooks are optional: nodes that need no setup go straight to
/// [`NodeSetupState::Ready`] once the graph starts them.
#[async_trait]
pub trait Node: Send + Sync + 'static {
    /// Lifecycle bookkeeping for this instance
    fn core(&self) -> &NodeCore;

    /// Name used in logs and error messages
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }

    /// Called once after dependencies are injected.
    ///
    /// Dependencies are structurally available, but their own setup may
    /// still be in progress.
    async fn setup(&self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Long-running work, driven by [`Graph::run`]
    async fn run(&self) -> Result<(), NodeError> {
        Ok(())
    }

    fn state(&self) -> NodeSetupState {
        self.core().state()
    }

    fn resolved_dependencies(&self) -> &BTreeSet<String> {
        self.core().resolved_dependencies()
    }

    /// The restricted view of the graph holding this node's dependencies
    fn dep(&self) -> Result<&Graph, GraphError> {
        self.core()
            .subgraph()
            .ok_or_else(|| GraphError::DependenciesNotReady(self.name()))
    }
}

/// A node bound to one static top-level namespace, built from configuration.
pub trait Factory: Node + Sized {
    /// The namespace this factory must be configured under
    const NAMESPACE: &'static str;

    /// Typed configuration, deserialized from the record's remaining fields
    type Config: DeserializeOwned;

    /// Declared dependencies of this type
    fn requires() -> Requires;

    /// Construct from a validated configuration
    fn new(config: Self::Config) -> Result<Self, NodeError>;

    /// Logger named after this factory's namespace
    fn log(&self) -> Result<NodeLogger, GraphError> {
        self.dep()?.log(Self::NAMESPACE)
    }

    /// Wire a freshly constructed component into this factory's subgraph.
    ///
    /// The component's view is carved out of the factory's own subgraph, so
    /// it can never reach further than the factory does. The returned
    /// component is in [`NodeSetupState::DepsAvailable`]; drive it to ready
    /// with [`start_node`].
    fn create_component<C: Component>(&self, component: C) -> Result<Arc<C>, GraphError> {
        let dependencies = C::requires().resolve(None);
        component.core().resolve(dependencies);

        let subgraph = self
            .dep()?
            .get_subgraph(component.core().resolved_dependencies())?;
        component.core().inject(&component.name(), subgraph)?;

        Ok(Arc::new(component))
    }
}

/// A node manufactured on demand by a [`Factory`].
pub trait Component: Node + Sized {
    /// Declared dependencies of this type
    fn requires() -> Requires {
        Requires::logged()
    }

    /// Logger named after this component
    fn log(&self) -> Result<NodeLogger, GraphError> {
        self.dep()?.log(&self.name())
    }
}

/// Run a node's setup hook, moving it through `Starting` to `Ready`.
pub async fn start_node(node: &dyn Node) -> Result<(), NodeError> {
    node.core().set_state(NodeSetupState::Starting);
    log::debug!("[{}] setup starting", node.name());
    node.setup().await?;
    node.core().set_state(NodeSetupState::Ready);
    log::debug!("[{}] ready", node.name());
    Ok(())
}

fn short_type_name(full: &str) -> &str {
    // Only the outer path is trimmed; generic arguments keep theirs.
    // `path` is a prefix of `full`, so offsets into it are offsets into `full`.
    let path = &full[..full.find('<').unwrap_or(full.len())];
    let start = path.rfind("::").map_or(0, |idx| idx + 2);
    &full[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare {
        core: NodeCore,
    }

    impl Node for Bare {
        fn core(&self) -> &NodeCore {
            &self.core
        }
    }

    #[test]
    fn test_dep_before_injection_is_not_ready() {
        let node = Bare {
            core: NodeCore::new(),
        };
        assert_eq!(node.state(), NodeSetupState::Initialized);
        assert!(matches!(
            node.dep(),
            Err(GraphError::DependenciesNotReady(name)) if name == "Bare"
        ));
    }

    #[test]
    fn test_resolve_then_inject() {
        let node = Bare {
            core: NodeCore::new(),
        };
        node.core().resolve(BTreeSet::from(["log".to_string()]));
        assert_eq!(node.state(), NodeSetupState::DepsResolved);

        node.core().inject("Bare", Graph::new()).unwrap();
        assert_eq!(node.state(), NodeSetupState::DepsAvailable);
        assert!(node.dep().is_ok());

        // Resolved set is fixed once computed
        node.core().resolve(BTreeSet::new());
        assert!(node.resolved_dependencies().contains("log"));

        assert!(matches!(
            node.core().inject("Bare", Graph::new()),
            Err(GraphError::AlreadyInjected(_))
        ));
    }

    #[tokio::test]
    async fn test_start_node_without_setup_hook() {
        let node = Bare {
            core: NodeCore::new(),
        };
        start_node(&node).await.unwrap();
        assert!(node.state().is_ready());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("compgraph::nodes::log::BasicLogProvider"), "BasicLogProvider");
        assert_eq!(
            short_type_name("compgraph::nodes::event::EventSender<my::Event>"),
            "EventSender<my::Event>"
        );
        assert_eq!(short_type_name("Plain"), "Plain");
        assert_eq!(
            short_type_name("a::b::Outer<c::Inner<d::Leaf>>"),
            "Outer<c::Inner<d::Leaf>>"
        );
        assert_eq!(short_type_name("Plain<x::Y>"), "Plain<x::Y>");
    }
}
