//! Graph orchestration: instantiate factories, wire subgraphs, drive hooks

use std::any::{type_name, Any};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use super::export::DependencyGraph;
use super::group::TaskGroup;
use crate::config::{GraphConfig, NodeRegistry};
use crate::error::GraphError;
use crate::namespace::{Namespace, NamespaceError, NamespaceRef};
use crate::node::{start_node, Factory, Node, LOG_NAMESPACE};
use crate::nodes::log::{LogProvider, NodeLogger};

/// A factory bound into a graph.
///
/// Cloning is cheap and shares the underlying node. Two handles are equal
/// when they belong to the same namespace.
#[derive(Clone)]
pub struct FactoryHandle {
    namespace: &'static str,
    locator: String,
    node: Arc<dyn Node>,
    concrete: Arc<dyn Any + Send + Sync>,
    capabilities: Vec<Arc<dyn Any + Send + Sync>>,
}

impl FactoryHandle {
    /// Wrap a constructed factory. Each capability is an `Arc<Arc<dyn I>>`
    /// erased to `Any`.
    pub(crate) fn new<F: Factory>(
        locator: String,
        node: Arc<F>,
        capabilities: Vec<Arc<dyn Any + Send + Sync>>,
    ) -> Self {
        Self {
            namespace: F::NAMESPACE,
            locator,
            node: node.clone(),
            concrete: node,
            capabilities,
        }
    }

    /// The factory's static namespace
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Registry key the factory was built from
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn node(&self) -> &Arc<dyn Node> {
        &self.node
    }

    /// The factory as its concrete type
    pub fn downcast<F: Any + Send + Sync>(&self) -> Option<Arc<F>> {
        self.concrete.clone().downcast::<F>().ok()
    }

    /// The factory as one of the capability traits it was registered with
    pub fn capability<I: ?Sized + 'static>(&self) -> Option<Arc<I>> {
        self.capabilities
            .iter()
            .find_map(|capability| capability.downcast_ref::<Arc<I>>())
            .cloned()
    }
}

impl PartialEq for FactoryHandle {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
    }
}

impl Eq for FactoryHandle {}

impl Hash for FactoryHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
    }
}

impl fmt::Debug for FactoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryHandle")
            .field("namespace", &self.namespace)
            .field("locator", &self.locator)
            .field("state", &self.node.state())
            .finish()
    }
}

/// A namespace store of factories plus the orchestration around it.
///
/// The full graph and every subgraph derived from it are separate stores
/// that point at the same node instances.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Namespace<FactoryHandle>,
}

impl Deref for Graph {
    type Target = Namespace<FactoryHandle>;

    fn deref(&self) -> &Self::Target {
        &self.nodes
    }
}

impl Graph {
    /// An empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every configured factory and inject its subgraph.
    ///
    /// All factories are bound before any subgraph is computed, so a node
    /// may depend on any namespace regardless of declaration order. Any
    /// structural error aborts the whole build.
    pub fn assemble(config: &GraphConfig, registry: &NodeRegistry) -> Result<Self, GraphError> {
        log::info!("Assembling graph with {} node(s)", config.nodes.len());

        let mut graph = Graph::new();
        for (namespace, record) in &config.nodes {
            let handle = registry.create(namespace, record)?;
            if handle.namespace() != namespace {
                return Err(GraphError::WrongNamespace {
                    locator: record.locator.clone(),
                    expected: handle.namespace().to_string(),
                    found: namespace.clone(),
                });
            }
            log::debug!("[{}] created from {}", namespace, record.locator);
            graph.nodes.set(namespace, handle)?;
        }

        for (namespace, handle) in graph.nodes.iter() {
            let node = handle.node();
            let subgraph = graph.get_subgraph(node.resolved_dependencies())?;
            log::debug!("[{}] injecting {} dependency node(s)", namespace, subgraph.len());
            node.core().inject(&namespace, subgraph)?;
        }

        Ok(graph)
    }

    /// Run every factory's setup hook as one fail-fast group.
    ///
    /// Nodes that are already ready are skipped, so a second call only
    /// retries the nodes a failed start left behind.
    pub async fn start(&self) -> Result<(), GraphError> {
        log::info!("Starting {} node(s)...", self.nodes.len());

        let mut group = TaskGroup::new("setup");
        for (namespace, handle) in self.nodes.iter() {
            let node = handle.node();
            if node.state().is_ready() {
                log::debug!("[{}] already ready", namespace);
                continue;
            }
            group.spawn(namespace, start_node(node.as_ref()));
        }
        group.join().await.map_err(GraphError::Setup)?;

        log::info!("All nodes ready");
        Ok(())
    }

    /// Assemble the graph and bring every factory to ready
    pub async fn build_from_config(
        config: &GraphConfig,
        registry: &NodeRegistry,
    ) -> Result<Self, GraphError> {
        let graph = Self::assemble(config, registry)?;
        graph.start().await?;
        Ok(graph)
    }

    /// Run every factory's run hook as one fail-fast group
    pub async fn run(&self) -> Result<(), GraphError> {
        log::info!("Running {} node(s)...", self.nodes.len());

        let mut group = TaskGroup::new("run");
        for (namespace, handle) in self.nodes.iter() {
            group.spawn(namespace, handle.node().run());
        }
        group.join().await.map_err(GraphError::Run)?;

        log::info!("All nodes finished");
        Ok(())
    }

    /// A new store holding only the requested namespaces.
    ///
    /// A namespace naming a container brings every leaf beneath it. Fails
    /// with every absent namespace at once, never a partial view.
    pub fn get_subgraph<I, S>(&self, namespaces: I) -> Result<Graph, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut subgraph = Graph::new();
        let mut missing = Vec::new();

        for namespace in namespaces {
            let namespace = namespace.as_ref();
            match self.nodes.lookup(namespace) {
                Some(NamespaceRef::Leaf(handle)) => {
                    subgraph.bind(namespace, handle.clone())?;
                }
                Some(NamespaceRef::Branch(branch)) => {
                    for (path, handle) in branch {
                        subgraph.bind(&format!("{}.{}", namespace, path), handle.clone())?;
                    }
                }
                None => missing.push(namespace.to_string()),
            }
        }

        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(GraphError::MissingDependencies(missing));
        }
        Ok(subgraph)
    }

    /// Overlapping requests bind the same handle twice; keep the first
    fn bind(&mut self, namespace: &str, handle: FactoryHandle) -> Result<(), GraphError> {
        match self.nodes.set(namespace, handle) {
            Ok(()) | Err(NamespaceError::Collision(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The node bound at `namespace`
    pub fn node(&self, namespace: &str) -> Result<&Arc<dyn Node>, GraphError> {
        Ok(self.nodes.require(namespace)?.node())
    }

    /// The factory at `namespace` as its concrete type
    pub fn get<F: Factory>(&self, namespace: &str) -> Result<Arc<F>, GraphError> {
        self.nodes
            .require(namespace)?
            .downcast::<F>()
            .ok_or_else(|| GraphError::WrongNodeType {
                namespace: namespace.to_string(),
                expected: type_name::<F>(),
            })
    }

    /// The factory at `namespace` through a capability trait
    pub fn interface<I: ?Sized + 'static>(&self, namespace: &str) -> Result<Arc<I>, GraphError> {
        self.nodes
            .require(namespace)?
            .capability::<I>()
            .ok_or_else(|| GraphError::WrongNodeType {
                namespace: namespace.to_string(),
                expected: type_name::<I>(),
            })
    }

    /// A named logger from the `log` node
    pub fn log(&self, name: &str) -> Result<NodeLogger, GraphError> {
        Ok(self.interface::<dyn LogProvider>(LOG_NAMESPACE)?.logger(name))
    }

    /// Diagnostic view of the dependency edges between bound factories
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_graph(self)
    }
}
