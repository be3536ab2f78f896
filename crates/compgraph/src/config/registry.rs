//! Explicit table of constructible node types, keyed by type locator

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::any::Any;
use std::sync::Arc;

use super::graph_file::NodeRecord;
use crate::error::GraphError;
use crate::node::{Factory, Node};
use crate::runtime::FactoryHandle;

type Upcast<F> = Box<dyn Fn(&Arc<F>) -> Arc<dyn Any + Send + Sync> + Send + Sync>;
type Constructor = Box<dyn Fn(&str, &NodeRecord) -> Result<FactoryHandle, GraphError> + Send + Sync>;

/// How to build one factory type: its capabilities and preset fields.
pub struct FactoryEntry<F: Factory> {
    capabilities: Vec<Upcast<F>>,
    defaults: Mapping,
}

impl<F: Factory> Default for FactoryEntry<F> {
    fn default() -> Self {
        Self {
            capabilities: Vec::new(),
            defaults: Mapping::new(),
        }
    }
}

impl<F: Factory> FactoryEntry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose the factory under a capability trait, reachable through
    /// [`Graph::interface`](crate::Graph::interface):
    ///
    /// ```ignore
    /// FactoryEntry::<BasicLogProvider>::new().provides(|f| f as Arc<dyn LogProvider>)
    /// ```
    pub fn provides<I>(mut self, upcast: fn(Arc<F>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.push(Box::new(move |node: &Arc<F>| {
            Arc::new(upcast(Arc::clone(node))) as Arc<dyn Any + Send + Sync>
        }));
        self
    }

    /// Field value used when the configuration record does not set it
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(Value::String(key.into()), value.into());
        self
    }

    /// Construct the factory from a record bound under `namespace`:
    /// validate its fields against `F::Config`, build it, resolve its
    /// declared dependencies.
    fn build(&self, namespace: &str, record: &NodeRecord) -> Result<FactoryHandle, GraphError> {
        let mut fields = self.defaults.clone();
        for (key, value) in &record.fields {
            fields.insert(key.clone(), value.clone());
        }

        let config: F::Config =
            serde_yaml::from_value(Value::Mapping(fields)).map_err(|source| {
                GraphError::InvalidConfig {
                    namespace: namespace.to_string(),
                    locator: record.locator.clone(),
                    source,
                }
            })?;

        let node = F::new(config).map_err(|source| GraphError::Construction {
            namespace: namespace.to_string(),
            source,
        })?;
        node.core().resolve(F::requires().resolve(Some(record)));

        let node = Arc::new(node);
        let capabilities = self.capabilities.iter().map(|upcast| upcast(&node)).collect();

        Ok(FactoryHandle::new(record.locator.clone(), node, capabilities))
    }
}

/// Maps type locators to constructors.
///
/// Populated at startup; the set of loadable types is exactly what was
/// registered.
#[derive(Default)]
pub struct NodeRegistry {
    entries: IndexMap<String, Constructor>,
}

impl NodeRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every node type shipped with this crate
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }

    /// Register a factory type under `locator`, replacing any previous entry
    pub fn register<F: Factory>(
        &mut self,
        locator: impl Into<String>,
        entry: FactoryEntry<F>,
    ) -> &mut Self {
        let locator = locator.into();
        if self.entries.contains_key(&locator) {
            log::warn!("Replacing registered node type '{}'", locator);
        }
        self.entries.insert(
            locator,
            Box::new(move |namespace: &str, record: &NodeRecord| entry.build(namespace, record)),
        );
        self
    }

    /// Register a factory type with no capabilities or presets
    pub fn register_type<F: Factory>(&mut self, locator: impl Into<String>) -> &mut Self {
        self.register(locator, FactoryEntry::<F>::new())
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.entries.contains_key(locator)
    }

    /// Registered locators, in registration order
    pub fn locators(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Instantiate the factory described by `record`, configured under
    /// `namespace`
    pub fn create(&self, namespace: &str, record: &NodeRecord) -> Result<FactoryHandle, GraphError> {
        let constructor = self
            .entries
            .get(&record.locator)
            .ok_or_else(|| GraphError::UnresolvableLocator(record.locator.clone()))?;
        constructor(namespace, record)
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
