//! Node abstractions: lifecycle state, dependency declarations and the
//! `Node` / `Factory` / `Component` capability traits.
//!
//! A node moves through five states:
//!
//! 1. `Initialized` - constructed from its configuration
//! 2. `DepsResolved` - declared dependencies expanded into namespaces
//! 3. `DepsAvailable` - restricted subgraph injected
//! 4. `Starting` - setup hook running
//! 5. `Ready` - setup hook done

mod requires;
mod state;
mod traits;

pub use requires::{DependencyResolver, Requires, LOG_NAMESPACE};
pub use state::NodeSetupState;
pub use traits::{start_node, Component, Factory, Node, NodeCore};
