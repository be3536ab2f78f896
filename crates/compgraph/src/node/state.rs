use std::fmt;

/// States a node passes through while its graph is being wired and started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum NodeSetupState {
    /// Node was constructed from its configuration
    #[default]
    Initialized,
    /// Declared dependencies were expanded into concrete namespaces
    DepsResolved,
    /// The restricted subgraph of dependencies was injected
    DepsAvailable,
    /// The setup hook is running
    Starting,
    /// The setup hook completed
    Ready,
}

impl NodeSetupState {
    pub fn is_ready(&self) -> bool {
        *self == NodeSetupState::Ready
    }

    /// Whether the dependency accessor may be used
    pub fn has_dependencies(&self) -> bool {
        *self >= NodeSetupState::DepsAvailable
    }
}

impl fmt::Display for NodeSetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeSetupState::Initialized => "initialized",
            NodeSetupState::DepsResolved => "deps_resolved",
            NodeSetupState::DepsAvailable => "deps_available",
            NodeSetupState::Starting => "starting",
            NodeSetupState::Ready => "ready",
        };
        f.write_str(name)
    }
}
