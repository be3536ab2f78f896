//! Graph configuration parsing, substitution and the node type registry

mod graph_file;
mod registry;
mod substitution;

pub use graph_file::*;
pub use registry::*;
pub use substitution::*;
