//! Graph runtime: orchestration, task groups and diagnostic export

mod export;
mod graph;
mod group;

pub use export::*;
pub use graph::*;
pub use group::*;
