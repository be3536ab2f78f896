//! Namespace-addressed storage

mod store;

pub use store::*;
