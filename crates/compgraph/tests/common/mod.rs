//! Shared fixtures for graph integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use compgraph::{
    Factory, GraphConfig, Node, NodeCore, NodeError, NodeRecord, NodeRegistry, Requires,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const LOG_LOCATOR: &str = "compgraph::log::BasicLogProvider";

/// Install env_logger once for the test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A log node that leaves the process logger alone
pub fn log_record() -> NodeRecord {
    NodeRecord::new(LOG_LOCATOR).with_field("init_logger", false)
}

/// Parse a YAML graph config, panicking with the error on failure
pub fn graph_config(yaml: &str) -> GraphConfig {
    match GraphConfig::from_yaml(yaml) {
        Ok(config) => config,
        Err(e) => panic!("invalid test config: {}", e),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DummyConfig {
    /// Fail the run hook when set
    #[serde(default)]
    pub fail_run: bool,
}

static RUNS: AtomicUsize = AtomicUsize::new(0);

/// Number of dummy run hooks executed in this test binary
pub fn dummy_runs() -> usize {
    RUNS.load(Ordering::SeqCst)
}

macro_rules! dummy {
    ($name:ident, $ns:literal) => {
        pub struct $name {
            core: NodeCore,
            fail_run: bool,
        }

        #[async_trait]
        impl Node for $name {
            fn core(&self) -> &NodeCore {
                &self.core
            }

            async fn setup(&self) -> Result<(), NodeError> {
                self.log()?.debug("setup");
                Ok(())
            }

            async fn run(&self) -> Result<(), NodeError> {
                RUNS.fetch_add(1, Ordering::SeqCst);
                if self.fail_run {
                    return Err(NodeError::Runtime(format!("{} failed", $ns)));
                }
                Ok(())
            }
        }

        impl Factory for $name {
            const NAMESPACE: &'static str = $ns;
            type Config = DummyConfig;

            fn requires() -> Requires {
                Requires::logged()
            }

            fn new(config: DummyConfig) -> Result<Self, NodeError> {
                Ok(Self {
                    core: NodeCore::new(),
                    fail_run: config.fail_run,
                })
            }
        }
    };
}

dummy!(DummyA, "dummy.a");
dummy!(DummyB, "dummy.b");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterConfig {
    /// Namespace the reporter reads from
    pub source: String,
}

/// Depends on whichever namespace its `source` field names
pub struct Reporter {
    core: NodeCore,
    pub source: String,
}

fn source_namespace(record: &NodeRecord) -> BTreeSet<String> {
    record
        .fields
        .get("source")
        .and_then(|value| value.as_str())
        .map(|source| BTreeSet::from([source.to_string()]))
        .unwrap_or_default()
}

impl Node for Reporter {
    fn core(&self) -> &NodeCore {
        &self.core
    }
}

impl Factory for Reporter {
    const NAMESPACE: &'static str = "report";
    type Config = ReporterConfig;

    fn requires() -> Requires {
        Requires::logged().resolver(source_namespace)
    }

    fn new(config: ReporterConfig) -> Result<Self, NodeError> {
        Ok(Self {
            core: NodeCore::new(),
            source: config.source,
        })
    }
}

/// Built-in node types plus the dummies
pub fn test_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::with_builtins();
    registry
        .register_type::<DummyA>("tests::DummyA")
        .register_type::<DummyB>("tests::DummyB")
        .register_type::<Reporter>("tests::Reporter");
    registry
}
