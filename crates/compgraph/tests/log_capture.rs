//! Records emitted through node loggers, captured with a custom `log::Log`

mod common;

use common::*;
use compgraph::{Graph, GraphConfig};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::Mutex;

static CAPTURED: Mutex<Vec<(Level, String, String)>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.lock().unwrap().push((
            record.level(),
            record.target().to_string(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

// A single test: the process logger can only be installed once per binary
#[tokio::test]
async fn test_node_logger_records() {
    log::set_boxed_logger(Box::new(CaptureLogger)).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let config = GraphConfig::new().with_node("log", log_record().with_field("level", "debug"));
    let graph = Graph::build_from_config(&config, &test_registry())
        .await
        .unwrap();

    let logger = graph.log("capture").unwrap();
    logger.debug("d");
    logger.info("i");
    logger.warning("w");
    logger.error("e");
    logger.critical("c");

    let captured: Vec<(Level, String)> = CAPTURED
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, target, _)| target == "compgraph.capture")
        .map(|(level, _, message)| (*level, message.clone()))
        .collect();

    assert_eq!(
        captured,
        vec![
            (Level::Debug, "d".to_string()),
            (Level::Info, "i".to_string()),
            (Level::Warn, "w".to_string()),
            (Level::Error, "e".to_string()),
            (Level::Error, "[critical] c".to_string()),
        ]
    );

    // A warn-level logger drops debug and info
    let quiet = compgraph::nodes::log::NodeLogger::new("compgraph.quiet", LevelFilter::Warn);
    quiet.info("hidden");
    quiet.warning("shown");
    let quiet_records: Vec<String> = CAPTURED
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, target, _)| target == "compgraph.quiet")
        .map(|(_, _, message)| message.clone())
        .collect();
    assert_eq!(quiet_records, vec!["shown"]);
}
