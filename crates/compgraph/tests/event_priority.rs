//! Event sender memoization and priority staging

mod common;

use common::*;
use compgraph::nodes::event::{Callback, CallbackPriority, EventSender, EventSenderFactory};
use compgraph::{Graph, GraphConfig, Node, NodeError, NodeRecord, NodeSetupState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, PartialEq)]
struct DummyEvent {
    data: String,
}

#[derive(Debug)]
struct OtherEvent;

async fn event_graph() -> Graph {
    init_logging();
    let config = GraphConfig::new().with_node("log", log_record()).with_node(
        "event_sender",
        NodeRecord::new("compgraph::event::EventSenderFactory"),
    );
    Graph::build_from_config(&config, &test_registry())
        .await
        .unwrap()
}

/// Start and end ticks of one callback invocation
#[derive(Debug, Clone, Copy)]
struct Trace {
    priority: CallbackPriority,
    start: usize,
    end: usize,
}

fn tracing_callback(
    priority: CallbackPriority,
    clock: Arc<AtomicUsize>,
    traces: Arc<Mutex<Vec<Trace>>>,
) -> Callback<DummyEvent> {
    Callback::unit(move || {
        let clock = clock.clone();
        let traces = traces.clone();
        async move {
            let start = clock.fetch_add(1, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            let end = clock.fetch_add(1, Ordering::SeqCst);
            traces.lock().unwrap().push(Trace {
                priority,
                start,
                end,
            });
            Ok(())
        }
    })
}

#[tokio::test]
async fn test_sender_is_memoized_per_event_type() {
    let graph = event_graph().await;
    let factory = graph.get::<EventSenderFactory>("event_sender").unwrap();

    let first = factory.sender::<DummyEvent>().await.unwrap();
    let second = factory.sender::<DummyEvent>().await.unwrap();
    let other = factory.sender::<OtherEvent>().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.sender_count(), 2);
    assert_eq!(first.state(), NodeSetupState::Ready);
    assert_eq!(other.state(), NodeSetupState::Ready);

    // A component only reaches what its factory reaches
    assert_eq!(first.dep().unwrap().keys().collect::<Vec<_>>(), vec!["log"]);
}

#[tokio::test]
async fn test_higher_priorities_finish_first() {
    let graph = event_graph().await;
    let factory = graph.get::<EventSenderFactory>("event_sender").unwrap();
    let sender: Arc<EventSender<DummyEvent>> = factory.sender().await.unwrap();

    let clock = Arc::new(AtomicUsize::new(0));
    let traces = Arc::new(Mutex::new(Vec::new()));

    // Registered lowest first so that registration order cannot explain the result
    for priority in [
        CallbackPriority::Low,
        CallbackPriority::Medium,
        CallbackPriority::High,
    ] {
        for _ in 0..2 {
            sender.register(
                tracing_callback(priority, clock.clone(), traces.clone()),
                priority,
            );
        }
    }

    sender
        .send(DummyEvent {
            data: "expected".into(),
        })
        .await
        .unwrap();

    let traces = traces.lock().unwrap().clone();
    assert_eq!(traces.len(), 6);
    for higher in &traces {
        for lower in traces.iter().filter(|t| t.priority < higher.priority) {
            assert!(
                higher.end < lower.start,
                "{:?} callback overlapped {:?} callback",
                higher.priority,
                lower.priority
            );
        }
    }
}

#[tokio::test]
async fn test_same_priority_runs_concurrently() {
    let graph = event_graph().await;
    let factory = graph.get::<EventSenderFactory>("event_sender").unwrap();
    let sender = factory.sender::<DummyEvent>().await.unwrap();

    // Each callback waits for the other; only concurrent execution completes
    let (tx_a, rx_a) = oneshot::channel::<()>();
    let (tx_b, rx_b) = oneshot::channel::<()>();
    let tx_a = Arc::new(Mutex::new(Some(tx_a)));
    let rx_a = Arc::new(Mutex::new(Some(rx_a)));
    let tx_b = Arc::new(Mutex::new(Some(tx_b)));
    let rx_b = Arc::new(Mutex::new(Some(rx_b)));

    sender.register(
        Callback::unit(move || {
            let tx = tx_a.lock().unwrap().take();
            let rx = rx_b.lock().unwrap().take();
            async move {
                if let Some(tx) = tx {
                    let _ = tx.send(());
                }
                if let Some(rx) = rx {
                    rx.await.map_err(|e| NodeError::Runtime(e.to_string()))?;
                }
                Ok(())
            }
        }),
        CallbackPriority::Medium,
    );
    sender.register(
        Callback::unit(move || {
            let tx = tx_b.lock().unwrap().take();
            let rx = rx_a.lock().unwrap().take();
            async move {
                if let Some(rx) = rx {
                    rx.await.map_err(|e| NodeError::Runtime(e.to_string()))?;
                }
                if let Some(tx) = tx {
                    let _ = tx.send(());
                }
                Ok(())
            }
        }),
        CallbackPriority::Medium,
    );

    tokio::time::timeout(
        Duration::from_secs(5),
        sender.send(DummyEvent {
            data: "handshake".into(),
        }),
    )
    .await
    .expect("callbacks at one priority did not run concurrently")
    .unwrap();
}

#[tokio::test]
async fn test_callback_receives_payload() {
    let graph = event_graph().await;
    let factory = graph.get::<EventSenderFactory>("event_sender").unwrap();
    let sender = factory.sender::<DummyEvent>().await.unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    {
        let received = received.clone();
        sender.register_default(Callback::with_event(move |event: Arc<DummyEvent>| {
            let received = received.clone();
            async move {
                received.lock().unwrap().push(event.data.clone());
                Ok(())
            }
        }));
    }

    sender
        .send(DummyEvent {
            data: "first".into(),
        })
        .await
        .unwrap();
    sender
        .send(DummyEvent {
            data: "second".into(),
        })
        .await
        .unwrap();

    assert_eq!(*received.lock().unwrap(), vec!["first", "second"]);
}

#[tokio::test]
async fn test_senders_do_not_share_callbacks() {
    let graph = event_graph().await;
    let factory = graph.get::<EventSenderFactory>("event_sender").unwrap();
    let dummy = factory.sender::<DummyEvent>().await.unwrap();
    let other = factory.sender::<OtherEvent>().await.unwrap();

    dummy.register_default(Callback::unit(|| async { Ok(()) }));
    assert_eq!(dummy.callback_count(CallbackPriority::Low), 1);
    assert_eq!(other.callback_count(CallbackPriority::Low), 0);
}
