//! Priority-staged event fan-out.
//!
//! An [`EventSender`] holds callbacks grouped by [`CallbackPriority`].
//! Sending an event runs every callback of the highest level concurrently,
//! waits for all of them, then moves to the next level down. Senders are
//! components: [`EventSenderFactory`] creates one per payload type on first
//! request and hands out the same instance afterwards.

use futures::future::BoxFuture;
use serde::Deserialize;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::NodeError;
use crate::node::{start_node, Component, Factory, Node, NodeCore, Requires};
use crate::runtime::{TaskGroup, TaskGroupError};

/// Callback priority; higher levels run first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CallbackPriority {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
    Highest = 4,
}

impl CallbackPriority {
    /// Every level, in the order a send visits them
    pub const DESCENDING: [CallbackPriority; 4] = [
        CallbackPriority::Highest,
        CallbackPriority::High,
        CallbackPriority::Medium,
        CallbackPriority::Low,
    ];
}

impl fmt::Display for CallbackPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackPriority::Low => "low",
            CallbackPriority::Medium => "medium",
            CallbackPriority::High => "high",
            CallbackPriority::Highest => "highest",
        };
        f.write_str(name)
    }
}

type CallbackResult = BoxFuture<'static, Result<(), NodeError>>;

/// An asynchronous event handler, with or without access to the payload
pub enum Callback<E> {
    Unit(Arc<dyn Fn() -> CallbackResult + Send + Sync>),
    WithEvent(Arc<dyn Fn(Arc<E>) -> CallbackResult + Send + Sync>),
}

impl<E> Clone for Callback<E> {
    fn clone(&self) -> Self {
        match self {
            Callback::Unit(f) => Callback::Unit(f.clone()),
            Callback::WithEvent(f) => Callback::WithEvent(f.clone()),
        }
    }
}

impl<E: Send + Sync + 'static> Callback<E> {
    /// A handler that ignores the payload
    pub fn unit<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), NodeError>> + Send + 'static,
    {
        Callback::Unit(Arc::new(move || Box::pin(f()) as CallbackResult))
    }

    /// A handler that receives the payload
    pub fn with_event<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), NodeError>> + Send + 'static,
    {
        Callback::WithEvent(Arc::new(move |event| Box::pin(f(event)) as CallbackResult))
    }

    fn invoke(&self, event: &Arc<E>) -> CallbackResult {
        match self {
            Callback::Unit(f) => f(),
            Callback::WithEvent(f) => f(event.clone()),
        }
    }
}

/// Fans one payload type out to registered callbacks, highest priority first
pub struct EventSender<E> {
    core: NodeCore,
    callbacks: Mutex<BTreeMap<CallbackPriority, Vec<Callback<E>>>>,
    _event: PhantomData<fn(E)>,
}

impl<E: Send + Sync + 'static> EventSender<E> {
    pub fn new() -> Self {
        Self {
            core: NodeCore::new(),
            callbacks: Mutex::new(BTreeMap::new()),
            _event: PhantomData,
        }
    }

    /// Append a callback at `priority`. Duplicates are not detected.
    pub fn register(&self, callback: Callback<E>, priority: CallbackPriority) {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(priority)
            .or_default()
            .push(callback);
    }

    /// Append a callback at [`CallbackPriority::Low`]
    pub fn register_default(&self, callback: Callback<E>) {
        self.register(callback, CallbackPriority::default());
    }

    /// Number of callbacks registered at `priority`
    pub fn callback_count(&self, priority: CallbackPriority) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&priority)
            .map_or(0, Vec::len)
    }

    fn snapshot(&self, priority: CallbackPriority) -> Vec<Callback<E>> {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&priority)
            .cloned()
            .unwrap_or_default()
    }

    /// Deliver `event` to every callback.
    ///
    /// Every callback of a level completes before any callback of a lower
    /// level starts. The first failing callback cancels the rest of its
    /// level and the lower levels never run.
    pub async fn send(&self, event: E) -> Result<(), TaskGroupError> {
        let event = Arc::new(event);
        if let Ok(log) = self.log() {
            log.debug("Sending event");
        }

        for priority in CallbackPriority::DESCENDING {
            let callbacks = self.snapshot(priority);
            if callbacks.is_empty() {
                continue;
            }

            let mut group = TaskGroup::new(format!("{}:{}", self.name(), priority));
            for (i, callback) in callbacks.iter().enumerate() {
                group.spawn(format!("{}#{}", priority, i), callback.invoke(&event));
            }
            group.join().await?;
        }
        Ok(())
    }
}

impl<E: Send + Sync + 'static> Default for EventSender<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + Sync + 'static> Node for EventSender<E> {
    fn core(&self) -> &NodeCore {
        &self.core
    }
}

impl<E: Send + Sync + 'static> Component for EventSender<E> {}

/// `event_sender` takes no options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventSenderConfig {}

/// Factory memoizing one [`EventSender`] per payload type
pub struct EventSenderFactory {
    core: NodeCore,
    senders: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl EventSenderFactory {
    fn cached<E: Send + Sync + 'static>(&self) -> Option<Arc<EventSender<E>>> {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .and_then(|sender| sender.clone().downcast::<EventSender<E>>().ok())
    }

    /// The sender for payload type `E`, created and started on first use
    pub async fn sender<E: Send + Sync + 'static>(&self) -> Result<Arc<EventSender<E>>, NodeError> {
        if let Some(sender) = self.cached::<E>() {
            return Ok(sender);
        }

        self.log()?
            .debug(format!("Creating EventSender for {}", std::any::type_name::<E>()));
        let sender = self.create_component(EventSender::<E>::new())?;
        start_node(sender.as_ref()).await?;

        // A concurrent request may have won the race while we were starting
        let stored = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(TypeId::of::<E>())
            .or_insert_with(|| sender.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        stored
            .downcast::<EventSender<E>>()
            .map_err(|_| NodeError::Runtime("Event sender registered under wrong type".into()))
    }

    /// Number of payload types with a sender
    pub fn sender_count(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Node for EventSenderFactory {
    fn core(&self) -> &NodeCore {
        &self.core
    }
}

impl Factory for EventSenderFactory {
    const NAMESPACE: &'static str = "event_sender";
    type Config = EventSenderConfig;

    fn requires() -> Requires {
        Requires::logged()
    }

    fn new(_config: EventSenderConfig) -> Result<Self, NodeError> {
        Ok(Self {
            core: NodeCore::new(),
            senders: Mutex::new(HashMap::new()),
        })
    }
}
