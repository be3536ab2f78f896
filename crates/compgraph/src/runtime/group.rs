//! Fail-fast structured concurrency group

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

use crate::error::NodeError;

/// A named unit of work inside a [`TaskGroup`]
pub type Task<'a> = BoxFuture<'a, Result<(), NodeError>>;

/// A set of sibling tasks launched together.
///
/// Members are polled concurrently inside the caller's task. The group
/// finishes when every member has succeeded, or at the first failure, in
/// which case the remaining members are dropped before they complete.
pub struct TaskGroup<'a> {
    name: String,
    tasks: Vec<(String, Task<'a>)>,
}

impl<'a> TaskGroup<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    /// Add a member. Nothing runs until [`TaskGroup::join`].
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F) -> &mut Self
    where
        F: Future<Output = Result<(), NodeError>> + Send + 'a,
    {
        self.tasks.push((name.into(), Box::pin(task)));
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drive all members to completion, cancelling the rest on first failure
    pub async fn join(self) -> Result<(), TaskGroupError> {
        let TaskGroup { name: group, tasks } = self;
        if tasks.is_empty() {
            return Ok(());
        }

        log::debug!("[{}] running {} task(s)", group, tasks.len());

        let mut pending: Vec<String> = tasks.iter().map(|(name, _)| name.clone()).collect();
        let mut running: FuturesUnordered<_> = tasks
            .into_iter()
            .map(|(name, task)| async move { (name, task.await) })
            .collect();

        while let Some((name, result)) = running.next().await {
            pending.retain(|p| p != &name);
            if let Err(error) = result {
                // Members still in `running` are cancelled when it drops on return
                log::error!("[{}] task '{}' failed: {}", group, name, error);
                if !pending.is_empty() {
                    log::warn!("[{}] cancelled: {}", group, pending.join(", "));
                }
                return Err(TaskGroupError {
                    group,
                    task: name,
                    source: Box::new(error),
                    cancelled: pending,
                });
            }
        }

        log::debug!("[{}] all tasks completed", group);
        Ok(())
    }
}

/// The first failure of a [`TaskGroup`] and the members it cancelled
#[derive(Debug, thiserror::Error)]
#[error("Task '{task}' in group '{group}' failed: {source}")]
pub struct TaskGroupError {
    pub group: String,
    pub task: String,
    #[source]
    pub source: Box<NodeError>,
    /// Members that had not completed when the failure was observed
    pub cancelled: Vec<String>,
}
