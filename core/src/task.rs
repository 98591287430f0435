//! One-shot results of native SDK calls.
//!
//! The native SDKs report asynchronous results through completion callbacks that
//! fire on whatever thread the SDK chooses. [`AppCenterTask`] adapts that into a
//! single-assignment value the host can poll, chain with continuations, block on,
//! or `.await`.
//!
//! ```text
//! native callback ──> TaskCompleter::complete ──> set_result
//!                                                   │
//!                          continuations (registration order, completing thread)
//!                                                   │
//!                                  wait() / .await / map() consumers
//! ```

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task result was already set")]
    AlreadyCompleted,
    #[error("task was dropped before it completed")]
    Abandoned,
}

type Continuation<T> = Box<dyn FnOnce(&AppCenterTask<T>) + Send>;

struct TaskState<T> {
    result: Option<T>,
    continuations: Vec<Continuation<T>>,
}

/// Eventual result of a one-shot native operation.
///
/// Cloning is cheap and every clone observes the same result.
pub struct AppCenterTask<T = ()> {
    state: Arc<Mutex<TaskState<T>>>,
}

impl<T> Clone for AppCenterTask<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for AppCenterTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("AppCenterTask")
            .field("completed", &state.result.is_some())
            .field("continuations", &state.continuations.len())
            .finish()
    }
}

impl<T: Send + 'static> Default for AppCenterTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AppCenterTask<T> {
    fn lock(&self) -> MutexGuard<'_, TaskState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.lock().result.is_some()
    }
}

impl<T: Send + 'static> AppCenterTask<T> {
    /// A pending task with no result and no continuations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TaskState {
                result: None,
                continuations: Vec::new(),
            })),
        }
    }

    /// A task that is already completed with `value`.
    #[must_use]
    pub fn completed(value: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(TaskState {
                result: Some(value),
                continuations: Vec::new(),
            })),
        }
    }

    /// A pending task together with the only handle native glue should use to
    /// complete it.
    #[must_use]
    pub fn pending() -> (TaskCompleter<T>, Self) {
        let task = Self::new();
        (TaskCompleter { task: task.clone() }, task)
    }

    /// Store the result and run every registered continuation in registration
    /// order on the calling thread.
    pub fn set_result(&self, value: T) -> Result<(), TaskError> {
        let continuations = {
            let mut state = self.lock();
            if state.result.is_some() {
                tracing::error!("AppCenterTask result set more than once");
                return Err(TaskError::AlreadyCompleted);
            }
            state.result = Some(value);
            std::mem::take(&mut state.continuations)
        };
        for continuation in continuations {
            continuation(self);
        }
        Ok(())
    }

    /// Run `callback` once the task completes.
    ///
    /// Runs immediately on the calling thread when the task is already complete.
    pub fn continue_with<F>(&self, callback: F)
    where
        F: FnOnce(&AppCenterTask<T>) + Send + 'static,
    {
        {
            let mut state = self.lock();
            if state.result.is_none() {
                state.continuations.push(Box::new(callback));
                return;
            }
        }
        callback(self);
    }
}

impl<T: Clone + Send + 'static> AppCenterTask<T> {
    /// The result, if the task has completed.
    #[must_use]
    pub fn result(&self) -> Option<T> {
        self.lock().result.clone()
    }

    /// Derive a task that completes with `f(result)` after this one completes.
    pub fn map<U, F>(&self, f: F) -> AppCenterTask<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let (completer, derived) = AppCenterTask::pending();
        self.continue_with(move |source| {
            if let Some(value) = source.result() {
                completer.complete(f(value));
            }
        });
        derived
    }

    /// Block the calling thread until the task completes.
    ///
    /// A completed task returns at once, from any context. A pending task must
    /// not be waited on from inside an async runtime; `.await` it there. A task
    /// that is never completed blocks forever.
    pub fn wait(&self) -> Result<T, TaskError> {
        if let Some(value) = self.result() {
            return Ok(value);
        }
        let receiver = self.subscribe();
        receiver.blocking_recv().map_err(|_| TaskError::Abandoned)
    }

    fn subscribe(&self) -> oneshot::Receiver<T> {
        let (sender, receiver) = oneshot::channel();
        self.continue_with(move |task| {
            if let Some(value) = task.result() {
                let _ = sender.send(value);
            }
        });
        receiver
    }
}

impl<T: Clone + Send + 'static> IntoFuture for AppCenterTask<T> {
    type Output = Result<T, TaskError>;
    type IntoFuture = TaskAwaiter<T>;

    fn into_future(self) -> Self::IntoFuture {
        TaskAwaiter {
            receiver: self.subscribe(),
        }
    }
}

/// Future returned by awaiting an [`AppCenterTask`].
///
/// Resolves with [`TaskError::Abandoned`] when every handle that could complete
/// the task has been dropped.
#[derive(Debug)]
pub struct TaskAwaiter<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for TaskAwaiter<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| TaskError::Abandoned))
    }
}

/// Write half of a pending [`AppCenterTask`].
///
/// Completing consumes the completer, so a native callback holding one can
/// deliver at most one result through it.
pub struct TaskCompleter<T> {
    task: AppCenterTask<T>,
}

impl<T> fmt::Debug for TaskCompleter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCompleter")
            .field("task", &self.task)
            .finish()
    }
}

impl<T: Send + 'static> TaskCompleter<T> {
    pub fn complete(self, value: T) {
        // set_result already logs the double completion.
        let _ = self.task.set_result(value);
    }
}
