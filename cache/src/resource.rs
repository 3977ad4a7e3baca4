//! A `Resource` wraps a single asynchronous operation behind a synchronous,
//! non-blocking probe.
//!
//! The operation is started eagerly when the resource is created. Callers
//! probe the resource and get back one of three answers: the value is not
//! available yet (together with a [`Settled`] signal to suspend on), the
//! value, or the failure. Once the operation settles the answer never changes.

use crate::error::ResourceError;
use crate::runtime::TaskSpawner;
use crate::waiter::{Waiter, WaiterQueue};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use parking_lot::Mutex;

/// The lifecycle state of a `Resource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  /// The operation has not produced a result yet.
  Pending,
  /// The operation produced a value.
  Success,
  /// The operation produced an error.
  Failure,
  /// The operation was dropped before producing anything.
  Abandoned,
}

enum State<T, E> {
  Pending(WaiterQueue),
  Success(Arc<T>),
  Failure(Arc<E>),
  Abandoned,
}

impl<T, E> State<T, E> {
  fn status(&self) -> Status {
    match self {
      State::Pending(_) => Status::Pending,
      State::Success(_) => Status::Success,
      State::Failure(_) => Status::Failure,
      State::Abandoned => Status::Abandoned,
    }
  }
}

struct Inner<T, E> {
  state: Mutex<State<T, E>>,
}

impl<T, E> Inner<T, E> {
  /// Moves a pending resource into its terminal state and wakes all waiters.
  /// Returns `false` if the resource had already settled.
  fn settle(&self, terminal: State<T, E>) -> bool {
    let mut waiters = {
      let mut state = self.state.lock();
      match std::mem::replace(&mut *state, terminal) {
        State::Pending(waiters) => waiters,
        // First settlement wins.
        settled => {
          *state = settled;
          return false;
        }
      }
    };
    // Wake outside the lock; woken tasks immediately re-probe.
    waiters.wake_all();
    true
  }
}

/// The result of a non-blocking [`Resource::probe`].
#[derive(Debug)]
pub enum Probe<T, E> {
  /// Not available yet. Suspend on the signal, then probe again.
  Pending(Settled<T, E>),
  /// The operation succeeded.
  Ready(Arc<T>),
  /// The operation failed.
  Failed(Arc<E>),
}

impl<T, E> Probe<T, E> {
  pub fn is_pending(&self) -> bool {
    matches!(self, Probe::Pending(_))
  }
}

/// A settled resource: either its value or its error.
#[derive(Debug)]
pub enum Outcome<T, E> {
  Ready(Arc<T>),
  Failed(Arc<E>),
}

impl<T, E> Outcome<T, E> {
  /// Converts the outcome into a standard `Result`.
  pub fn into_result(self) -> Result<Arc<T>, Arc<E>> {
    match self {
      Outcome::Ready(value) => Ok(value),
      Outcome::Failed(error) => Err(error),
    }
  }
}

/// A handle to one asynchronous operation and its eventual result.
///
/// Cloning is cheap and every clone observes the same state.
pub struct Resource<T, E> {
  inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for Resource<T, E> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<T, E> fmt::Debug for Resource<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Resource")
      .field("status", &self.status())
      .finish_non_exhaustive()
  }
}

impl<T, E> Resource<T, E> {
  /// Creates an unsettled resource and the `Completer` that settles it.
  ///
  /// Dropping the completer without settling leaves the resource abandoned.
  pub fn pending() -> (Self, Completer<T, E>) {
    let inner = Arc::new(Inner {
      state: Mutex::new(State::Pending(WaiterQueue::default())),
    });
    let completer = Completer {
      inner: Some(inner.clone()),
    };
    (Self { inner }, completer)
  }

  /// Creates a resource that is already settled with `value`.
  pub fn ready(value: T) -> Self {
    Self::with_state(State::Success(Arc::new(value)))
  }

  /// Creates a resource that is already settled with `error`.
  pub fn failed(error: E) -> Self {
    Self::with_state(State::Failure(Arc::new(error)))
  }

  fn with_state(state: State<T, E>) -> Self {
    Self {
      inner: Arc::new(Inner {
        state: Mutex::new(state),
      }),
    }
  }

  /// Starts `operation` on `spawner` right away and returns its resource.
  ///
  /// If the spawned task is dropped before finishing (it panicked, or the
  /// runtime shut down) the resource becomes abandoned.
  pub fn spawn<F>(spawner: &dyn TaskSpawner, operation: F) -> Self
  where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
  {
    let (resource, completer) = Self::pending();
    spawner.spawn(
      async move {
        completer.complete(operation.await);
      }
      .boxed(),
    );
    resource
  }

  /// Starts a blocking `operation` on a dedicated thread right away and
  /// returns its resource.
  pub fn spawn_blocking<F>(operation: F) -> Self
  where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
  {
    let (resource, completer) = Self::pending();
    thread::spawn(move || {
      completer.complete(operation());
    });
    resource
  }

  /// Reports the resource's state without blocking.
  ///
  /// After the resource settles every call returns the same value or error.
  pub fn probe(&self) -> Result<Probe<T, E>, ResourceError> {
    let state = self.inner.state.lock();
    match &*state {
      State::Pending(_) => Ok(Probe::Pending(Settled {
        inner: self.inner.clone(),
        slot: None,
      })),
      State::Success(value) => Ok(Probe::Ready(value.clone())),
      State::Failure(error) => Ok(Probe::Failed(error.clone())),
      State::Abandoned => Err(ResourceError::Abandoned),
    }
  }

  /// Waits asynchronously until the resource settles.
  pub async fn resolve(&self) -> Result<Outcome<T, E>, ResourceError> {
    loop {
      match self.probe()? {
        Probe::Pending(settled) => settled.await,
        Probe::Ready(value) => return Ok(Outcome::Ready(value)),
        Probe::Failed(error) => return Ok(Outcome::Failed(error)),
      }
    }
  }

  /// Blocks the current thread until the resource settles.
  pub fn resolve_blocking(&self) -> Result<Outcome<T, E>, ResourceError> {
    loop {
      match self.probe()? {
        Probe::Pending(settled) => settled.wait(),
        Probe::Ready(value) => return Ok(Outcome::Ready(value)),
        Probe::Failed(error) => return Ok(Outcome::Failed(error)),
      }
    }
  }

  pub fn status(&self) -> Status {
    self.inner.state.lock().status()
  }

  /// Returns how many `Settled` signals are currently parked on this
  /// resource. Always zero once it has settled.
  pub fn waiting(&self) -> usize {
    match &*self.inner.state.lock() {
      State::Pending(waiters) => waiters.len(),
      _ => 0,
    }
  }

  /// Returns `true` once the resource has left the pending state.
  pub fn is_settled(&self) -> bool {
    self.status() != Status::Pending
  }

  /// Returns `true` if both handles refer to the same resource.
  pub fn ptr_eq(this: &Self, other: &Self) -> bool {
    Arc::ptr_eq(&this.inner, &other.inner)
  }
}

/// The write side of a pending `Resource`.
pub struct Completer<T, E> {
  inner: Option<Arc<Inner<T, E>>>,
}

impl<T, E> Completer<T, E> {
  /// Settles the resource with a value.
  pub fn succeed(self, value: T) {
    self.settle(State::Success(Arc::new(value)));
  }

  /// Settles the resource with an error.
  pub fn fail(self, error: E) {
    self.settle(State::Failure(Arc::new(error)));
  }

  /// Settles the resource from a `Result`.
  pub fn complete(self, result: Result<T, E>) {
    match result {
      Ok(value) => self.succeed(value),
      Err(error) => self.fail(error),
    }
  }

  fn settle(mut self, terminal: State<T, E>) {
    if let Some(inner) = self.inner.take() {
      inner.settle(terminal);
    }
  }
}

impl<T, E> fmt::Debug for Completer<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Completer").finish_non_exhaustive()
  }
}

impl<T, E> Drop for Completer<T, E> {
  fn drop(&mut self) {
    if let Some(inner) = self.inner.take() {
      if inner.settle(State::Abandoned) {
        tracing::warn!("resource operation dropped before settling; resource abandoned");
      }
    }
  }
}

/// Completion signal of a pending `Resource`.
///
/// Await it from async code or call [`Settled::wait`] from a thread. Either
/// way it returns once the resource has settled; probe again for the result.
/// Dropping a signal that is still queued (a cancelled task, an expired
/// `wait_timeout`) removes it from the resource's waiters.
#[must_use = "a settled signal does nothing unless awaited or waited on"]
pub struct Settled<T, E> {
  inner: Arc<Inner<T, E>>,
  slot: Option<u64>,
}

impl<T, E> fmt::Debug for Settled<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Settled").finish_non_exhaustive()
  }
}

impl<T, E> Settled<T, E> {
  /// Queues `waiter` unless the resource already settled.
  /// Returns `true` if the resource has settled.
  fn register(&mut self, waiter: Waiter) -> bool {
    let mut state = self.inner.state.lock();
    match &mut *state {
      State::Pending(waiters) => {
        self.slot = Some(waiters.register(self.slot, waiter));
        false
      }
      _ => true,
    }
  }

  /// Parks the current thread until the resource settles.
  pub fn wait(mut self) {
    while !self.register(Waiter::Sync(thread::current())) {
      thread::park();
    }
  }

  /// Parks the current thread until the resource settles or `timeout`
  /// elapses. Returns `true` if the resource settled.
  pub fn wait_timeout(mut self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
      if self.register(Waiter::Sync(thread::current())) {
        return true;
      }
      let now = Instant::now();
      if now >= deadline {
        // Dropping `self` takes the thread back off the queue.
        return false;
      }
      thread::park_timeout(deadline - now);
    }
  }
}

impl<T, E> Future for Settled<T, E> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    if self.get_mut().register(Waiter::Async(cx.waker().clone())) {
      Poll::Ready(())
    } else {
      Poll::Pending
    }
  }
}

impl<T, E> Drop for Settled<T, E> {
  fn drop(&mut self) {
    if let Some(slot) = self.slot.take() {
      if let State::Pending(waiters) = &mut *self.inner.state.lock() {
        waiters.remove(slot);
      }
    }
  }
}
