use std::collections::VecDeque;
use std::task::Waker;
use std::thread::Thread;

/// Represents a caller parked on an unsettled `Resource`.
pub(crate) enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }

  fn is_same(&self, other: &Waiter) -> bool {
    match (self, other) {
      (Waiter::Sync(a), Waiter::Sync(b)) => a.id() == b.id(),
      (Waiter::Async(a), Waiter::Async(b)) => a.will_wake(b),
      _ => false,
    }
  }
}

/// The queue of callers waiting for a resource to settle.
///
/// Sync threads and async tasks share one queue so a single settlement wakes
/// both kinds of waiters. Each registration owns a slot id so a waiter that
/// gives up can take itself back out.
#[derive(Default)]
pub(crate) struct WaiterQueue {
  waiters: VecDeque<(u64, Waiter)>,
  next_slot: u64,
}

impl WaiterQueue {
  /// Registers `waiter` and returns its slot.
  ///
  /// Passing the slot from an earlier registration updates that entry in
  /// place, so re-polling a future never grows the queue.
  pub(crate) fn register(&mut self, slot: Option<u64>, waiter: Waiter) -> u64 {
    if let Some(slot) = slot {
      if let Some((_, existing)) = self.waiters.iter_mut().find(|(id, _)| *id == slot) {
        if !existing.is_same(&waiter) {
          *existing = waiter;
        }
        return slot;
      }
    }

    let slot = self.next_slot;
    self.next_slot += 1;
    self.waiters.push_back((slot, waiter));
    slot
  }

  /// Drops the registration in `slot`, if it is still queued.
  pub(crate) fn remove(&mut self, slot: u64) {
    if let Some(index) = self.waiters.iter().position(|(id, _)| *id == slot) {
      self.waiters.remove(index);
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.waiters.len()
  }

  /// Wakes every queued waiter.
  pub(crate) fn wake_all(&mut self) {
    for (_, waiter) in self.waiters.drain(..) {
      waiter.wake();
    }
  }
}
