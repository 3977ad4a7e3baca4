mod common;

use common::{fetch_pokemon_blocking, FetchError, Pokemon};
use suspense_cache::{Outcome, Probe, Resource, ResourceError, Status};

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_probe_pending_then_ready() {
  let (resource, completer) = Resource::<Pokemon, FetchError>::pending();

  assert!(resource.probe().unwrap().is_pending());
  assert!(resource.probe().unwrap().is_pending());
  assert_eq!(resource.status(), Status::Pending);

  completer.succeed(Pokemon {
    name: "pikachu".into(),
    number: 25,
  });

  let first = match resource.probe().unwrap() {
    Probe::Ready(value) => value,
    other => panic!("expected ready, got {:?}", other),
  };
  assert_eq!(first.number, 25);

  // Every later probe hands back the very same value.
  for _ in 0..5 {
    match resource.probe().unwrap() {
      Probe::Ready(value) => assert!(Arc::ptr_eq(&first, &value)),
      other => panic!("expected ready, got {:?}", other),
    }
  }
  assert!(resource.is_settled());
}

#[test]
fn test_failed_resource_never_becomes_ready() {
  let resource = Resource::<Pokemon, FetchError>::spawn_blocking(|| {
    fetch_pokemon_blocking("missingno", Duration::from_millis(50))
  });

  assert!(resource.probe().unwrap().is_pending());

  let error = match resource.resolve_blocking().unwrap() {
    Outcome::Failed(error) => error,
    Outcome::Ready(value) => panic!("missingno should not resolve, got {:?}", value),
  };
  assert_eq!(*error, FetchError("missingno".into()));

  for _ in 0..5 {
    match resource.probe().unwrap() {
      Probe::Failed(again) => assert!(Arc::ptr_eq(&error, &again)),
      other => panic!("expected failed, got {:?}", other),
    }
  }
  assert_eq!(resource.status(), Status::Failure);
}

#[test]
fn test_first_settlement_wins() {
  let (resource, completer) = Resource::<u32, String>::pending();
  let clone = resource.clone();

  completer.fail("boom".to_string());

  assert!(Resource::ptr_eq(&resource, &clone));
  match clone.probe().unwrap() {
    Probe::Failed(error) => assert_eq!(*error, "boom"),
    other => panic!("expected failed, got {:?}", other),
  }
}

#[test]
fn test_dropped_completer_abandons_resource() {
  let (resource, completer) = Resource::<u32, String>::pending();
  let settled = match resource.probe().unwrap() {
    Probe::Pending(settled) => settled,
    other => panic!("expected pending, got {:?}", other),
  };

  drop(completer);

  // The waiter is released rather than left hanging.
  settled.wait();
  assert_eq!(resource.status(), Status::Abandoned);
  assert_eq!(resource.probe().unwrap_err(), ResourceError::Abandoned);
  assert_eq!(resource.resolve_blocking().unwrap_err(), ResourceError::Abandoned);
}

#[test]
fn test_panicking_blocking_operation_abandons_resource() {
  let resource = Resource::<u32, String>::spawn_blocking(|| panic!("fetch exploded"));
  assert_eq!(resource.resolve_blocking().unwrap_err(), ResourceError::Abandoned);
}

#[test]
fn test_settled_wakes_all_waiting_threads() {
  let (resource, completer) = Resource::<u32, String>::pending();
  let num_waiters = 8;
  let barrier = Arc::new(Barrier::new(num_waiters + 1));
  let mut handles = vec![];

  for _ in 0..num_waiters {
    let resource = resource.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      match resource.resolve_blocking().unwrap() {
        Outcome::Ready(value) => *value,
        Outcome::Failed(error) => panic!("unexpected failure: {}", error),
      }
    }));
  }

  barrier.wait();
  thread::sleep(Duration::from_millis(20));
  completer.succeed(151);

  for handle in handles {
    assert_eq!(handle.join().unwrap(), 151);
  }
}

#[test]
fn test_wait_timeout_reports_whether_settled() {
  let (resource, completer) = Resource::<u32, String>::pending();

  let settled = match resource.probe().unwrap() {
    Probe::Pending(settled) => settled,
    other => panic!("expected pending, got {:?}", other),
  };
  assert!(!settled.wait_timeout(Duration::from_millis(20)));

  let settled = match resource.probe().unwrap() {
    Probe::Pending(settled) => settled,
    other => panic!("expected pending, got {:?}", other),
  };
  let handle = thread::spawn(move || settled.wait_timeout(Duration::from_secs(5)));
  thread::sleep(Duration::from_millis(20));
  completer.succeed(7);

  assert!(handle.join().unwrap());
}

#[test]
fn test_presettled_resources() {
  let ready = Resource::<u32, String>::ready(4);
  assert_eq!(ready.status(), Status::Success);
  assert_eq!(*ready.resolve_blocking().unwrap().into_result().unwrap(), 4);

  let failed = Resource::<u32, String>::failed("nope".into());
  assert_eq!(failed.status(), Status::Failure);
  assert_eq!(*failed.resolve_blocking().unwrap().into_result().unwrap_err(), "nope");
}

#[test]
fn test_resolve_from_a_plain_executor() {
  let resource = Resource::<Pokemon, FetchError>::spawn_blocking(|| {
    fetch_pokemon_blocking("bulbasaur", Duration::from_millis(30))
  });

  // No runtime needed: the settle signal wakes any executor's waker.
  let outcome = futures_executor::block_on(resource.resolve()).unwrap();
  assert_eq!(outcome.into_result().unwrap().number, 1);
}

#[test]
fn test_timed_out_and_dropped_waiters_leave_the_queue() {
  let (resource, completer) = Resource::<u32, String>::pending();

  let mut handles = vec![];
  for _ in 0..8 {
    let resource = resource.clone();
    handles.push(thread::spawn(move || match resource.probe().unwrap() {
      Probe::Pending(settled) => settled.wait_timeout(Duration::from_millis(10)),
      other => panic!("expected pending, got {:?}", other),
    }));
  }
  for handle in handles {
    assert!(!handle.join().unwrap(), "Nothing settled the resource");
  }
  assert_eq!(resource.waiting(), 0);

  // A signal that was never waited on is not queued at all.
  let unused = resource.probe().unwrap();
  assert!(unused.is_pending());
  drop(unused);
  assert_eq!(resource.waiting(), 0);

  completer.succeed(3);
  assert_eq!(resource.waiting(), 0);
  assert_eq!(*resource.resolve_blocking().unwrap().into_result().unwrap(), 3);
}
