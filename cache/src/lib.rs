//! A keyed, time-expiring cache of suspending resources.
//!
//! A [`Resource`] wraps one asynchronous operation that starts the moment the
//! resource is created. Probing it never blocks: it answers *pending* (with a
//! [`Settled`] signal the caller can await or wait on), *ready* with the
//! value, or *failed* with the error. The answer never changes once settled.
//!
//! A [`ResourceCache`] hands out one resource per key while the entry is live.
//!
//! # Features
//! - **Deduplication**: concurrent requests for a key share one in-flight
//!   operation; the check-then-insert is atomic per key.
//! - **Time-to-Live**: each entry expires a fixed time after creation.
//! - **Background Sweep**: a janitor thread evicts expired entries on a
//!   configurable cadence and is stopped on shutdown or drop.
//! - **Sync & Async**: settle signals work from threads and from tasks.
//! - **Runtime Agnostic**: async fetches run on any [`TaskSpawner`]; Tokio is
//!   supported out of the box.
//!
//! ```no_run
//! use std::time::Duration;
//! use suspense_cache::{Probe, Resource, ResourceCache};
//!
//! let cache = ResourceCache::<String, String>::builder()
//!   .time_to_live(Duration::from_secs(5))
//!   .build()
//!   .unwrap();
//!
//! let resource = cache.get_or_create("pikachu", |name| {
//!   let name = name.to_owned();
//!   Resource::spawn_blocking(move || Ok(format!("{name} #025")))
//! });
//!
//! match resource.probe().unwrap() {
//!   Probe::Pending(settled) => settled.wait(),
//!   Probe::Ready(pokemon) => println!("{pokemon}"),
//!   Probe::Failed(error) => eprintln!("{error}"),
//! }
//! ```

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod handles;
pub mod metrics;
pub mod resource;
pub mod runtime;
pub mod time;

// Internal, crate-only modules
mod entry;
mod fetcher;
mod shared;
mod store;
mod task;
mod waiter;

// Re-export the primary user-facing types for convenience
pub use builder::{CacheBuilder, CacheConfig};
pub use error::{CacheError, ConfigError, ResourceError};
pub use handles::ResourceCache;
pub use metrics::MetricsSnapshot;
pub use resource::{Completer, Outcome, Probe, Resource, Settled, Status};
#[cfg(feature = "tokio")]
pub use runtime::TokioSpawner;
pub use runtime::TaskSpawner;
pub use time::{Clock, ManualClock, SystemClock};
