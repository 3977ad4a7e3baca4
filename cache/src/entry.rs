use crate::resource::Resource;

use std::time::{Duration, Instant};

/// A resource stored in the cache together with its expiry time.
#[derive(Debug)]
pub(crate) struct CacheEntry<T, E> {
  resource: Resource<T, E>,
  /// `created_at + ttl`, fixed at insertion.
  expires_at: Instant,
}

impl<T, E> CacheEntry<T, E> {
  pub(crate) fn new(resource: Resource<T, E>, created_at: Instant, ttl: Duration) -> Self {
    Self {
      resource,
      expires_at: created_at + ttl,
    }
  }

  /// Returns a new handle to the stored resource.
  #[inline]
  pub(crate) fn resource(&self) -> Resource<T, E> {
    self.resource.clone()
  }

  #[inline]
  pub(crate) fn expires_at(&self) -> Instant {
    self.expires_at
  }

  /// An entry is expired once `now` reaches its expiry time.
  #[inline]
  pub(crate) fn is_expired(&self, now: Instant) -> bool {
    now >= self.expires_at
  }
}
