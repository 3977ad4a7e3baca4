//! Background tasks owned by the cache: the janitor that sweeps expired
//! entries on a fixed cadence.

pub(crate) mod janitor;
