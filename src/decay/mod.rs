//! Salience decay — pure model and periodic scheduler.
//!
//! [`engine`] holds the decay algebra (half-life, Ebbinghaus blend, LTP,
//! recall boost, environmental context) as pure functions. [`scheduler`]
//! drives it: a long-lived worker that scans items and facts in cursor-paged
//! batches, persists decayed salience, and records run metrics.

pub mod engine;
pub mod scheduler;
