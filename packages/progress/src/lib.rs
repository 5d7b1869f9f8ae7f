#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Progress reporting for long-running pipeline stages.
//!
//! Feature assembly walks every property row and geocoding fans out over
//! every address; both report through [`ProgressCallback`] so that the
//! library crates never depend on a terminal rendering backend. The CLI
//! supplies an `indicatif` implementation, tests use [`NullProgress`].

use std::sync::Arc;

/// Receives row and request counts from a pipeline stage.
///
/// Shared across concurrent geocoding requests, hence `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Number of rows or requests the stage is about to process.
    fn set_total(&self, total: u64);

    /// Records `delta` more rows or requests as done.
    fn inc(&self, delta: u64);

    /// Labels the current stage, e.g. the amenity kind being computed.
    fn set_message(&self, msg: String);

    /// The stage completed; `msg` summarizes it.
    fn finish(&self, msg: String);

    /// The stage aborted with an error; nothing should be left on screen.
    fn finish_and_clear(&self);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
