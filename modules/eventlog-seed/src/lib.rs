//! Synthetic event generation and batched bulk loading.
//!
//! Records are generated lazily, grouped into fixed-size batches and written
//! through a [`BatchSink`] one batch at a time. A failed batch is logged and
//! skipped; the run always continues with the next one.

pub mod generator;
pub mod loader;
pub mod sink;

pub use generator::{PlanError, Records, SeedGenerator, SeedPlan};
pub use loader::{BatchFailure, BulkLoader, LoadError, LoadReport, RunPhase};
pub use sink::BatchSink;
