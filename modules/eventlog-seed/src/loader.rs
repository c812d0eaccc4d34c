//! BulkLoader — batched insertion with per-batch failure isolation.
//!
//! Batches are inserted strictly in order, one at a time. A failed batch is
//! recorded and skipped: no retry, no abort, no rollback of earlier batches.
//! The sink is released exactly once per run on every exit path.

use std::fmt;

use eventlog_store::NewEventRecord;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::generator::{PlanError, SeedGenerator, SeedPlan};
use crate::sink::BatchSink;

/// Setup failures. Batch failures never surface here; they land in [`LoadReport`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid seed plan: {0}")]
    InvalidPlan(#[from] PlanError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Generating,
    Inserting,
    Draining,
    Done,
}

/// One batch that the sink rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// 1-based position of the batch in the run.
    pub batch_number: usize,
    /// Offset of the first record in the run.
    pub start: usize,
    /// Offset one past the last record.
    pub end: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub batches_attempted: usize,
    pub batches_succeeded: usize,
    pub records_inserted: u64,
    pub failures: Vec<BatchFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_batches(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.batch_number).collect()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records inserted, {}/{} batches succeeded",
            self.records_inserted, self.batches_succeeded, self.batches_attempted
        )?;
        if !self.failures.is_empty() {
            write!(f, ", failed batches:")?;
            for failure in &self.failures {
                write!(f, " {} ({} - {})", failure.batch_number, failure.start, failure.end)?;
            }
        }
        Ok(())
    }
}

/// Drives one bulk load. Consumed by the run, so nothing carries over.
pub struct BulkLoader<S> {
    sink: S,
    batch_size: usize,
    phase: RunPhase,
}

impl<S: BatchSink> BulkLoader<S> {
    pub const DEFAULT_BATCH_SIZE: usize = 1_000;

    pub fn new(sink: S) -> Self {
        Self {
            sink,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            phase: RunPhase::Idle,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Validate `plan`, generate its records and load them.
    ///
    /// Batches are `plan.batch_size` long; any size set with
    /// [`BulkLoader::with_batch_size`] is replaced by the plan's.
    pub async fn run<R: Rng>(
        mut self,
        generator: &mut SeedGenerator<R>,
        plan: &SeedPlan,
    ) -> Result<LoadReport, LoadError> {
        self.enter(RunPhase::Generating);

        let records = match plan.validate().and_then(|_| generator.records(plan)) {
            Ok(records) => records,
            Err(e) => {
                self.drain().await;
                return Err(e.into());
            }
        };

        info!(
            year = plan.year,
            months = ?plan.months,
            records = plan.total_records(),
            batches = plan.total_batches(),
            "Starting seeding..."
        );

        self.batch_size = plan.batch_size;
        self.load(records).await
    }

    /// Insert `records` in contiguous batches of the configured size.
    pub async fn load<I>(mut self, records: I) -> Result<LoadReport, LoadError>
    where
        I: IntoIterator<Item = NewEventRecord>,
    {
        if let Err(e) = PlanError::check_batch_size(self.batch_size) {
            self.drain().await;
            return Err(e.into());
        }

        let mut report = LoadReport::default();
        let mut records = records.into_iter();
        let mut offset = 0;

        loop {
            let batch: Vec<NewEventRecord> = records.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            self.enter(RunPhase::Inserting);
            let batch_number = report.batches_attempted + 1;
            let start = offset;
            let end = offset + batch.len();
            offset = end;
            report.batches_attempted += 1;

            info!(
                batch = batch_number,
                start,
                end,
                "Inserting batch {batch_number} ({start} - {end})..."
            );

            match self.sink.insert_batch(&batch).await {
                Ok(inserted) => {
                    report.batches_succeeded += 1;
                    report.records_inserted += inserted;
                    info!(
                        batch = batch_number,
                        inserted,
                        "Batch {batch_number} inserted successfully."
                    );
                }
                Err(e) => {
                    error!(
                        batch = batch_number,
                        start,
                        end,
                        error = %e,
                        "Failed to insert batch {batch_number} ({start} - {end})"
                    );
                    report.failures.push(BatchFailure {
                        batch_number,
                        start,
                        end,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.drain().await;
        info!(%report, "Seeding finished.");
        Ok(report)
    }

    async fn drain(&mut self) {
        self.enter(RunPhase::Draining);
        self.sink.release().await;
        self.enter(RunPhase::Done);
    }

    fn enter(&mut self, phase: RunPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "Bulk load phase");
            self.phase = phase;
        }
    }
}
