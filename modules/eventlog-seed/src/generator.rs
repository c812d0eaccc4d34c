//! Synthetic event records for load testing.
//!
//! The random source is injected so a run can be replayed from a seed.

use chrono::{Duration, NaiveDate, NaiveTime};
use eventlog_store::{NewEventRecord, MAX_ROWS_PER_INSERT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use thiserror::Error;

pub const USER_LOGIN: &str = "user_login";
pub const ITEM_VIEWED: &str = "item_viewed";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("no target months given")]
    NoMonths,

    #[error("month {0} is outside 1-12")]
    BadMonth(u32),

    #[error("year {0} is out of range")]
    BadYear(i32),

    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("batch size {0} exceeds {max} rows per insert", max = MAX_ROWS_PER_INSERT)]
    BatchTooLarge(usize),

    #[error("{months} months of {per_month} records overflows the record count")]
    TooManyRecords { months: usize, per_month: usize },
}

impl PlanError {
    /// Check a batch size against what one insert statement can hold.
    pub fn check_batch_size(batch_size: usize) -> Result<(), PlanError> {
        match batch_size {
            0 => Err(PlanError::ZeroBatchSize),
            n if n > MAX_ROWS_PER_INSERT => Err(PlanError::BatchTooLarge(n)),
            _ => Ok(()),
        }
    }
}

/// What to generate and how to slice it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPlan {
    pub year: i32,
    pub months: Vec<u32>,
    pub records_per_month: usize,
    pub batch_size: usize,
}

impl Default for SeedPlan {
    /// January to April 2025, one million events per month, 1,000 per batch.
    fn default() -> Self {
        Self {
            year: 2025,
            months: vec![1, 2, 3, 4],
            records_per_month: 1_000_000,
            batch_size: 1_000,
        }
    }
}

impl SeedPlan {
    pub fn validate(&self) -> Result<(), PlanError> {
        PlanError::check_batch_size(self.batch_size)?;
        if self.months.len().checked_mul(self.records_per_month).is_none() {
            return Err(PlanError::TooManyRecords {
                months: self.months.len(),
                per_month: self.records_per_month,
            });
        }
        self.month_starts().map(|_| ())
    }

    /// Saturates at `usize::MAX`; [`SeedPlan::validate`] rejects such plans.
    pub fn total_records(&self) -> usize {
        self.months.len().saturating_mul(self.records_per_month)
    }

    pub fn total_batches(&self) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        self.total_records().div_ceil(self.batch_size)
    }

    /// First day of each target month, in plan order.
    fn month_starts(&self) -> Result<Vec<NaiveDate>, PlanError> {
        if self.months.is_empty() {
            return Err(PlanError::NoMonths);
        }
        self.months
            .iter()
            .map(|&month| {
                if !(1..=12).contains(&month) {
                    return Err(PlanError::BadMonth(month));
                }
                NaiveDate::from_ymd_opt(self.year, month, 1).ok_or(PlanError::BadYear(self.year))
            })
            .collect()
    }
}

/// Produces records with a pluggable random source.
pub struct SeedGenerator<R = StdRng> {
    rng: R,
}

impl SeedGenerator<StdRng> {
    /// Production source, seeded from the OS.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Deterministic source: the same seed yields the same records.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SeedGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Lazily yield every record of `plan`, month by month.
    pub fn records<'a>(&'a mut self, plan: &SeedPlan) -> Result<Records<'a, R>, PlanError> {
        let months = plan.month_starts()?;
        Ok(Records {
            generator: self,
            months,
            per_month: plan.records_per_month,
            month_idx: 0,
            index: 0,
        })
    }

    /// Record `index` of the month starting at `month_start`.
    ///
    /// Even indexes are logins keyed by user, odd ones are item views keyed
    /// by item. The timestamp falls on day 1-28 at a uniform time of day.
    pub fn record(&mut self, month_start: NaiveDate, index: usize) -> NewEventRecord {
        let day = self.rng.random_range(1..=28i64);
        let hour = self.rng.random_range(0..24i64);
        let minute = self.rng.random_range(0..60i64);
        let second = self.rng.random_range(0..60i64);

        let created_at = (month_start.and_time(NaiveTime::MIN)
            + Duration::days(day - 1)
            + Duration::hours(hour)
            + Duration::minutes(minute)
            + Duration::seconds(second))
        .and_utc();

        let (event_type, payload) = if index % 2 == 0 {
            (USER_LOGIN, json!({ "userId": format!("user{index}") }))
        } else {
            (ITEM_VIEWED, json!({ "itemId": format!("item{index}") }))
        };

        NewEventRecord::new(event_type)
            .with_payload(payload)
            .with_created_at(created_at)
    }
}

/// Iterator returned by [`SeedGenerator::records`].
pub struct Records<'a, R> {
    generator: &'a mut SeedGenerator<R>,
    months: Vec<NaiveDate>,
    per_month: usize,
    month_idx: usize,
    index: usize,
}

impl<R: Rng> Iterator for Records<'_, R> {
    type Item = NewEventRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index >= self.per_month {
            if self.month_idx >= self.months.len() {
                return None;
            }
            self.month_idx += 1;
            self.index = 0;
        }
        let month_start = *self.months.get(self.month_idx)?;
        let record = self.generator.record(month_start, self.index);
        self.index += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .months
            .len()
            .saturating_sub(self.month_idx)
            .saturating_mul(self.per_month)
            .saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}
