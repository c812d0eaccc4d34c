//! Postgres-backed storage for discrete event records.
//!
//! Each row carries a type tag, an optional JSONB payload and a timestamp.
//! The table's primary key is `(id, created_at)`, but every point operation
//! here is keyed on `id` alone and acts on the whole matching set.

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{ConfigError, DatabaseConfig};
pub use error::{Result, StoreError};
pub use store::EventStore;
pub use types::{
    EventPatch, EventRecord, NewEventRecord, BIND_PARAMS_PER_ROW, EVENT_TYPE_MAX_LEN,
    MAX_ROWS_PER_INSERT,
};
