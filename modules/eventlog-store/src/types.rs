//! Row and input types for the event log table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column bound of `event_logs.event_type`. Enforced by Postgres, not by the store.
pub const EVENT_TYPE_MAX_LEN: usize = 50;

/// Bind parameters one row takes in a multi-row insert.
pub const BIND_PARAMS_PER_ROW: usize = 4;

/// Most rows one multi-row insert can carry. Postgres caps a statement at
/// 65,535 bind parameters.
pub const MAX_ROWS_PER_INSERT: usize = u16::MAX as usize / BIND_PARAMS_PER_ROW;

/// An event as stored in Postgres. Returned by all read methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub event_type: String,
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// An event to be inserted. `id` and `created_at` fall back to the column
/// defaults (`gen_random_uuid()`, `now()`) when left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEventRecord {
    pub id: Option<Uuid>,
    pub event_type: String,
    pub payload: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewEventRecord {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: None,
            event_type: event_type.into(),
            payload: None,
            created_at: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Partial update. Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    pub event_type: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl EventPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// True when the patch would not change any column.
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.payload.is_none() && self.created_at.is_none()
    }
}
