//! Deferred-duty queue model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Status of a deferral that still has to be worked off.
pub const QUEUE_PENDING: i64 = 0;

/// A member's request to serve a missed turn later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: String,
    pub member_id: i64,
    pub deferred_date: NaiveDate,
    pub status: i64,
    #[serde(default)]
    pub created_at: String,
}

impl QueueEntry {
    pub fn is_pending(&self) -> bool {
        self.status == QUEUE_PENDING
    }
}

/// Request body for creating a deferral.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueueRequest {
    pub member_id: i64,
    #[serde(alias = "skippedDate")]
    pub deferred_date: NaiveDate,
    #[serde(default)]
    pub status: i64,
}

/// Request body for changing a deferral's status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQueueRequest {
    pub status: i64,
}
