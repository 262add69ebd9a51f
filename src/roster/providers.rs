//! Read contracts the engine needs from the store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::{Member, QueueEntry, Schedule};

#[async_trait]
pub trait MemberProvider: Send + Sync {
    /// Members of `member_type` in ascending id order.
    async fn members_of_type(&self, member_type: i64) -> Result<Vec<Member>, AppError>;

    async fn member(&self, id: i64) -> Result<Option<Member>, AppError>;
}

#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Pending deferrals, oldest first, skipping members in `excluding`.
    async fn pending_queue(&self, excluding: &BTreeSet<i64>) -> Result<Vec<QueueEntry>, AppError>;
}

#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    async fn schedule_on(&self, date: NaiveDate) -> Result<Option<Schedule>, AppError>;

    /// The committed schedule with the greatest date.
    async fn latest_schedule(&self) -> Result<Option<Schedule>, AppError>;

    /// Committed schedules in `[start, end]`, ascending by date.
    async fn schedules_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Schedule>, AppError>;
}

/// Everything the predictor reads.
pub trait RosterStore: MemberProvider + QueueProvider + ScheduleProvider {}

impl<T: MemberProvider + QueueProvider + ScheduleProvider + ?Sized> RosterStore for T {}
