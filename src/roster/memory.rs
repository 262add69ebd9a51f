//! In-memory store backing the engine tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::{Member, QueueEntry, Schedule};

use super::{MemberProvider, QueueProvider, ScheduleProvider};

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub members: Vec<Member>,
    pub queue: Vec<QueueEntry>,
    pub schedules: BTreeMap<NaiveDate, Schedule>,
}

impl MemoryStore {
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedules.insert(schedule.date, schedule);
        self
    }
}

#[async_trait]
impl MemberProvider for MemoryStore {
    async fn members_of_type(&self, member_type: i64) -> Result<Vec<Member>, AppError> {
        let mut members: Vec<Member> = self
            .members
            .iter()
            .filter(|m| m.member_type == member_type)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn member(&self, id: i64) -> Result<Option<Member>, AppError> {
        Ok(self.members.iter().find(|m| m.id == id).cloned())
    }
}

#[async_trait]
impl QueueProvider for MemoryStore {
    async fn pending_queue(&self, excluding: &BTreeSet<i64>) -> Result<Vec<QueueEntry>, AppError> {
        Ok(self
            .queue
            .iter()
            .filter(|e| e.is_pending() && !excluding.contains(&e.member_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScheduleProvider for MemoryStore {
    async fn schedule_on(&self, date: NaiveDate) -> Result<Option<Schedule>, AppError> {
        Ok(self.schedules.get(&date).cloned())
    }

    async fn latest_schedule(&self) -> Result<Option<Schedule>, AppError> {
        Ok(self.schedules.values().next_back().cloned())
    }

    async fn schedules_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Schedule>, AppError> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self.schedules.range(start..=end).map(|(_, s)| s.clone()).collect())
    }
}
