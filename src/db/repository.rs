//! Database repository for CRUD operations.
//!
//! Also answers the read contracts of the prediction engine.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreateMemberRequest, CreateQueueRequest, Member, QueueEntry, Schedule,
    UpdateMemberRequest, UpdateScheduleRequest, GENERAL_MEMBER_TYPE, QUEUE_PENDING,
};
use crate::roster::{MemberProvider, QueueProvider, ScheduleProvider};

const MEMBER_COLUMNS: &str = "id, name, member_type, status, updated_at";
const SCHEDULE_COLUMNS: &str = "date, main, pre";
const QUEUE_COLUMNS: &str = "id, member_id, deferred_date, status, created_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members by ascending id.
    pub async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM members ORDER BY id",
            MEMBER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    /// List members of one type by ascending id.
    pub async fn list_members_by_type(&self, member_type: i64) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM members WHERE member_type = ? ORDER BY id",
            MEMBER_COLUMNS
        ))
        .bind(member_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    /// Active members outside the rotation, grouped by type.
    pub async fn list_exempt_members(&self) -> Result<BTreeMap<i64, Vec<i64>>, AppError> {
        let rows = sqlx::query(
            "SELECT id, member_type FROM members WHERE member_type != ? AND status != 0 ORDER BY id",
        )
        .bind(GENERAL_MEMBER_TYPE)
        .fetch_all(&self.pool)
        .await?;

        let mut exempt: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for row in rows {
            exempt
                .entry(row.get("member_type"))
                .or_default()
                .push(row.get("id"));
        }
        Ok(exempt)
    }

    /// Get a member by ID.
    pub async fn get_member(&self, id: i64) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM members WHERE id = ?", MEMBER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    /// Register a new member under the id given in the request.
    pub async fn create_member(&self, request: &CreateMemberRequest) -> Result<Member, AppError> {
        if self.get_member(request.id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Member {} already exists",
                request.id
            )));
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO members (id, name, member_type, status, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(request.id)
        .bind(&request.name)
        .bind(request.member_type)
        .bind(request.status)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Member {
            id: request.id,
            name: request.name.clone(),
            member_type: request.member_type,
            status: request.status,
            updated_at: now,
        })
    }

    /// Update a member's name, type or status.
    pub async fn update_member(
        &self,
        id: i64,
        request: &UpdateMemberRequest,
    ) -> Result<Member, AppError> {
        let existing = self
            .get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

        let now = Utc::now().to_rfc3339();
        let name = request.name.clone().or(existing.name);
        let member_type = request.member_type.unwrap_or(existing.member_type);
        let status = request.status.unwrap_or(existing.status);

        sqlx::query(
            "UPDATE members SET name = ?, member_type = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(member_type)
        .bind(status)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Member {
            id,
            name,
            member_type,
            status,
            updated_at: now,
        })
    }

    /// Delete a member.
    pub async fn delete_member(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== SCHEDULE OPERATIONS ====================

    /// List all committed schedules by ascending date.
    pub async fn list_schedules(&self) -> Result<Vec<Schedule>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM schedules ORDER BY date",
            SCHEDULE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(schedule_from_row).collect()
    }

    /// Committed schedules dated within `[start, end]`.
    pub async fn list_schedules_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Schedule>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM schedules WHERE date >= ? AND date <= ? ORDER BY date",
            SCHEDULE_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(schedule_from_row).collect()
    }

    pub async fn get_schedule(&self, date: NaiveDate) -> Result<Option<Schedule>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM schedules WHERE date = ?",
            SCHEDULE_COLUMNS
        ))
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_from_row).transpose()
    }

    /// The committed schedule with the greatest date.
    pub async fn get_latest_schedule(&self) -> Result<Option<Schedule>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM schedules ORDER BY date DESC LIMIT 1",
            SCHEDULE_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_from_row).transpose()
    }

    /// Commit a schedule. Each date can be committed once.
    pub async fn create_schedule(&self, schedule: &Schedule) -> Result<Schedule, AppError> {
        if self.get_schedule(schedule.date).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Schedule {} already exists",
                schedule.date
            )));
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO schedules (date, main, pre, updated_at) VALUES (?, ?, ?, ?)")
            .bind(schedule.date)
            .bind(serde_json::to_string(&schedule.main)?)
            .bind(serde_json::to_string(&schedule.pre)?)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;
        Ok(schedule.clone())
    }

    /// Replace the slots of a committed schedule.
    pub async fn replace_schedule(
        &self,
        date: NaiveDate,
        request: &UpdateScheduleRequest,
    ) -> Result<Schedule, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE schedules SET main = ?, pre = ?, updated_at = ? WHERE date = ?")
            .bind(serde_json::to_string(&request.main)?)
            .bind(serde_json::to_string(&request.pre)?)
            .bind(&now)
            .bind(date)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Schedule {} not found", date)));
        }

        self.increment_revision().await?;

        Ok(Schedule {
            date,
            main: request.main.clone(),
            pre: request.pre.clone(),
        })
    }

    pub async fn delete_schedule(&self, date: NaiveDate) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM schedules WHERE date = ?")
            .bind(date)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Schedule {} not found", date)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== QUEUE OPERATIONS ====================

    /// Pending deferrals, oldest deferral first.
    pub async fn list_pending_queue(
        &self,
        excluding: &BTreeSet<i64>,
    ) -> Result<Vec<QueueEntry>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM queues WHERE status = ",
            QUEUE_COLUMNS
        ));
        query.push_bind(QUEUE_PENDING);
        if !excluding.is_empty() {
            query.push(" AND member_id NOT IN (");
            let mut ids = query.separated(", ");
            for id in excluding {
                ids.push_bind(*id);
            }
            ids.push_unseparated(")");
        }
        query.push(" ORDER BY deferred_date, created_at, id");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(queue_entry_from_row).collect())
    }

    /// Every deferral regardless of status.
    pub async fn list_queue(&self) -> Result<Vec<QueueEntry>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM queues ORDER BY deferred_date, created_at, id",
            QUEUE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(queue_entry_from_row).collect())
    }

    pub async fn list_member_queue(&self, member_id: i64) -> Result<Vec<QueueEntry>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM queues WHERE member_id = ? ORDER BY deferred_date, created_at, id",
            QUEUE_COLUMNS
        ))
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(queue_entry_from_row).collect())
    }

    pub async fn get_queue_entry(&self, id: &str) -> Result<Option<QueueEntry>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM queues WHERE id = ?", QUEUE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(queue_entry_from_row))
    }

    /// Record a deferral for a member.
    pub async fn create_queue_entry(
        &self,
        request: &CreateQueueRequest,
    ) -> Result<QueueEntry, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO queues (id, member_id, deferred_date, status, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(request.member_id)
        .bind(request.deferred_date)
        .bind(request.status)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(QueueEntry {
            id,
            member_id: request.member_id,
            deferred_date: request.deferred_date,
            status: request.status,
            created_at: now,
        })
    }

    pub async fn update_queue_status(&self, id: &str, status: i64) -> Result<QueueEntry, AppError> {
        let result = sqlx::query("UPDATE queues SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Queue entry {} not found", id)));
        }

        self.increment_revision().await?;

        self.get_queue_entry(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Queue entry {} not found", id)))
    }

    pub async fn delete_queue_entry(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM queues WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Queue entry {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

#[async_trait]
impl MemberProvider for Repository {
    async fn members_of_type(&self, member_type: i64) -> Result<Vec<Member>, AppError> {
        self.list_members_by_type(member_type).await
    }

    async fn member(&self, id: i64) -> Result<Option<Member>, AppError> {
        self.get_member(id).await
    }
}

#[async_trait]
impl QueueProvider for Repository {
    async fn pending_queue(&self, excluding: &BTreeSet<i64>) -> Result<Vec<QueueEntry>, AppError> {
        self.list_pending_queue(excluding).await
    }
}

#[async_trait]
impl ScheduleProvider for Repository {
    async fn schedule_on(&self, date: NaiveDate) -> Result<Option<Schedule>, AppError> {
        self.get_schedule(date).await
    }

    async fn latest_schedule(&self) -> Result<Option<Schedule>, AppError> {
        self.get_latest_schedule().await
    }

    async fn schedules_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Schedule>, AppError> {
        self.list_schedules_between(start, end).await
    }
}

// Helper functions for row conversion

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    Member {
        id: row.get("id"),
        name: row.get("name"),
        member_type: row.get("member_type"),
        status: row.get("status"),
        updated_at: row.get("updated_at"),
    }
}

fn schedule_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Schedule, AppError> {
    let main: String = row.get("main");
    let pre: String = row.get("pre");
    Ok(Schedule {
        date: row.get("date"),
        main: serde_json::from_str(&main)?,
        pre: serde_json::from_str(&pre)?,
    })
}

fn queue_entry_from_row(row: &sqlx::sqlite::SqliteRow) -> QueueEntry {
    QueueEntry {
        id: row.get("id"),
        member_id: row.get("member_id"),
        deferred_date: row.get("deferred_date"),
        status: row.get("status"),
        created_at: row.get("created_at"),
    }
}
