//! Deferral queue API endpoints.

use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateQueueRequest, QueueEntry, UpdateQueueRequest};
use crate::roster::{OrganizedQueue, Predictor, ScheduleProvider};
use crate::AppState;

/// Queue entries together with their per-member grouping.
#[derive(Debug, Serialize)]
pub struct QueueOverview {
    pub queues: Vec<QueueEntry>,
    pub members: OrganizedQueue,
    pub pending: usize,
}

impl QueueOverview {
    fn new(queues: Vec<QueueEntry>) -> Self {
        let members = OrganizedQueue::organize(queues.clone());
        let pending = queues.iter().filter(|e| e.is_pending()).count();
        Self {
            queues,
            members,
            pending,
        }
    }
}

/// GET /api/queues - Pending deferrals.
pub async fn list_pending_queue(State(state): State<AppState>) -> ApiResult<QueueOverview> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_pending_queue(&BTreeSet::new()).await {
        Ok(queues) => success(QueueOverview::new(queues), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/queues/all - Every deferral regardless of status.
pub async fn list_all_queue(State(state): State<AppState>) -> ApiResult<QueueOverview> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_queue().await {
        Ok(queues) => success(QueueOverview::new(queues), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/queues/latest - Pending deferrals of members not on duty the last working day.
pub async fn latest_queue(State(state): State<AppState>) -> ApiResult<OrganizedQueue> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let day = state.calendar.last_working_day(state.clock.today());
    let anchor = match state.repo.schedule_on(day).await {
        Ok(Some(schedule)) => schedule,
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Schedule {} not found", day)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    };

    let predictor = Predictor::new(state.repo.as_ref(), state.calendar);
    match predictor.eligible_queue(&anchor).await {
        Ok(queue) => success(queue, revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// GET /api/queues/:id - Get a single deferral.
pub async fn get_queue_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<QueueEntry> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_queue_entry(&id).await {
        Ok(Some(entry)) => success(entry, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Queue entry {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/queues - Record a deferral.
pub async fn create_queue_entry(
    State(state): State<AppState>,
    Json(request): Json<CreateQueueRequest>,
) -> ApiResult<QueueEntry> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_member(request.member_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::Validation(format!("Member {} does not exist", request.member_id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    match state.repo.create_queue_entry(&request).await {
        Ok(entry) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(entry, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PATCH /api/queues/:id - Change a deferral's status.
pub async fn update_queue_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateQueueRequest>,
) -> ApiResult<QueueEntry> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_queue_status(&id, request.status).await {
        Ok(entry) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(entry, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/queues/:id - Delete a deferral.
pub async fn delete_queue_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_queue_entry(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
