//! Member API endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CreateMemberRequest, Member, QueueEntry, UpdateMemberRequest, DAILY_HEADCOUNT,
};
use crate::roster::{Predictor, ScheduleProvider};
use crate::AppState;

/// Largest count `/members/latest/{count}` accepts: two full days of duty.
pub const MAX_SELECTION_COUNT: i64 = 2 * DAILY_HEADCOUNT as i64;

/// GET /api/members - List all members.
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Vec<Member>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_members().await {
        Ok(members) => success(members, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/members/ignore - Active members exempt from rotation, grouped by type.
pub async fn list_ignored_members(
    State(state): State<AppState>,
) -> ApiResult<BTreeMap<i64, Vec<i64>>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_exempt_members().await {
        Ok(members) => success(members, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/members/latest/:count - Next rotation members after the last working day.
pub async fn latest_members(
    State(state): State<AppState>,
    Path(count): Path<i64>,
) -> ApiResult<Vec<i64>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if count > MAX_SELECTION_COUNT {
        return error(
            AppError::Validation(format!(
                "count must not exceed {}",
                MAX_SELECTION_COUNT
            )),
            revision_id,
        );
    }

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
    match predictor.select(&anchor, count).await {
        Ok(members) => success(members, revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// GET /api/members/:id - Get a single member.
pub async fn get_member(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_member(id).await {
        Ok(Some(member)) => success(member, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Member {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/members/:id/queue - Every deferral of a member.
pub async fn get_member_queue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<QueueEntry>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_member(id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Member {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    match state.repo.list_member_queue(id).await {
        Ok(queue) => success(queue, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/members - Register a member.
pub async fn create_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.id <= 0 {
        return error(
            AppError::Validation("Member id must be positive".to_string()),
            revision_id,
        );
    }

    match state.repo.create_member(&request).await {
        Ok(member) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(member, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PATCH /api/members/:id - Change a member's type, status or name.
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateMemberRequest>,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_member(id, &request).await {
        Ok(member) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(member, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/members/:id - Delete a member.
pub async fn delete_member(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_member(id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
