//! Schedule API endpoints, including predictions.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Assignment, AssignmentStatus, PredictedSchedule, Schedule, ScheduleView, UpdateScheduleRequest,
};
use crate::roster::{Predictor, ScheduleProvider};
use crate::AppState;

/// Longest window a single prediction request may ask for.
pub const MAX_PREDICTION_DAYS: u32 = 62;

/// Query parameters for schedule history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Query parameters for an explicit prediction window.
#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    pub days: u32,
}

/// GET /api/schedules - List all committed schedules.
pub async fn list_schedules(State(state): State<AppState>) -> ApiResult<Vec<ScheduleView>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_schedules().await {
        Ok(schedules) => success(
            schedules.into_iter().map(ScheduleView::committed).collect(),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/schedules/history?start=&end= - Committed schedules in an inclusive range.
pub async fn schedule_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<ScheduleView>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if query.start > query.end {
        return error(
            AppError::BadRequest("start must not be after end".to_string()),
            revision_id,
        );
    }

    match state.repo.schedules_between(query.start, query.end).await {
        Ok(schedules) => success(
            schedules.into_iter().map(ScheduleView::committed).collect(),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/schedules/weekPrediction - Predict the rest of the current week.
pub async fn week_prediction(State(state): State<AppState>) -> ApiResult<Vec<PredictedSchedule>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let today = state.clock.today();
    let days_left = state.calendar.working_days_left_in_week(today);
    if days_left == 0 {
        return success(Vec::new(), revision_id);
    }

    let predictor = Predictor::new(state.repo.as_ref(), state.calendar);
    match predictor.predict(today, days_left).await {
        Ok(schedules) => success(schedules, revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// GET /api/schedules/dayPrediction - Predict the schedule for today.
pub async fn day_prediction(
    State(state): State<AppState>,
) -> ApiResult<Option<PredictedSchedule>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let predictor = Predictor::new(state.repo.as_ref(), state.calendar);
    match predictor.predict(state.clock.today(), 1).await {
        Ok(schedules) => success(schedules.into_iter().next(), revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// GET /api/schedules/predict?start=&days= - Predict an explicit window.
pub async fn predict_schedules(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
) -> ApiResult<Vec<PredictedSchedule>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if query.days == 0 || query.days > MAX_PREDICTION_DAYS {
        return error(
            AppError::Validation(format!(
                "days must be between 1 and {}",
                MAX_PREDICTION_DAYS
            )),
            revision_id,
        );
    }

    let start = query.start.unwrap_or_else(|| state.clock.today());
    let predictor = Predictor::new(state.repo.as_ref(), state.calendar);

    // catch-up days count against the same limit
    match state.repo.latest_schedule().await {
        Ok(Some(anchor)) => {
            let window = predictor.window_len(anchor.date, start, query.days);
            if window > MAX_PREDICTION_DAYS as usize {
                return error(
                    AppError::Validation(format!(
                        "window of {} days after {} exceeds {} days",
                        window, anchor.date, MAX_PREDICTION_DAYS
                    )),
                    revision_id,
                );
            }
        }
        Ok(None) => {}
        Err(e) => return error(e, revision_id),
    }

    match predictor.predict(start, query.days).await {
        Ok(schedules) => success(schedules, revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// GET /api/schedules/:date - Get a committed schedule.
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<ScheduleView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_schedule(date).await {
        Ok(Some(schedule)) => success(ScheduleView::committed(schedule), revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Schedule {} not found", date)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/schedules - Commit a schedule.
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(schedule): Json<Schedule>,
) -> ApiResult<ScheduleView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if !state.calendar.is_working_day(schedule.date) {
        return error(
            AppError::Validation(format!(
                "{} falls on the rest day {}",
                schedule.date,
                state.calendar.rest_day()
            )),
            revision_id,
        );
    }
    if let Err(e) = validate_pre(&schedule.pre) {
        return error(e, revision_id);
    }

    match state.repo.create_schedule(&schedule).await {
        Ok(schedule) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(ScheduleView::committed(schedule), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/schedules/:date - Replace a committed schedule.
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Json(request): Json<UpdateScheduleRequest>,
) -> ApiResult<ScheduleView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = validate_pre(&request.pre) {
        return error(e, revision_id);
    }

    match state.repo.replace_schedule(date, &request).await {
        Ok(schedule) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(ScheduleView::committed(schedule), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/schedules/:date - Delete a committed schedule.
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_schedule(date).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// At most one rotation marker per schedule.
fn validate_pre(pre: &[Assignment]) -> Result<(), AppError> {
    let markers = pre
        .iter()
        .filter(|a| a.status == AssignmentStatus::Marker)
        .count();
    if markers > 1 {
        return Err(AppError::Validation(format!(
            "pre holds {} rotation markers, at most one allowed",
            markers
        )));
    }
    Ok(())
}
