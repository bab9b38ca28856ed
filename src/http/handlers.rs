//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint. Schedule references in
//! paths are decoded here, once, into numeric ids; everything else is
//! delegated to the service layer.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::dto::{
    DriverScheduleDetailResponse, DriverScheduleEntry, DriverScheduleListResponse,
    DriverScheduleQuery, HealthResponse, ScheduleListQuery, ScheduleListResponse, SchedulePayload,
    StatusChangeRequest, StopTimesResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{DriverId, ScheduleId};
use crate::models::{ScheduleFilter, ScheduleRef, ScheduleStatus};
use crate::services;
use crate::services::ScheduleDetails;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Decode a path reference ("42" or "CH042") into a schedule id.
fn resolve_reference(raw: &str) -> Result<ScheduleId, AppError> {
    Ok(ScheduleRef::parse(raw)?.id())
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Verify the service is running and the storage backend is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Schedule CRUD
// =============================================================================

/// GET /v1/schedules
///
/// List schedules, newest date first, optionally filtered by driver
/// and/or date.
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ScheduleListQuery>,
) -> HandlerResult<ScheduleListResponse> {
    let filter = ScheduleFilter {
        driver_id: query.driver_id.map(DriverId::new),
        date: query.date,
    };
    let schedules = services::list_schedules(state.repository.as_ref(), &filter).await?;
    let total = schedules.len();

    Ok(Json(ScheduleListResponse { schedules, total }))
}

/// POST /v1/schedules
///
/// Create a schedule. Returns 201 with the enriched record, or 409 with
/// the first detected conflict.
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(payload): Json<SchedulePayload>,
) -> Result<(StatusCode, Json<ScheduleDetails>), AppError> {
    let new_schedule = payload.into_new_schedule().map_err(AppError::BadRequest)?;
    let details = services::create_schedule(state.repository.as_ref(), new_schedule).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /v1/schedules/{reference}
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> HandlerResult<ScheduleDetails> {
    let id = resolve_reference(&reference)?;
    let details = services::get_schedule(state.repository.as_ref(), id).await?;
    Ok(Json(details))
}

/// PUT /v1/schedules/{reference}
///
/// Full-replace update. Re-runs conflict detection with the record itself
/// excluded; a provided status must be a legal transition.
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Json(payload): Json<SchedulePayload>,
) -> HandlerResult<ScheduleDetails> {
    let id = resolve_reference(&reference)?;
    let update = payload.into_update().map_err(AppError::BadRequest)?;
    let details = services::update_schedule(state.repository.as_ref(), id, update).await?;
    Ok(Json(details))
}

/// DELETE /v1/schedules/{reference}
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = resolve_reference(&reference)?;
    services::delete_schedule(state.repository.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/schedules/{reference}/status
///
/// Advance the lifecycle status: scheduled → in_progress → completed.
pub async fn change_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> HandlerResult<ScheduleDetails> {
    let id = resolve_reference(&reference)?;
    let status: ScheduleStatus = request.status.parse().map_err(AppError::BadRequest)?;
    let details = services::set_status(state.repository.as_ref(), id, status).await?;
    Ok(Json(details))
}

/// GET /v1/schedules/{reference}/stops
///
/// Interpolated stop-time estimates over the schedule's route.
pub async fn get_stop_times(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> HandlerResult<StopTimesResponse> {
    let id = resolve_reference(&reference)?;
    let details = services::get_schedule(state.repository.as_ref(), id).await?;
    let stops = services::schedule_stop_times(state.repository.as_ref(), id).await?;
    let total_stops = stops.len();

    Ok(Json(StopTimesResponse {
        reference: details.reference,
        route_name: details.route_name,
        stops,
        total_stops,
    }))
}

// =============================================================================
// Driver Views
// =============================================================================

/// GET /v1/drivers/{driver_id}/schedules
///
/// A driver's work list, optionally narrowed to a single date.
pub async fn list_driver_schedules(
    State(state): State<AppState>,
    Path(driver_id): Path<i64>,
    Query(query): Query<DriverScheduleQuery>,
) -> HandlerResult<DriverScheduleListResponse> {
    let schedules = services::driver_schedules(
        state.repository.as_ref(),
        DriverId::new(driver_id),
        query.date,
    )
    .await?;
    let schedules: Vec<DriverScheduleEntry> = schedules.into_iter().map(Into::into).collect();
    let total = schedules.len();

    Ok(Json(DriverScheduleListResponse { schedules, total }))
}

/// GET /v1/drivers/{driver_id}/schedules/{reference}
///
/// A driver's detailed view of one schedule: route endpoints, bus info
/// and the roster of active students riding that route on that shift.
pub async fn get_driver_schedule(
    State(state): State<AppState>,
    Path((driver_id, reference)): Path<(i64, String)>,
) -> HandlerResult<DriverScheduleDetailResponse> {
    let id = resolve_reference(&reference)?;
    let detail =
        services::driver_schedule_detail(state.repository.as_ref(), DriverId::new(driver_id), id)
            .await?;
    let student_total = detail.students.len();

    Ok(Json(DriverScheduleDetailResponse {
        detail,
        student_total,
    }))
}
