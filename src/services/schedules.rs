//! Schedule lifecycle orchestration.
//!
//! Create/update runs the advisory conflict pre-check before writing and
//! relies on the repository's atomic uniqueness guard for the race window;
//! both paths surface the same [`Conflict`] shape. Reads enrich the bare
//! schedule record with display data resolved from the reference
//! directories, falling back to placeholder text when a referenced entity
//! has disappeared rather than failing the whole view.

use log::{debug, warn};

use crate::api::{DriverId, ScheduleId};
use crate::db::repository::{FullRepository, RepositoryError};
use crate::models::{
    Conflict, NewSchedule, Schedule, ScheduleFilter, ScheduleRef, ScheduleStatus, ScheduleUpdate,
    StudentRider,
};

use super::stop_times::{interpolate_stop_times, StopTime};

/// Placeholder shown when a referenced driver or bus no longer exists.
const MISSING_TEXT: &str = "N/A";

/// Placeholder route name when the referenced route no longer exists.
const MISSING_ROUTE_NAME: &str = "Unassigned route";

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the schedule services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input failed validation before reaching storage.
    #[error("{0}")]
    Validation(String),

    /// The assignment double-books a driver, bus or route.
    #[error("{}", .0.message)]
    Conflict(Conflict),

    /// The addressed entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The storage layer failed.
    #[error(transparent)]
    Store(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation { conflict, .. } => ServiceError::Conflict(conflict),
            RepositoryError::NotFound { message, .. } => ServiceError::NotFound(message),
            RepositoryError::Validation { message, .. } => ServiceError::Validation(message),
            other => ServiceError::Store(other),
        }
    }
}

/// A schedule enriched with display data from the reference directories.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScheduleDetails {
    /// Encoded display reference, e.g. `"CH042"`.
    pub reference: String,
    pub schedule_id: ScheduleId,
    pub date: chrono::NaiveDate,
    pub shift: crate::models::Shift,
    pub shift_display: &'static str,
    pub start_time: crate::models::TimeOfDay,
    pub end_time: crate::models::TimeOfDay,
    pub student_count: i32,
    pub status: ScheduleStatus,
    pub status_text: &'static str,
    pub status_color: &'static str,
    pub notes: Option<String>,
    pub driver_id: DriverId,
    pub driver_name: String,
    pub driver_phone: Option<String>,
    pub bus_id: crate::api::BusId,
    pub bus_number: String,
    pub license_plate: String,
    pub route_id: crate::api::RouteId,
    pub route_name: String,
}

/// A driver's view of one schedule, with route endpoints and rider roster.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DriverScheduleDetail {
    #[serde(flatten)]
    pub schedule: ScheduleDetails,
    pub origin_stop: Option<String>,
    pub terminus_stop: Option<String>,
    pub students: Vec<StudentRider>,
}

/// Resolve directory display data for a schedule record.
///
/// Missing directory entries degrade to placeholder text instead of
/// failing the read; a schedule must stay viewable even when its driver,
/// bus or route was deleted out from under it.
async fn enrich(repo: &dyn FullRepository, schedule: Schedule) -> ServiceResult<ScheduleDetails> {
    let driver = repo.fetch_driver(schedule.driver_id).await?;
    let bus = repo.fetch_bus(schedule.bus_id).await?;
    let route = repo.fetch_route(schedule.route_id).await?;

    if driver.is_none() || bus.is_none() || route.is_none() {
        warn!(
            "schedule {} references missing directory entries",
            schedule.id
        );
    }

    let (driver_name, driver_phone) = match driver {
        Some(d) => (d.name, d.phone),
        None => (MISSING_TEXT.to_string(), None),
    };
    let (bus_number, license_plate) = match bus {
        Some(b) => (b.bus_number, b.license_plate),
        None => (MISSING_TEXT.to_string(), MISSING_TEXT.to_string()),
    };
    let route_name = route
        .map(|r| r.route_name)
        .unwrap_or_else(|| MISSING_ROUTE_NAME.to_string());

    Ok(ScheduleDetails {
        reference: ScheduleRef::encode(schedule.id),
        schedule_id: schedule.id,
        date: schedule.date,
        shift: schedule.shift,
        shift_display: schedule.shift.display_label(),
        start_time: schedule.start_time,
        end_time: schedule.end_time,
        student_count: schedule.student_count,
        status: schedule.status,
        status_text: schedule.status.display_label(),
        status_color: schedule.status.color_class(),
        notes: schedule.notes,
        driver_id: schedule.driver_id,
        driver_name,
        driver_phone,
        bus_id: schedule.bus_id,
        bus_number,
        license_plate,
        route_id: schedule.route_id,
        route_name,
    })
}

fn not_found(id: ScheduleId) -> ServiceError {
    ServiceError::NotFound(format!("schedule {} not found", ScheduleRef::encode(id)))
}

/// Create a schedule after the advisory conflict pre-check.
///
/// The first detected conflict is returned, checked driver first, then
/// bus, then route. The repository's atomic uniqueness guard covers the
/// window between the pre-check and the write.
pub async fn create_schedule(
    repo: &dyn FullRepository,
    new_schedule: NewSchedule,
) -> ServiceResult<ScheduleDetails> {
    let conflicts = super::detect_conflicts(repo, &new_schedule.assignment(), None).await?;
    if let Some(first) = conflicts.into_iter().next() {
        return Err(ServiceError::Conflict(first));
    }

    let schedule = repo.insert_schedule(&new_schedule).await?;
    debug!("schedule {} created", schedule.id);
    enrich(repo, schedule).await
}

/// Replace a schedule's mutable fields.
///
/// The update's assignment is re-checked against the slot with the record
/// itself excluded. A status in the update must be a legal transition from
/// the stored status; omitting it keeps the stored status.
pub async fn update_schedule(
    repo: &dyn FullRepository,
    id: ScheduleId,
    update: ScheduleUpdate,
) -> ServiceResult<ScheduleDetails> {
    let current = repo.fetch_schedule(id).await?.ok_or_else(|| not_found(id))?;

    if let Some(next) = update.status {
        if !current.status.can_transition_to(next) {
            return Err(ServiceError::Validation(format!(
                "illegal status transition from '{}' to '{}'",
                current.status.as_str(),
                next.as_str()
            )));
        }
    }

    let conflicts = super::detect_conflicts(repo, &update.assignment(), Some(id)).await?;
    if let Some(first) = conflicts.into_iter().next() {
        return Err(ServiceError::Conflict(first));
    }

    let schedule = repo.replace_schedule(id, &update).await?;
    debug!("schedule {} updated", id);
    enrich(repo, schedule).await
}

/// Fetch one schedule with display enrichment.
pub async fn get_schedule(
    repo: &dyn FullRepository,
    id: ScheduleId,
) -> ServiceResult<ScheduleDetails> {
    let schedule = repo.fetch_schedule(id).await?.ok_or_else(|| not_found(id))?;
    enrich(repo, schedule).await
}

/// List schedules matching the filter, newest date first, enriched.
pub async fn list_schedules(
    repo: &dyn FullRepository,
    filter: &ScheduleFilter,
) -> ServiceResult<Vec<ScheduleDetails>> {
    let schedules = repo.list_schedules(filter).await?;
    let mut out = Vec::with_capacity(schedules.len());
    for schedule in schedules {
        out.push(enrich(repo, schedule).await?);
    }
    Ok(out)
}

/// Delete a schedule.
pub async fn delete_schedule(repo: &dyn FullRepository, id: ScheduleId) -> ServiceResult<()> {
    if !repo.delete_schedule(id).await? {
        return Err(not_found(id));
    }
    debug!("schedule {} deleted", id);
    Ok(())
}

/// Advance a schedule's lifecycle status.
///
/// Legal transitions are scheduled to in_progress and in_progress to
/// completed; restating the current status is a no-op that succeeds.
pub async fn set_status(
    repo: &dyn FullRepository,
    id: ScheduleId,
    status: ScheduleStatus,
) -> ServiceResult<ScheduleDetails> {
    let current = repo.fetch_schedule(id).await?.ok_or_else(|| not_found(id))?;

    if !current.status.can_transition_to(status) {
        return Err(ServiceError::Validation(format!(
            "illegal status transition from '{}' to '{}'",
            current.status.as_str(),
            status.as_str()
        )));
    }

    let schedule = if current.status == status {
        current
    } else {
        repo.update_status(id, status).await?
    };
    enrich(repo, schedule).await
}

/// Interpolated stop-time estimates for a schedule's route.
pub async fn schedule_stop_times(
    repo: &dyn FullRepository,
    id: ScheduleId,
) -> ServiceResult<Vec<StopTime>> {
    let schedule = repo.fetch_schedule(id).await?.ok_or_else(|| not_found(id))?;
    let stops = repo.fetch_route_stops(schedule.route_id).await?;
    Ok(interpolate_stop_times(
        &stops,
        schedule.start_time,
        schedule.end_time,
    ))
}

/// A driver's work list, newest date first, optionally narrowed to a date.
pub async fn driver_schedules(
    repo: &dyn FullRepository,
    driver_id: DriverId,
    date: Option<chrono::NaiveDate>,
) -> ServiceResult<Vec<ScheduleDetails>> {
    let filter = ScheduleFilter {
        driver_id: Some(driver_id),
        date,
    };
    list_schedules(repo, &filter).await
}

/// A driver's detailed view of one of their schedules: route endpoints
/// plus the roster of active students riding the route on that shift.
///
/// Returns `NotFound` when the schedule exists but belongs to a different
/// driver, so one driver cannot address another's schedule.
pub async fn driver_schedule_detail(
    repo: &dyn FullRepository,
    driver_id: DriverId,
    id: ScheduleId,
) -> ServiceResult<DriverScheduleDetail> {
    let schedule = repo.fetch_schedule(id).await?.ok_or_else(|| not_found(id))?;
    if schedule.driver_id != driver_id {
        return Err(not_found(id));
    }

    let stops = repo.fetch_route_stops(schedule.route_id).await?;
    let origin_stop = stops
        .iter()
        .find(|rs| rs.is_origin())
        .map(|rs| rs.stop.name.clone());
    let terminus_stop = stops
        .iter()
        .find(|rs| rs.is_terminus())
        .map(|rs| rs.stop.name.clone());

    let students = repo.list_riders(schedule.route_id, schedule.shift).await?;
    let schedule = enrich(repo, schedule).await?;

    Ok(DriverScheduleDetail {
        schedule,
        origin_stop,
        terminus_stop,
        students,
    })
}
