use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;

use super::schema::{buses, drivers, route_stops, routes, schedules, stops, students};
use crate::api::{BusId, DriverId, RouteId, ScheduleId, StopId, StudentId};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    Bus, Driver, NewSchedule, RouteInfo, RouteStop, Schedule, ScheduleStatus, ScheduleUpdate,
    Shift, Stop, StudentRider, TimeOfDay,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // created_at is carried for database operations only
pub struct ScheduleRow {
    pub id: i64,
    pub driver_id: i64,
    pub bus_id: i64,
    pub route_id: i64,
    pub date: NaiveDate,
    pub shift_type: String,
    pub scheduled_start_time: NaiveTime,
    pub scheduled_end_time: NaiveTime,
    pub student_count: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScheduleRow {
    /// Convert a stored row into the domain entity. Enum columns are
    /// guarded by CHECK constraints, so a parse failure here means the
    /// database was modified out of band.
    pub fn into_schedule(self) -> RepositoryResult<Schedule> {
        let shift: Shift = self
            .shift_type
            .parse()
            .map_err(|e: String| RepositoryError::internal(format!("bad shift_type column: {e}")))?;
        let status: ScheduleStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::internal(format!("bad status column: {e}")))?;

        Ok(Schedule {
            id: ScheduleId::new(self.id),
            driver_id: DriverId::new(self.driver_id),
            bus_id: BusId::new(self.bus_id),
            route_id: RouteId::new(self.route_id),
            date: self.date,
            shift,
            start_time: TimeOfDay::from(self.scheduled_start_time),
            end_time: TimeOfDay::from(self.scheduled_end_time),
            student_count: self.student_count,
            status,
            notes: self.notes,
        })
    }
}

// Full-replace semantics: a None in `notes` clears the column rather than
// leaving it untouched.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = schedules)]
#[diesel(treat_none_as_null = true)]
pub struct ScheduleChangeset {
    pub driver_id: i64,
    pub bus_id: i64,
    pub route_id: i64,
    pub date: NaiveDate,
    pub shift_type: String,
    pub scheduled_start_time: NaiveTime,
    pub scheduled_end_time: NaiveTime,
    pub student_count: i32,
    pub status: String,
    pub notes: Option<String>,
}

impl ScheduleChangeset {
    pub fn from_new(new_schedule: &NewSchedule) -> Self {
        Self {
            driver_id: new_schedule.driver_id.value(),
            bus_id: new_schedule.bus_id.value(),
            route_id: new_schedule.route_id.value(),
            date: new_schedule.date,
            shift_type: new_schedule.shift.as_str().to_string(),
            scheduled_start_time: new_schedule.start_time.as_naive(),
            scheduled_end_time: new_schedule.end_time.as_naive(),
            student_count: new_schedule.student_count,
            status: ScheduleStatus::Scheduled.as_str().to_string(),
            notes: new_schedule.notes.clone(),
        }
    }

    pub fn from_update(update: &ScheduleUpdate, current_status: ScheduleStatus) -> Self {
        Self {
            driver_id: update.driver_id.value(),
            bus_id: update.bus_id.value(),
            route_id: update.route_id.value(),
            date: update.date,
            shift_type: update.shift.as_str().to_string(),
            scheduled_start_time: update.start_time.as_naive(),
            scheduled_end_time: update.end_time.as_naive(),
            student_count: update.student_count,
            status: update.status.unwrap_or(current_status).as_str().to_string(),
            notes: update.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = drivers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DriverRow {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
}

impl From<DriverRow> for Driver {
    fn from(row: DriverRow) -> Self {
        Driver {
            id: DriverId::new(row.id),
            name: row.name,
            phone: row.phone,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = buses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BusRow {
    pub id: i64,
    pub bus_number: String,
    pub license_plate: String,
}

impl From<BusRow> for Bus {
    fn from(row: BusRow) -> Self {
        Bus {
            id: BusId::new(row.id),
            bus_number: row.bus_number,
            license_plate: row.license_plate,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = routes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RouteRow {
    pub id: i64,
    pub route_name: String,
    pub distance_km: Option<f64>,
}

impl From<RouteRow> for RouteInfo {
    fn from(row: RouteRow) -> Self {
        RouteInfo {
            id: RouteId::new(row.id),
            route_name: row.route_name,
            distance_km: row.distance_km,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = stops)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StopRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<StopRow> for Stop {
    fn from(row: StopRow) -> Self {
        Stop {
            id: StopId::new(row.id),
            name: row.name,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = route_stops)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // id and route_id used only for database operations
pub struct RouteStopRow {
    pub id: i64,
    pub route_id: i64,
    pub stop_id: i64,
    pub stop_order: i32,
}

impl RouteStopRow {
    pub fn with_stop(self, stop: StopRow) -> RouteStop {
        RouteStop {
            stop: stop.into(),
            stop_order: self.stop_order,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // route assignment columns are used in query filters
pub struct StudentRow {
    pub id: i64,
    pub name: String,
    pub grade: String,
    pub class_name: String,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub morning_route_id: Option<i64>,
    pub afternoon_route_id: Option<i64>,
    pub active: bool,
}

impl From<StudentRow> for StudentRider {
    fn from(row: StudentRow) -> Self {
        StudentRider {
            id: StudentId::new(row.id),
            name: row.name,
            grade: row.grade,
            class_name: row.class_name,
            parent_name: row.parent_name,
            parent_phone: row.parent_phone,
        }
    }
}
