//! Data Transfer Objects for the HTTP API.
//!
//! Request bodies arrive with every field optional so validation can name
//! everything that is missing in one response instead of failing on the
//! first absent field. Conversion into the domain types happens here,
//! before anything reaches the service layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{BusId, DriverId, RouteId};
use crate::models::{NewSchedule, ScheduleStatus, ScheduleUpdate, Shift, TimeOfDay};
use crate::services::{DriverScheduleDetail, ScheduleDetails, StopTime};

/// Request body for creating or replacing a schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePayload {
    pub driver_id: Option<i64>,
    pub bus_id: Option<i64>,
    pub route_id: Option<i64>,
    /// ISO date, e.g. "2026-09-01"
    pub date: Option<NaiveDate>,
    /// "morning" or "afternoon"
    pub shift_type: Option<String>,
    /// "HH:MM" or "HH:MM:SS"
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Defaults to 0 when omitted.
    pub student_count: Option<i32>,
    /// Only meaningful on update; ignored on create, where every schedule
    /// starts as `scheduled`.
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Core fields shared by create and update conversion.
struct ParsedPayload {
    driver_id: DriverId,
    bus_id: BusId,
    route_id: RouteId,
    date: NaiveDate,
    shift: Shift,
    start_time: TimeOfDay,
    end_time: TimeOfDay,
    student_count: i32,
    notes: Option<String>,
}

impl SchedulePayload {
    fn parse_required(&self) -> Result<ParsedPayload, String> {
        let mut missing = Vec::new();
        if self.driver_id.is_none() {
            missing.push("driver_id");
        }
        if self.bus_id.is_none() {
            missing.push("bus_id");
        }
        if self.route_id.is_none() {
            missing.push("route_id");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if self.shift_type.is_none() {
            missing.push("shift_type");
        }
        if self.start_time.is_none() {
            missing.push("start_time");
        }
        if self.end_time.is_none() {
            missing.push("end_time");
        }
        if !missing.is_empty() {
            return Err(format!("missing required fields: {}", missing.join(", ")));
        }

        let shift: Shift = self.shift_type.as_deref().unwrap_or_default().parse()?;
        let start_time = TimeOfDay::parse(self.start_time.as_deref().unwrap_or_default())?;
        let end_time = TimeOfDay::parse(self.end_time.as_deref().unwrap_or_default())?;

        let student_count = self.student_count.unwrap_or(0);
        if student_count < 0 {
            return Err("student_count must not be negative".to_string());
        }

        Ok(ParsedPayload {
            driver_id: DriverId::new(self.driver_id.unwrap_or_default()),
            bus_id: BusId::new(self.bus_id.unwrap_or_default()),
            route_id: RouteId::new(self.route_id.unwrap_or_default()),
            date: self.date.unwrap_or_default(),
            shift,
            start_time,
            end_time,
            student_count,
            notes: self.notes.clone(),
        })
    }

    /// Convert into a creation payload. The status field is ignored.
    pub fn into_new_schedule(self) -> Result<NewSchedule, String> {
        let p = self.parse_required()?;
        Ok(NewSchedule {
            driver_id: p.driver_id,
            bus_id: p.bus_id,
            route_id: p.route_id,
            date: p.date,
            shift: p.shift,
            start_time: p.start_time,
            end_time: p.end_time,
            student_count: p.student_count,
            notes: p.notes,
        })
    }

    /// Convert into a full-replace update payload. An absent status keeps
    /// the stored one.
    pub fn into_update(self) -> Result<ScheduleUpdate, String> {
        let p = self.parse_required()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<ScheduleStatus>)
            .transpose()?;
        Ok(ScheduleUpdate {
            driver_id: p.driver_id,
            bus_id: p.bus_id,
            route_id: p.route_id,
            date: p.date,
            shift: p.shift,
            start_time: p.start_time,
            end_time: p.end_time,
            student_count: p.student_count,
            status,
            notes: p.notes,
        })
    }
}

/// Request body for the status transition endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    /// "scheduled", "in_progress" or "completed"
    pub status: String,
}

/// Query parameters for schedule listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleListQuery {
    #[serde(default)]
    pub driver_id: Option<i64>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Query parameters for the driver work list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverScheduleQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Schedule list response.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleListResponse {
    pub schedules: Vec<ScheduleDetails>,
    pub total: usize,
}

/// Stop-time estimates for one schedule.
#[derive(Debug, Clone, Serialize)]
pub struct StopTimesResponse {
    /// Encoded schedule reference, e.g. "CH007"
    pub reference: String,
    pub route_name: String,
    pub stops: Vec<StopTime>,
    pub total_stops: usize,
}

/// Driver work list entry: a schedule with a preformatted time window.
#[derive(Debug, Clone, Serialize)]
pub struct DriverScheduleEntry {
    #[serde(flatten)]
    pub schedule: ScheduleDetails,
    /// "HH:MM - HH:MM"
    pub time_display: String,
}

impl From<ScheduleDetails> for DriverScheduleEntry {
    fn from(schedule: ScheduleDetails) -> Self {
        let time_display = format!("{} - {}", schedule.start_time, schedule.end_time);
        Self {
            schedule,
            time_display,
        }
    }
}

/// Driver work list response.
#[derive(Debug, Clone, Serialize)]
pub struct DriverScheduleListResponse {
    pub schedules: Vec<DriverScheduleEntry>,
    pub total: usize,
}

/// Driver detail response with roster.
#[derive(Debug, Clone, Serialize)]
pub struct DriverScheduleDetailResponse {
    #[serde(flatten)]
    pub detail: DriverScheduleDetail,
    pub student_total: usize,
}
