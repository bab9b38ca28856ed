//! Schedule entity, shift and status enums, and conflict types.
//!
//! The central invariant lives here in type form: an [`Assignment`] names
//! the five fields on which double-booking is judged, and a [`Conflict`]
//! names the dimension on which a candidate collided with an existing
//! schedule in the same (date, shift) slot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{BusId, DriverId, RouteId, ScheduleId};
use crate::models::time::TimeOfDay;

/// One of the two daily service windows.
///
/// Together with the calendar date, the shift scopes the uniqueness
/// constraints: a driver, a bus, and a route may each be assigned at most
/// once per (date, shift).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
}

impl Shift {
    /// Human-facing label used in messages and list views.
    pub fn display_label(&self) -> &'static str {
        match self {
            Shift::Morning => "Morning shift",
            Shift::Afternoon => "Afternoon shift",
        }
    }

    /// Wire value, matching the stored `shift_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Afternoon => "afternoon",
        }
    }
}

impl std::str::FromStr for Shift {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(Shift::Morning),
            "afternoon" => Ok(Shift::Afternoon),
            other => Err(format!(
                "invalid shift_type '{}', expected 'morning' or 'afternoon'",
                other
            )),
        }
    }
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a schedule.
///
/// The state machine is strictly forward: `scheduled → in_progress →
/// completed`, with `completed` terminal. There is no cancellation state
/// and no rollback path; that is a scope boundary of the engine, not an
/// oversight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl ScheduleStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Identity transitions are allowed so a full-replace update that
    /// restates the current status is not rejected.
    pub fn can_transition_to(&self, next: ScheduleStatus) -> bool {
        use ScheduleStatus::*;
        matches!(
            (*self, next),
            (Scheduled, Scheduled)
                | (Scheduled, InProgress)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (Completed, Completed)
        )
    }

    /// Human-facing label shown to drivers and dispatchers.
    pub fn display_label(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "Not started",
            ScheduleStatus::InProgress => "In progress",
            ScheduleStatus::Completed => "Completed",
        }
    }

    /// Presentation color tag for list views.
    pub fn color_class(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "bg-gray-100 text-gray-700",
            ScheduleStatus::InProgress => "bg-blue-100 text-blue-700",
            ScheduleStatus::Completed => "bg-green-100 text-green-700",
        }
    }

    /// Wire value, matching the stored `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::InProgress => "in_progress",
            ScheduleStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ScheduleStatus::Scheduled),
            "in_progress" => Ok(ScheduleStatus::InProgress),
            "completed" => Ok(ScheduleStatus::Completed),
            other => Err(format!(
                "invalid status '{}', expected 'scheduled', 'in_progress' or 'completed'",
                other
            )),
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dimension on which a candidate assignment collides with an
/// existing schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    DriverConflict,
    BusConflict,
    RouteConflict,
}

impl ConflictKind {
    /// Error code surfaced to API clients.
    pub fn as_code(&self) -> &'static str {
        match self {
            ConflictKind::DriverConflict => "DRIVER_CONFLICT",
            ConflictKind::BusConflict => "BUS_CONFLICT",
            ConflictKind::RouteConflict => "ROUTE_CONFLICT",
        }
    }

    fn resource_noun(&self) -> &'static str {
        match self {
            ConflictKind::DriverConflict => "Driver",
            ConflictKind::BusConflict => "Bus",
            ConflictKind::RouteConflict => "Route",
        }
    }
}

/// A detected double-booking on one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub message: String,
}

impl Conflict {
    /// Build the conflict for a (date, shift) slot with the standard
    /// message. Both the advisory pre-check and the store-level constraint
    /// mapping go through here so callers see one consistent shape.
    pub fn for_slot(kind: ConflictKind, date: NaiveDate, shift: Shift) -> Self {
        Conflict {
            kind,
            message: format!(
                "{} already has another schedule on {} ({})",
                kind.resource_noun(),
                date.format("%Y-%m-%d"),
                shift.display_label().to_lowercase(),
            ),
        }
    }
}

///// The conflict-relevant slice of a schedule: the three resources plus the
/// (date, shift) slot they occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub driver_id: DriverId,
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub date: NaiveDate,
    pub shift: Shift,
}

/// A persisted schedule record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub driver_id: DriverId,
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub date: NaiveDate,
    pub shift: Shift,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub student_count: i32,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
}

impl Schedule {
    pub fn assignment(&self) -> Assignment {
        Assignment {
            driver_id: self.driver_id,
            bus_id: self.bus_id,
            route_id: self.route_id,
            date: self.date,
            shift: self.shift,
        }
    }
}

/// Fields for creating a schedule. Status is always `scheduled` on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSchedule {
    pub driver_id: DriverId,
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub date: NaiveDate,
    pub shift: Shift,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub student_count: i32,
    pub notes: Option<String>,
}

impl NewSchedule {
    pub fn assignment(&self) -> Assignment {
        Assignment {
            driver_id: self.driver_id,
            bus_id: self.bus_id,
            route_id: self.route_id,
            date: self.date,
            shift: self.shift,
        }
    }
}

/// Full-replace update payload. Every mutable field is overwritten; a
/// `None` status keeps the current one, anything else must be a legal
/// transition from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    pub driver_id: DriverId,
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub date: NaiveDate,
    pub shift: Shift,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub student_count: i32,
    pub status: Option<ScheduleStatus>,
    pub notes: Option<String>,
}

impl ScheduleUpdate {
    pub fn assignment(&self) -> Assignment {
        Assignment {
            driver_id: self.driver_id,
            bus_id: self.bus_id,
            route_id: self.route_id,
            date: self.date,
            shift: self.shift,
        }
    }
}

/// Filters accepted by schedule listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub driver_id: Option<DriverId>,
    pub date: Option<NaiveDate>,
}
