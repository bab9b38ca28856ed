//! Domain models for the scheduling engine.

pub mod reference;
pub mod route;
pub mod schedule;
pub mod time;

pub use reference::{ReferenceError, ScheduleRef, REFERENCE_PREFIX};
pub use route::{
    Bus, Driver, RouteInfo, RouteStop, Stop, StudentRider, ORIGIN_STOP_ORDER, TERMINUS_STOP_ORDER,
};
pub use schedule::{
    Assignment, Conflict, ConflictKind, NewSchedule, Schedule, ScheduleFilter, ScheduleStatus,
    ScheduleUpdate, Shift,
};
pub use time::{TimeOfDay, MINUTES_PER_DAY};
