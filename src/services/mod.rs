//! Business logic on top of the repository traits.
//!
//! Services take a repository reference explicitly; they hold no state of
//! their own. Handlers (or tests) resolve external schedule references to
//! numeric ids before calling in, so everything below this line works with
//! [`crate::api::ScheduleId`] only.

pub mod conflicts;
pub mod schedules;
pub mod stop_times;

pub use conflicts::detect_conflicts;
pub use schedules::{
    create_schedule, delete_schedule, driver_schedule_detail, driver_schedules, get_schedule,
    list_schedules, schedule_stop_times, set_status, update_schedule, DriverScheduleDetail,
    ScheduleDetails, ServiceError, ServiceResult,
};
pub use stop_times::{interpolate_stop_times, StopTime};
