//! Abstract repository interface for schedule persistence and the
//! read-only reference directories.
//!
//! The service layer only ever talks to these traits; the concrete
//! backend (in-memory or Postgres) is chosen at process start by the
//! factory and injected explicitly. There is no ambient global handle.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::api::{BusId, DriverId, RouteId, ScheduleId};
use crate::models::{
    Bus, Driver, NewSchedule, RouteInfo, RouteStop, Schedule, ScheduleFilter, ScheduleStatus,
    ScheduleUpdate, Shift, StudentRider,
};

mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

/// Persistence operations on schedule records.
///
/// `insert_schedule` and `replace_schedule` are the authoritative
/// double-booking guards: implementations must reject, atomically with the
/// write, any assignment that already occupies the (date, shift) slot on
/// the driver, bus or route dimension, returning
/// [`RepositoryError::UniqueViolation`].
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Verify the backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Persist a new schedule with status `scheduled` and return it with
    /// its store-assigned id.
    async fn insert_schedule(&self, new_schedule: &NewSchedule) -> RepositoryResult<Schedule>;

    /// Replace every mutable field of an existing schedule.
    ///
    /// Returns `NotFound` when `id` does not exist. A `None` status in the
    /// update keeps the stored status.
    async fn replace_schedule(
        &self,
        id: ScheduleId,
        update: &ScheduleUpdate,
    ) -> RepositoryResult<Schedule>;

    /// Record a status value for an existing schedule.
    ///
    /// Transition legality is the service layer's concern; the repository
    /// only persists.
    async fn update_status(
        &self,
        id: ScheduleId,
        status: ScheduleStatus,
    ) -> RepositoryResult<Schedule>;

    /// Fetch a single schedule, `None` when absent.
    async fn fetch_schedule(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>>;

    /// List schedules matching the filter, ordered by date descending and
    /// start time ascending within a date.
    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>>;

    /// All schedules occupying a (date, shift) slot, optionally excluding
    /// one id (so an update does not conflict with itself).
    async fn find_assignments(
        &self,
        date: NaiveDate,
        shift: Shift,
        exclude: Option<ScheduleId>,
    ) -> RepositoryResult<Vec<Schedule>>;

    /// Delete a schedule. Returns `false` when the id did not exist.
    async fn delete_schedule(&self, id: ScheduleId) -> RepositoryResult<bool>;
}

/// Read-only lookups into the reference directories.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn fetch_driver(&self, id: DriverId) -> RepositoryResult<Option<Driver>>;

    async fn fetch_bus(&self, id: BusId) -> RepositoryResult<Option<Bus>>;

    async fn fetch_route(&self, id: RouteId) -> RepositoryResult<Option<RouteInfo>>;

    /// A route's stop sequence ordered ascending by stop order (origin 0,
    /// intermediates, terminus 99).
    async fn fetch_route_stops(&self, route_id: RouteId) -> RepositoryResult<Vec<RouteStop>>;

    /// Active students riding `route_id` on `shift`, ordered by name.
    async fn list_riders(
        &self,
        route_id: RouteId,
        shift: Shift,
    ) -> RepositoryResult<Vec<StudentRider>>;
}

/// Combined repository interface the application is wired against.
pub trait FullRepository: ScheduleRepository + DirectoryRepository {}

impl<T: ScheduleRepository + DirectoryRepository> FullRepository for T {}
