//! In-memory repository for unit testing and local development.
//!
//! State lives behind a single `parking_lot::RwLock`, so a conflict
//! re-check and the following write happen atomically: the in-memory
//! backend gives the same double-booking guarantee the Postgres unique
//! indexes give, and returns the same
//! [`RepositoryError::UniqueViolation`] shape.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::api::{BusId, DriverId, RouteId, ScheduleId, StudentId};
use crate::db::repository::{
    DirectoryRepository, ErrorContext, RepositoryError, RepositoryResult, ScheduleRepository,
};
use crate::models::{
    Assignment, Bus, Conflict, ConflictKind, Driver, NewSchedule, RouteInfo, RouteStop, Schedule,
    ScheduleFilter, ScheduleStatus, ScheduleUpdate, Shift, StudentRider,
};

/// A student directory row: the rider plus their route assignments.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub rider: StudentRider,
    pub morning_route_id: Option<RouteId>,
    pub afternoon_route_id: Option<RouteId>,
    pub active: bool,
}

#[derive(Default)]
struct Store {
    schedules: BTreeMap<i64, Schedule>,
    next_schedule_id: i64,
    drivers: BTreeMap<i64, Driver>,
    buses: BTreeMap<i64, Bus>,
    routes: BTreeMap<i64, RouteInfo>,
    route_stops: BTreeMap<i64, Vec<RouteStop>>,
    students: BTreeMap<i64, StudentRecord>,
}

impl Store {
    /// First conflict for a candidate assignment, in the fixed driver →
    /// bus → route priority order. Called under the write lock so the
    /// check and the subsequent insert are one atomic step.
    fn slot_conflict(&self, candidate: &Assignment, exclude: Option<ScheduleId>) -> Option<Conflict> {
        let occupied = |f: &dyn Fn(&Schedule) -> bool| {
            self.schedules.values().any(|s| {
                s.date == candidate.date
                    && s.shift == candidate.shift
                    && exclude != Some(s.id)
                    && f(s)
            })
        };

        for (kind, taken) in [
            (
                ConflictKind::DriverConflict,
                occupied(&|s: &Schedule| s.driver_id == candidate.driver_id),
            ),
            (
                ConflictKind::BusConflict,
                occupied(&|s: &Schedule| s.bus_id == candidate.bus_id),
            ),
            (
                ConflictKind::RouteConflict,
                occupied(&|s: &Schedule| s.route_id == candidate.route_id),
            ),
        ] {
            if taken {
                return Some(Conflict::for_slot(kind, candidate.date, candidate.shift));
            }
        }
        None
    }

    /// Foreign references must pre-exist; scheduling never creates them.
    fn check_references(&self, candidate: &Assignment, operation: &str) -> RepositoryResult<()> {
        if !self.drivers.contains_key(&candidate.driver_id.value()) {
            return Err(RepositoryError::validation_with_context(
                format!("driver {} does not exist", candidate.driver_id),
                ErrorContext::new(operation).with_entity("driver"),
            ));
        }
        if !self.buses.contains_key(&candidate.bus_id.value()) {
            return Err(RepositoryError::validation_with_context(
                format!("bus {} does not exist", candidate.bus_id),
                ErrorContext::new(operation).with_entity("bus"),
            ));
        }
        if !self.routes.contains_key(&candidate.route_id.value()) {
            return Err(RepositoryError::validation_with_context(
                format!("route {} does not exist", candidate.route_id),
                ErrorContext::new(operation).with_entity("route"),
            ));
        }
        Ok(())
    }
}

/// In-memory implementation of the repository traits.
pub struct LocalRepository {
    store: RwLock<Store>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                next_schedule_id: 1,
                ..Default::default()
            }),
        }
    }

    // ---- directory seeding (tests and local development) ----

    pub fn seed_driver(&self, id: i64, name: &str) -> DriverId {
        let driver_id = DriverId::new(id);
        self.store.write().drivers.insert(
            id,
            Driver {
                id: driver_id,
                name: name.to_string(),
                phone: None,
            },
        );
        driver_id
    }

    pub fn seed_bus(&self, id: i64, bus_number: &str, license_plate: &str) -> BusId {
        let bus_id = BusId::new(id);
        self.store.write().buses.insert(
            id,
            Bus {
                id: bus_id,
                bus_number: bus_number.to_string(),
                license_plate: license_plate.to_string(),
            },
        );
        bus_id
    }

    pub fn seed_route(&self, id: i64, route_name: &str, distance_km: Option<f64>) -> RouteId {
        let route_id = RouteId::new(id);
        self.store.write().routes.insert(
            id,
            RouteInfo {
                id: route_id,
                route_name: route_name.to_string(),
                distance_km,
            },
        );
        route_id
    }

    /// Attach a stop sequence to a route. Stops are stored sorted by
    /// ordinal so reads never re-sort.
    pub fn seed_route_stops(&self, route_id: RouteId, mut stops: Vec<RouteStop>) {
        stops.sort_by_key(|rs| rs.stop_order);
        self.store.write().route_stops.insert(route_id.value(), stops);
    }

    pub fn seed_student(&self, record: StudentRecord) -> StudentId {
        let id = record.rider.id;
        self.store.write().students.insert(id.value(), record);
        id
    }

    /// Drop a driver from the directory. Directory rows are owned
    /// elsewhere and can disappear under live schedules; reads must
    /// degrade rather than fail.
    pub fn remove_driver(&self, id: DriverId) {
        self.store.write().drivers.remove(&id.value());
    }

    pub fn remove_bus(&self, id: BusId) {
        self.store.write().buses.remove(&id.value());
    }

    pub fn remove_route(&self, id: RouteId) {
        self.store.write().routes.remove(&id.value());
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    async fn insert_schedule(&self, new_schedule: &NewSchedule) -> RepositoryResult<Schedule> {
        let mut store = self.store.write();

        let candidate = new_schedule.assignment();
        store.check_references(&candidate, "insert_schedule")?;
        if let Some(conflict) = store.slot_conflict(&candidate, None) {
            return Err(RepositoryError::unique_violation_with_context(
                conflict,
                ErrorContext::new("insert_schedule").with_entity("schedule"),
            ));
        }

        let id = store.next_schedule_id;
        store.next_schedule_id += 1;

        let schedule = Schedule {
            id: ScheduleId::new(id),
            driver_id: new_schedule.driver_id,
            bus_id: new_schedule.bus_id,
            route_id: new_schedule.route_id,
            date: new_schedule.date,
            shift: new_schedule.shift,
            start_time: new_schedule.start_time,
            end_time: new_schedule.end_time,
            student_count: new_schedule.student_count,
            status: ScheduleStatus::Scheduled,
            notes: new_schedule.notes.clone(),
        };
        store.schedules.insert(id, schedule.clone());
        Ok(schedule)
    }

    async fn replace_schedule(
        &self,
        id: ScheduleId,
        update: &ScheduleUpdate,
    ) -> RepositoryResult<Schedule> {
        let mut store = self.store.write();

        let current = store.schedules.get(&id.value()).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("schedule {} not found", id),
                ErrorContext::new("replace_schedule")
                    .with_entity("schedule")
                    .with_entity_id(id),
            )
        })?;

        let candidate = update.assignment();
        store.check_references(&candidate, "replace_schedule")?;
        if let Some(conflict) = store.slot_conflict(&candidate, Some(id)) {
            return Err(RepositoryError::unique_violation_with_context(
                conflict,
                ErrorContext::new("replace_schedule")
                    .with_entity("schedule")
                    .with_entity_id(id),
            ));
        }

        let schedule = Schedule {
            id,
            driver_id: update.driver_id,
            bus_id: update.bus_id,
            route_id: update.route_id,
            date: update.date,
            shift: update.shift,
            start_time: update.start_time,
            end_time: update.end_time,
            student_count: update.student_count,
            status: update.status.unwrap_or(current.status),
            notes: update.notes.clone(),
        };
        store.schedules.insert(id.value(), schedule.clone());
        Ok(schedule)
    }

    async fn update_status(
        &self,
        id: ScheduleId,
        status: ScheduleStatus,
    ) -> RepositoryResult<Schedule> {
        let mut store = self.store.write();
        let schedule = store.schedules.get_mut(&id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("schedule {} not found", id),
                ErrorContext::new("update_status")
                    .with_entity("schedule")
                    .with_entity_id(id),
            )
        })?;
        schedule.status = status;
        Ok(schedule.clone())
    }

    async fn fetch_schedule(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>> {
        Ok(self.store.read().schedules.get(&id.value()).cloned())
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        let store = self.store.read();
        let mut schedules: Vec<Schedule> = store
            .schedules
            .values()
            .filter(|s| filter.driver_id.is_none_or(|d| s.driver_id == d))
            .filter(|s| filter.date.is_none_or(|d| s.date == d))
            .cloned()
            .collect();
        // Most recent date first, earliest start first within a date
        schedules.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then(a.start_time.cmp(&b.start_time))
                .then(a.id.cmp(&b.id))
        });
        Ok(schedules)
    }

    async fn find_assignments(
        &self,
        date: NaiveDate,
        shift: Shift,
        exclude: Option<ScheduleId>,
    ) -> RepositoryResult<Vec<Schedule>> {
        let store = self.store.read();
        Ok(store
            .schedules
            .values()
            .filter(|s| s.date == date && s.shift == shift && exclude != Some(s.id))
            .cloned()
            .collect())
    }

    async fn delete_schedule(&self, id: ScheduleId) -> RepositoryResult<bool> {
        Ok(self.store.write().schedules.remove(&id.value()).is_some())
    }
}

#[async_trait]
impl DirectoryRepository for LocalRepository {
    async fn fetch_driver(&self, id: DriverId) -> RepositoryResult<Option<Driver>> {
        Ok(self.store.read().drivers.get(&id.value()).cloned())
    }

    async fn fetch_bus(&self, id: BusId) -> RepositoryResult<Option<Bus>> {
        Ok(self.store.read().buses.get(&id.value()).cloned())
    }

    async fn fetch_route(&self, id: RouteId) -> RepositoryResult<Option<RouteInfo>> {
        Ok(self.store.read().routes.get(&id.value()).cloned())
    }

    async fn fetch_route_stops(&self, route_id: RouteId) -> RepositoryResult<Vec<RouteStop>> {
        Ok(self
            .store
            .read()
            .route_stops
            .get(&route_id.value())
            .cloned()
            .unwrap_or_default())
    }

    async fn list_riders(
        &self,
        route_id: RouteId,
        shift: Shift,
    ) -> RepositoryResult<Vec<StudentRider>> {
        let store = self.store.read();
        let mut riders: Vec<StudentRider> = store
            .students
            .values()
            .filter(|rec| rec.active)
            .filter(|rec| {
                let assigned = match shift {
                    Shift::Morning => rec.morning_route_id,
                    Shift::Afternoon => rec.afternoon_route_id,
                };
                assigned == Some(route_id)
            })
            .map(|rec| rec.rider.clone())
            .collect();
        riders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(riders)
    }
}
