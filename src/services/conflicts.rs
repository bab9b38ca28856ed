//! Advisory double-booking detection.
//!
//! A candidate assignment conflicts with an existing schedule when both
//! occupy the same (date, shift) slot and share a driver, bus or route.
//! Detection loads the slot's schedules once and checks the three
//! dimensions in fixed priority order, driver first, then bus, then
//! route, without stopping at the first hit, so callers see every
//! dimension that collides.
//!
//! This check is advisory: it races with concurrent writers by nature.
//! The store-level uniqueness constraints are the authoritative guard and
//! surface the same [`Conflict`] shape when they fire.

use crate::api::ScheduleId;
use crate::db::repository::{RepositoryResult, ScheduleRepository};
use crate::models::{Assignment, Conflict, ConflictKind};

/// Detect slot collisions for a candidate assignment.
///
/// `exclude` removes one schedule id from consideration so an update does
/// not conflict with the record it is replacing. At most one conflict is
/// reported per dimension, ordered driver, bus, route.
pub async fn detect_conflicts(
    repo: &dyn ScheduleRepository,
    candidate: &Assignment,
    exclude: Option<ScheduleId>,
) -> RepositoryResult<Vec<Conflict>> {
    let occupants = repo
        .find_assignments(candidate.date, candidate.shift, exclude)
        .await?;

    let mut conflicts = Vec::new();

    if occupants.iter().any(|s| s.driver_id == candidate.driver_id) {
        conflicts.push(Conflict::for_slot(
            ConflictKind::DriverConflict,
            candidate.date,
            candidate.shift,
        ));
    }
    if occupants.iter().any(|s| s.bus_id == candidate.bus_id) {
        conflicts.push(Conflict::for_slot(
            ConflictKind::BusConflict,
            candidate.date,
            candidate.shift,
        ));
    }
    if occupants.iter().any(|s| s.route_id == candidate.route_id) {
        conflicts.push(Conflict::for_slot(
            ConflictKind::RouteConflict,
            candidate.date,
            candidate.shift,
        ));
    }

    Ok(conflicts)
}
