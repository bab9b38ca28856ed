//! Integration tests for the schedule service layer.
//!
//! Covers the create/update/status workflows, enrichment of reads with
//! directory data (including the degraded placeholders when directory
//! rows disappear), stop-time views, and the driver-facing views.

use chrono::NaiveDate;

use busfleet::api::{BusId, DriverId, RouteId, ScheduleId, StopId, StudentId};
use busfleet::db::repositories::{LocalRepository, StudentRecord};
use busfleet::models::{
    NewSchedule, RouteStop, ScheduleStatus, ScheduleUpdate, Shift, Stop, StudentRider, TimeOfDay,
    ORIGIN_STOP_ORDER, TERMINUS_STOP_ORDER,
};
use busfleet::services::{self, ServiceError};

// =========================================================
// Support
// =========================================================

fn seeded_repo() -> LocalRepository {
    let repo = LocalRepository::new();
    repo.seed_driver(1, "Maria Lopez");
    repo.seed_driver(2, "Sam Carter");
    repo.seed_bus(1, "B-01", "ABC-123");
    repo.seed_bus(2, "B-02", "DEF-456");
    repo.seed_route(1, "North Loop", Some(12.5));
    repo.seed_route(2, "South Loop", Some(9.0));
    repo
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, day).unwrap()
}

fn t(h: u32, m: u32) -> TimeOfDay {
    TimeOfDay::from_hm(h, m).unwrap()
}

fn new_schedule(driver: i64, bus: i64, route: i64) -> NewSchedule {
    NewSchedule {
        driver_id: DriverId::new(driver),
        bus_id: BusId::new(bus),
        route_id: RouteId::new(route),
        date: date(1),
        shift: Shift::Morning,
        start_time: t(7, 0),
        end_time: t(8, 0),
        student_count: 12,
        notes: Some("first day".to_string()),
    }
}

fn update_of(schedule: &NewSchedule, status: Option<ScheduleStatus>) -> ScheduleUpdate {
    ScheduleUpdate {
        driver_id: schedule.driver_id,
        bus_id: schedule.bus_id,
        route_id: schedule.route_id,
        date: schedule.date,
        shift: schedule.shift,
        start_time: schedule.start_time,
        end_time: schedule.end_time,
        student_count: schedule.student_count,
        status,
        notes: schedule.notes.clone(),
    }
}

fn seed_stops(repo: &LocalRepository, route: i64) {
    let mk = |id: i64, name: &str| Stop {
        id: StopId::new(id),
        name: name.to_string(),
        address: format!("{} Main St", id),
        latitude: 40.4,
        longitude: -3.7,
    };
    repo.seed_route_stops(
        RouteId::new(route),
        vec![
            RouteStop {
                stop: mk(1, "Depot"),
                stop_order: ORIGIN_STOP_ORDER,
            },
            RouteStop {
                stop: mk(2, "Oak Ave"),
                stop_order: 1,
            },
            RouteStop {
                stop: mk(3, "Pine Rd"),
                stop_order: 2,
            },
            RouteStop {
                stop: mk(4, "School"),
                stop_order: TERMINUS_STOP_ORDER,
            },
        ],
    );
}

// =========================================================
// Create
// =========================================================

#[tokio::test]
async fn test_create_returns_enriched_details() {
    let repo = seeded_repo();
    let details = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    assert_eq!(details.reference, "CH001");
    assert_eq!(details.schedule_id.value(), 1);
    assert_eq!(details.driver_name, "Maria Lopez");
    assert_eq!(details.bus_number, "B-01");
    assert_eq!(details.license_plate, "ABC-123");
    assert_eq!(details.route_name, "North Loop");
    assert_eq!(details.shift_display, "Morning shift");
    assert_eq!(details.status, ScheduleStatus::Scheduled);
    assert_eq!(details.status_text, "Not started");
}

#[tokio::test]
async fn test_create_surfaces_first_conflict_only() {
    let repo = seeded_repo();
    services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    // Driver, bus and route all collide; the driver conflict wins.
    let err = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap_err();
    match err {
        ServiceError::Conflict(conflict) => {
            assert_eq!(conflict.kind.as_code(), "DRIVER_CONFLICT");
        }
        other => panic!("expected Conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fixing_one_conflict_surfaces_the_next() {
    let repo = seeded_repo();
    services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    // Fix the driver: the bus conflict is reported next.
    let err = services::create_schedule(&repo, new_schedule(2, 1, 1))
        .await
        .unwrap_err();
    match err {
        ServiceError::Conflict(conflict) => assert_eq!(conflict.kind.as_code(), "BUS_CONFLICT"),
        other => panic!("expected Conflict, got {:?}", other),
    }

    // Fix the bus too: the route conflict remains.
    let err = services::create_schedule(&repo, new_schedule(2, 2, 1))
        .await
        .unwrap_err();
    match err {
        ServiceError::Conflict(conflict) => assert_eq!(conflict.kind.as_code(), "ROUTE_CONFLICT"),
        other => panic!("expected Conflict, got {:?}", other),
    }

    // All three fixed: creation succeeds.
    services::create_schedule(&repo, new_schedule(2, 2, 2))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_with_unknown_reference_is_validation_error() {
    let repo = seeded_repo();
    let err = services::create_schedule(&repo, new_schedule(99, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

// =========================================================
// Update
// =========================================================

#[tokio::test]
async fn test_update_moves_schedule_between_slots() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    let mut moved = new_schedule(1, 1, 1);
    moved.shift = Shift::Afternoon;
    let details = services::update_schedule(&repo, created.schedule_id, update_of(&moved, None))
        .await
        .unwrap();
    assert_eq!(details.shift, Shift::Afternoon);
    assert_eq!(details.reference, created.reference);
}

#[tokio::test]
async fn test_update_rejects_illegal_status_jump() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    // scheduled → completed skips in_progress.
    let err = services::update_schedule(
        &repo,
        created.schedule_id,
        update_of(&new_schedule(1, 1, 1), Some(ScheduleStatus::Completed)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_update_missing_schedule_not_found() {
    let repo = seeded_repo();
    let err = services::update_schedule(
        &repo,
        ScheduleId::new(404),
        update_of(&new_schedule(1, 1, 1), None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

// =========================================================
// Status lifecycle
// =========================================================

#[tokio::test]
async fn test_status_walks_the_full_lifecycle() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();
    let id = created.schedule_id;

    let details = services::set_status(&repo, id, ScheduleStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(details.status_text, "In progress");

    let details = services::set_status(&repo, id, ScheduleStatus::Completed)
        .await
        .unwrap();
    assert_eq!(details.status_text, "Completed");
    assert_eq!(details.status_color, "bg-green-100 text-green-700");
}

#[tokio::test]
async fn test_status_identity_transition_is_noop() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    let details = services::set_status(&repo, created.schedule_id, ScheduleStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(details.status, ScheduleStatus::Scheduled);
}

#[tokio::test]
async fn test_status_cannot_leave_completed() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();
    let id = created.schedule_id;

    services::set_status(&repo, id, ScheduleStatus::InProgress)
        .await
        .unwrap();
    services::set_status(&repo, id, ScheduleStatus::Completed)
        .await
        .unwrap();

    let err = services::set_status(&repo, id, ScheduleStatus::InProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

// =========================================================
// Enrichment fallbacks
// =========================================================

#[tokio::test]
async fn test_missing_directory_rows_degrade_to_placeholders() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    repo.remove_driver(DriverId::new(1));
    repo.remove_bus(BusId::new(1));
    repo.remove_route(RouteId::new(1));

    let details = services::get_schedule(&repo, created.schedule_id)
        .await
        .unwrap();
    assert_eq!(details.driver_name, "N/A");
    assert_eq!(details.bus_number, "N/A");
    assert_eq!(details.license_plate, "N/A");
    assert_eq!(details.route_name, "Unassigned route");
}

// =========================================================
// Stop times
// =========================================================

#[tokio::test]
async fn test_stop_times_follow_schedule_window() {
    let repo = seeded_repo();
    seed_stops(&repo, 1);
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    let stops = services::schedule_stop_times(&repo, created.schedule_id)
        .await
        .unwrap();
    assert_eq!(stops.len(), 4);
    assert_eq!(stops[0].estimated_time, t(7, 0));
    assert_eq!(stops[0].label, "Departure");
    assert_eq!(stops[3].estimated_time, t(8, 0));
    assert_eq!(stops[3].label, "Arrival");
    assert_eq!(stops[1].estimated_time, t(7, 20));
    assert_eq!(stops[2].estimated_time, t(7, 40));
}

#[tokio::test]
async fn test_stop_times_for_route_without_stops_is_empty() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();
    let stops = services::schedule_stop_times(&repo, created.schedule_id)
        .await
        .unwrap();
    assert!(stops.is_empty());
}

// =========================================================
// Driver views
// =========================================================

fn rider(id: i64, name: &str, morning_route: Option<i64>, active: bool) -> StudentRecord {
    StudentRecord {
        rider: StudentRider {
            id: StudentId::new(id),
            name: name.to_string(),
            grade: "4".to_string(),
            class_name: "4-A".to_string(),
            parent_name: Some(format!("Parent {}", name)),
            parent_phone: Some("555-0101".to_string()),
        },
        morning_route_id: morning_route.map(RouteId::new),
        afternoon_route_id: None,
        active,
    }
}

#[tokio::test]
async fn test_driver_work_list_only_their_schedules() {
    let repo = seeded_repo();
    services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();
    services::create_schedule(&repo, new_schedule(2, 2, 2))
        .await
        .unwrap();

    let list = services::driver_schedules(&repo, DriverId::new(1), None)
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].driver_name, "Maria Lopez");
}

#[tokio::test]
async fn test_driver_detail_includes_endpoints_and_roster() {
    let repo = seeded_repo();
    seed_stops(&repo, 1);
    repo.seed_student(rider(1, "Noa", Some(1), true));
    repo.seed_student(rider(2, "Leo", Some(1), true));
    repo.seed_student(rider(3, "Sol", Some(2), true));
    repo.seed_student(rider(4, "Out", Some(1), false));

    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    let detail = services::driver_schedule_detail(&repo, DriverId::new(1), created.schedule_id)
        .await
        .unwrap();
    assert_eq!(detail.origin_stop.as_deref(), Some("Depot"));
    assert_eq!(detail.terminus_stop.as_deref(), Some("School"));

    let names: Vec<&str> = detail.students.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Leo", "Noa"]);
}

#[tokio::test]
async fn test_driver_cannot_address_anothers_schedule() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    let err = services::driver_schedule_detail(&repo, DriverId::new(2), created.schedule_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

// =========================================================
// Delete
// =========================================================

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let repo = seeded_repo();
    let created = services::create_schedule(&repo, new_schedule(1, 1, 1))
        .await
        .unwrap();

    services::delete_schedule(&repo, created.schedule_id)
        .await
        .unwrap();
    let err = services::get_schedule(&repo, created.schedule_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = services::delete_schedule(&repo, created.schedule_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
