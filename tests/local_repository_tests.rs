//! Integration tests for the in-memory repository.
//!
//! The local repository must honor the same contract the Postgres
//! implementation does: monotonically assigned ids, `scheduled` status on
//! insert, atomic slot uniqueness, reference validation, and the list
//! ordering (date descending, start time ascending within a date).

use chrono::NaiveDate;

use busfleet::api::{BusId, DriverId, RouteId, ScheduleId, StopId, StudentId};
use busfleet::db::repository::{
    DirectoryRepository, RepositoryError, ScheduleRepository,
};
use busfleet::db::repositories::{LocalRepository, StudentRecord};
use busfleet::models::{
    ConflictKind, NewSchedule, RouteStop, ScheduleFilter, ScheduleStatus, ScheduleUpdate, Shift,
    Stop, StudentRider, TimeOfDay, ORIGIN_STOP_ORDER, TERMINUS_STOP_ORDER,
};

// =========================================================
// Support
// =========================================================

fn seeded_repo() -> LocalRepository {
    let repo = LocalRepository::new();
    for id in 1..=4 {
        repo.seed_driver(id, &format!("Driver {}", id));
        repo.seed_bus(id, &format!("B-{:02}", id), &format!("PLATE-{}", id));
        repo.seed_route(id, &format!("Route {}", id), Some(id as f64 * 3.0));
    }
    repo
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, day).unwrap()
}

fn t(h: u32, m: u32) -> TimeOfDay {
    TimeOfDay::from_hm(h, m).unwrap()
}

fn new_schedule(driver: i64, bus: i64, route: i64, day: u32, shift: Shift) -> NewSchedule {
    NewSchedule {
        driver_id: DriverId::new(driver),
        bus_id: BusId::new(bus),
        route_id: RouteId::new(route),
        date: date(day),
        shift,
        start_time: t(7, 0),
        end_time: t(8, 30),
        student_count: 18,
        notes: None,
    }
}

fn update_from(new_schedule: &NewSchedule) -> ScheduleUpdate {
    ScheduleUpdate {
        driver_id: new_schedule.driver_id,
        bus_id: new_schedule.bus_id,
        route_id: new_schedule.route_id,
        date: new_schedule.date,
        shift: new_schedule.shift,
        start_time: new_schedule.start_time,
        end_time: new_schedule.end_time,
        student_count: new_schedule.student_count,
        status: None,
        notes: new_schedule.notes.clone(),
    }
}

// =========================================================
// Insert
// =========================================================

#[tokio::test]
async fn test_insert_assigns_sequential_ids_and_scheduled_status() {
    let repo = seeded_repo();

    let first = repo
        .insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();
    let second = repo
        .insert_schedule(&new_schedule(2, 2, 2, 1, Shift::Morning))
        .await
        .unwrap();

    assert_eq!(first.id.value(), 1);
    assert_eq!(second.id.value(), 2);
    assert_eq!(first.status, ScheduleStatus::Scheduled);
    assert_eq!(second.status, ScheduleStatus::Scheduled);
}

#[tokio::test]
async fn test_insert_rejects_unknown_driver() {
    let repo = seeded_repo();
    let err = repo
        .insert_schedule(&new_schedule(99, 1, 1, 1, Shift::Morning))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { .. }));
}

#[tokio::test]
async fn test_insert_rejects_unknown_bus_and_route() {
    let repo = seeded_repo();

    let err = repo
        .insert_schedule(&new_schedule(1, 99, 1, 1, Shift::Morning))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { .. }));

    let err = repo
        .insert_schedule(&new_schedule(1, 1, 99, 1, Shift::Morning))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { .. }));
}

// =========================================================
// Slot uniqueness guard
// =========================================================

#[tokio::test]
async fn test_double_insert_same_driver_rejected() {
    let repo = seeded_repo();
    repo.insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();

    let err = repo
        .insert_schedule(&new_schedule(1, 2, 2, 1, Shift::Morning))
        .await
        .unwrap_err();

    match err {
        RepositoryError::UniqueViolation { conflict, .. } => {
            assert_eq!(conflict.kind, ConflictKind::DriverConflict);
            assert!(conflict.message.contains("2026-09-01"));
        }
        other => panic!("expected UniqueViolation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_guard_priority_is_driver_then_bus_then_route() {
    let repo = seeded_repo();
    repo.insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();

    // Bus and route both collide; bus outranks route.
    let err = repo
        .insert_schedule(&new_schedule(2, 1, 1, 1, Shift::Morning))
        .await
        .unwrap_err();
    match err {
        RepositoryError::UniqueViolation { conflict, .. } => {
            assert_eq!(conflict.kind, ConflictKind::BusConflict);
        }
        other => panic!("expected UniqueViolation, got {:?}", other),
    }

    // Only the route collides.
    let err = repo
        .insert_schedule(&new_schedule(2, 2, 1, 1, Shift::Morning))
        .await
        .unwrap_err();
    match err {
        RepositoryError::UniqueViolation { conflict, .. } => {
            assert_eq!(conflict.kind, ConflictKind::RouteConflict);
        }
        other => panic!("expected UniqueViolation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_same_resources_on_other_shift_allowed() {
    let repo = seeded_repo();
    repo.insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();
    repo.insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Afternoon))
        .await
        .unwrap();
    repo.insert_schedule(&new_schedule(1, 1, 1, 2, Shift::Morning))
        .await
        .unwrap();
}

// =========================================================
// Replace
// =========================================================

#[tokio::test]
async fn test_replace_does_not_conflict_with_itself() {
    let repo = seeded_repo();
    let created = repo
        .insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();

    let mut update = update_from(&new_schedule(1, 1, 1, 1, Shift::Morning));
    update.student_count = 25;
    let replaced = repo.replace_schedule(created.id, &update).await.unwrap();

    assert_eq!(replaced.id, created.id);
    assert_eq!(replaced.student_count, 25);
    assert_eq!(replaced.status, ScheduleStatus::Scheduled);
}

#[tokio::test]
async fn test_replace_into_occupied_slot_rejected() {
    let repo = seeded_repo();
    repo.insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();
    let second = repo
        .insert_schedule(&new_schedule(2, 2, 2, 1, Shift::Morning))
        .await
        .unwrap();

    // Move the second schedule onto the first one's driver.
    let update = update_from(&new_schedule(1, 2, 2, 1, Shift::Morning));
    let err = repo.replace_schedule(second.id, &update).await.unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueViolation { .. }));
}

#[tokio::test]
async fn test_replace_missing_schedule_is_not_found() {
    let repo = seeded_repo();
    let update = update_from(&new_schedule(1, 1, 1, 1, Shift::Morning));
    let err = repo
        .replace_schedule(ScheduleId::new(404), &update)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[tokio::test]
async fn test_replace_keeps_status_when_update_omits_it() {
    let repo = seeded_repo();
    let created = repo
        .insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();
    repo.update_status(created.id, ScheduleStatus::InProgress)
        .await
        .unwrap();

    let update = update_from(&new_schedule(1, 1, 1, 1, Shift::Morning));
    let replaced = repo.replace_schedule(created.id, &update).await.unwrap();
    assert_eq!(replaced.status, ScheduleStatus::InProgress);
}

// =========================================================
// Listing and lookups
// =========================================================

#[tokio::test]
async fn test_list_orders_date_desc_then_start_asc() {
    let repo = seeded_repo();

    let mut early_day2 = new_schedule(1, 1, 1, 2, Shift::Morning);
    early_day2.start_time = t(6, 30);
    let mut late_day2 = new_schedule(2, 2, 2, 2, Shift::Morning);
    late_day2.start_time = t(9, 0);
    let day1 = new_schedule(3, 3, 3, 1, Shift::Morning);

    repo.insert_schedule(&late_day2).await.unwrap();
    repo.insert_schedule(&day1).await.unwrap();
    repo.insert_schedule(&early_day2).await.unwrap();

    let all = repo.list_schedules(&ScheduleFilter::default()).await.unwrap();
    let order: Vec<(NaiveDate, TimeOfDay)> = all.iter().map(|s| (s.date, s.start_time)).collect();
    assert_eq!(
        order,
        vec![
            (date(2), t(6, 30)),
            (date(2), t(9, 0)),
            (date(1), t(7, 0)),
        ]
    );
}

#[tokio::test]
async fn test_list_filters_by_driver_and_date() {
    let repo = seeded_repo();
    repo.insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();
    repo.insert_schedule(&new_schedule(1, 2, 2, 2, Shift::Morning))
        .await
        .unwrap();
    repo.insert_schedule(&new_schedule(2, 3, 3, 1, Shift::Morning))
        .await
        .unwrap();

    let filter = ScheduleFilter {
        driver_id: Some(DriverId::new(1)),
        date: None,
    };
    assert_eq!(repo.list_schedules(&filter).await.unwrap().len(), 2);

    let filter = ScheduleFilter {
        driver_id: Some(DriverId::new(1)),
        date: Some(date(2)),
    };
    let one = repo.list_schedules(&filter).await.unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].date, date(2));
}

#[tokio::test]
async fn test_find_assignments_excludes_requested_id() {
    let repo = seeded_repo();
    let first = repo
        .insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();
    repo.insert_schedule(&new_schedule(2, 2, 2, 1, Shift::Morning))
        .await
        .unwrap();

    let all = repo
        .find_assignments(date(1), Shift::Morning, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let without_first = repo
        .find_assignments(date(1), Shift::Morning, Some(first.id))
        .await
        .unwrap();
    assert_eq!(without_first.len(), 1);
    assert_ne!(without_first[0].id, first.id);
}

#[tokio::test]
async fn test_delete_reports_existence() {
    let repo = seeded_repo();
    let created = repo
        .insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();

    assert!(repo.delete_schedule(created.id).await.unwrap());
    assert!(!repo.delete_schedule(created.id).await.unwrap());
    assert!(repo.fetch_schedule(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_frees_the_slot() {
    let repo = seeded_repo();
    let created = repo
        .insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();
    repo.delete_schedule(created.id).await.unwrap();

    repo.insert_schedule(&new_schedule(1, 1, 1, 1, Shift::Morning))
        .await
        .unwrap();
}

// =========================================================
// Directory lookups
// =========================================================

fn stop(id: i64, name: &str) -> Stop {
    Stop {
        id: StopId::new(id),
        name: name.to_string(),
        address: format!("{} Elm St", id),
        latitude: 41.0,
        longitude: -4.0,
    }
}

#[tokio::test]
async fn test_route_stops_returned_in_visiting_order() {
    let repo = seeded_repo();
    let route_id = RouteId::new(1);

    // Seeded out of order on purpose.
    repo.seed_route_stops(
        route_id,
        vec![
            RouteStop {
                stop: stop(3, "School"),
                stop_order: TERMINUS_STOP_ORDER,
            },
            RouteStop {
                stop: stop(1, "Depot"),
                stop_order: ORIGIN_STOP_ORDER,
            },
            RouteStop {
                stop: stop(2, "Oak Ave"),
                stop_order: 1,
            },
        ],
    );

    let stops = repo.fetch_route_stops(route_id).await.unwrap();
    let orders: Vec<i32> = stops.iter().map(|rs| rs.stop_order).collect();
    assert_eq!(orders, vec![ORIGIN_STOP_ORDER, 1, TERMINUS_STOP_ORDER]);
}

fn student(id: i64, name: &str, morning: Option<i64>, afternoon: Option<i64>, active: bool) -> StudentRecord {
    StudentRecord {
        rider: StudentRider {
            id: StudentId::new(id),
            name: name.to_string(),
            grade: "3".to_string(),
            class_name: "3-B".to_string(),
            parent_name: Some(format!("Parent of {}", name)),
            parent_phone: Some("555-0100".to_string()),
        },
        morning_route_id: morning.map(RouteId::new),
        afternoon_route_id: afternoon.map(RouteId::new),
        active,
    }
}

#[tokio::test]
async fn test_riders_filtered_by_shift_and_active_sorted_by_name() {
    let repo = seeded_repo();

    repo.seed_student(student(1, "Zoe", Some(1), None, true));
    repo.seed_student(student(2, "Ana", Some(1), Some(2), true));
    repo.seed_student(student(3, "Ben", None, Some(1), true));
    repo.seed_student(student(4, "Inactive", Some(1), None, false));

    let morning = repo.list_riders(RouteId::new(1), Shift::Morning).await.unwrap();
    let names: Vec<&str> = morning.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Zoe"]);

    let afternoon = repo
        .list_riders(RouteId::new(1), Shift::Afternoon)
        .await
        .unwrap();
    assert_eq!(afternoon.len(), 1);
    assert_eq!(afternoon[0].name, "Ben");
}
