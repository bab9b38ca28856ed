//! Estimated stop times along a route.
//!
//! A schedule only records the departure and arrival times; per-stop
//! estimates are interpolated linearly across the stop sequence. The
//! route origin is pinned to the schedule's start time and the terminus
//! to its end time; intermediate stops get evenly spaced estimates in
//! between. Shifts that cross midnight are handled by doing the
//! arithmetic in minutes modulo one day.

use serde::Serialize;

use crate::models::{RouteStop, TimeOfDay};

/// One stop on a route with its interpolated time estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopTime {
    pub stop_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// "Departure" for the origin, "Arrival" for the terminus, "Stop"
    /// for everything between.
    pub label: &'static str,
    /// "Start", "End" or the intermediate stop's ordinal as a string.
    pub display_order: String,
    pub estimated_time: TimeOfDay,
}

/// Interpolate estimated times over an ordered stop sequence.
///
/// `stops` must already be sorted ascending by stop order. A single-stop
/// route gets the start time. With two or more stops, stop `i` of `n`
/// gets `start + round(i * total / (n - 1))` minutes, where `total` is
/// the wrapped duration from start to end; the origin and terminus are
/// pinned exactly to start and end regardless of rounding.
pub fn interpolate_stop_times(
    stops: &[RouteStop],
    start: TimeOfDay,
    end: TimeOfDay,
) -> Vec<StopTime> {
    let n = stops.len();
    if n == 0 {
        return Vec::new();
    }

    let total = start.minutes_until(end);

    stops
        .iter()
        .enumerate()
        .map(|(i, rs)| {
            let estimated_time = if n == 1 || rs.is_origin() {
                start
            } else if rs.is_terminus() {
                end
            } else {
                let step = total as f64 / (n - 1) as f64;
                let offset = (step * i as f64).round() as i32;
                TimeOfDay::from_minutes(start.minutes_since_midnight() + offset)
            };

            let (label, display_order) = if rs.is_origin() {
                ("Departure", "Start".to_string())
            } else if rs.is_terminus() {
                ("Arrival", "End".to_string())
            } else {
                ("Stop", rs.stop_order.to_string())
            };

            StopTime {
                stop_name: rs.stop.name.clone(),
                address: rs.stop.address.clone(),
                latitude: rs.stop.latitude,
                longitude: rs.stop.longitude,
                label,
                display_order,
                estimated_time,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StopId;
    use crate::models::{Stop, ORIGIN_STOP_ORDER, TERMINUS_STOP_ORDER};

    fn route_stop(id: i64, name: &str, order: i32) -> RouteStop {
        RouteStop {
            stop: Stop {
                id: StopId::new(id),
                name: name.to_string(),
                address: format!("{} Main St", id),
                latitude: 40.0,
                longitude: -3.0,
            },
            stop_order: order,
        }
    }

    fn t(h: u32, m: u32) -> TimeOfDay {
        TimeOfDay::from_hm(h, m).unwrap()
    }

    #[test]
    fn test_empty_sequence() {
        assert!(interpolate_stop_times(&[], t(7, 0), t(8, 0)).is_empty());
    }

    #[test]
    fn test_single_stop_gets_start_time() {
        let stops = vec![route_stop(1, "Depot", ORIGIN_STOP_ORDER)];
        let times = interpolate_stop_times(&stops, t(7, 0), t(8, 0));
        assert_eq!(times.len(), 1);
        assert_eq!(times[0].estimated_time, t(7, 0));
    }

    #[test]
    fn test_endpoints_pinned() {
        let stops = vec![
            route_stop(1, "Depot", ORIGIN_STOP_ORDER),
            route_stop(2, "Oak Ave", 1),
            route_stop(3, "School", TERMINUS_STOP_ORDER),
        ];
        let times = interpolate_stop_times(&stops, t(7, 0), t(8, 0));

        assert_eq!(times[0].estimated_time, t(7, 0));
        assert_eq!(times[0].label, "Departure");
        assert_eq!(times[0].display_order, "Start");

        assert_eq!(times[2].estimated_time, t(8, 0));
        assert_eq!(times[2].label, "Arrival");
        assert_eq!(times[2].display_order, "End");
    }

    #[test]
    fn test_intermediate_evenly_spaced() {
        let stops = vec![
            route_stop(1, "Depot", ORIGIN_STOP_ORDER),
            route_stop(2, "Oak Ave", 1),
            route_stop(3, "Pine Rd", 2),
            route_stop(4, "School", TERMINUS_STOP_ORDER),
        ];
        // 60 minutes over 3 segments: 20-minute steps.
        let times = interpolate_stop_times(&stops, t(7, 0), t(8, 0));
        assert_eq!(times[1].estimated_time, t(7, 20));
        assert_eq!(times[1].label, "Stop");
        assert_eq!(times[1].display_order, "1");
        assert_eq!(times[2].estimated_time, t(7, 40));
        assert_eq!(times[2].display_order, "2");
    }

    #[test]
    fn test_midnight_wrap() {
        let stops = vec![
            route_stop(1, "Depot", ORIGIN_STOP_ORDER),
            route_stop(2, "Oak Ave", 1),
            route_stop(3, "School", TERMINUS_STOP_ORDER),
        ];
        // 23:30 to 00:30 is 60 minutes across midnight; the midpoint
        // lands exactly on 00:00.
        let times = interpolate_stop_times(&stops, t(23, 30), t(0, 30));
        assert_eq!(times[1].estimated_time, t(0, 0));
        assert_eq!(times[2].estimated_time, t(0, 30));
    }

    #[test]
    fn test_rounding_to_whole_minutes() {
        let stops = vec![
            route_stop(1, "Depot", ORIGIN_STOP_ORDER),
            route_stop(2, "Oak Ave", 1),
            route_stop(3, "Pine Rd", 2),
            route_stop(4, "School", TERMINUS_STOP_ORDER),
        ];
        // 50 minutes over 3 segments: steps of 16.67 round to 17 and 33.
        let times = interpolate_stop_times(&stops, t(7, 0), t(7, 50));
        assert_eq!(times[1].estimated_time, t(7, 17));
        assert_eq!(times[2].estimated_time, t(7, 33));
    }
}
