//! Reference directory records consumed by the scheduler.
//!
//! Drivers, buses, routes, stops and students are owned elsewhere; the
//! engine only reads them to resolve foreign keys into display data and
//! to compute stop-time estimates. Nothing here is ever created as a side
//! effect of scheduling.

use serde::{Deserialize, Serialize};

use crate::api::{BusId, DriverId, RouteId, StopId, StudentId};

/// Route-stop ordinal marking the route's origin.
pub const ORIGIN_STOP_ORDER: i32 = 0;

/// Route-stop ordinal marking the route's terminus.
pub const TERMINUS_STOP_ORDER: i32 = 99;

/// A driver directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub phone: Option<String>,
}

/// A bus directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub bus_number: String,
    pub license_plate: String,
}

/// A route directory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub id: RouteId,
    pub route_name: String,
    pub distance_km: Option<f64>,
}

/// A named location on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A stop attached to a route with its visiting ordinal.
///
/// Order 0 is the origin and 99 the terminus; positive values `1..N` are
/// intermediate stops in ascending visiting order. A route's full stop
/// sequence sorts ascending on this ordinal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub stop: Stop,
    pub stop_order: i32,
}

impl RouteStop {
    pub fn is_origin(&self) -> bool {
        self.stop_order == ORIGIN_STOP_ORDER
    }

    pub fn is_terminus(&self) -> bool {
        self.stop_order == TERMINUS_STOP_ORDER
    }
}

/// A student riding a route on a shift, with parent contact for the
/// driver's roster view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRider {
    pub id: StudentId,
    pub name: String,
    pub grade: String,
    pub class_name: String,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
}
