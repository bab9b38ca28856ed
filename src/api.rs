//! Identifier newtypes shared across the crate.
//!
//! Every entity the scheduler touches is referenced by a numeric database
//! id. Wrapping the raw `i64`s keeps a driver id from being handed to a
//! bus lookup by accident.

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                $name(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }
    };
}

id_newtype!(
    /// Schedule identifier (database primary key).
    ScheduleId
);
id_newtype!(
    /// Driver identifier.
    DriverId
);
id_newtype!(
    /// Bus identifier.
    BusId
);
id_newtype!(
    /// Route identifier.
    RouteId
);
id_newtype!(
    /// Stop identifier.
    StopId
);
id_newtype!(
    /// Student identifier.
    StudentId
);
