//! Externally visible schedule reference codec.
//!
//! Schedules are addressed from outside the engine either by their raw
//! numeric id or by the display form `"CH"` followed by the id zero-padded
//! to three digits (`7` ⇒ `"CH007"`). Parsing happens exactly once, at the
//! system boundary; past that point only the numeric [`ScheduleId`] flows.

use serde::{Deserialize, Serialize};

use crate::api::ScheduleId;

/// Prefix of the encoded display form.
pub const REFERENCE_PREFIX: &str = "CH";

/// Error produced when a schedule reference cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// A `CH`-prefixed reference whose remainder is not a number.
    #[error("invalid encoded schedule reference '{0}': expected digits after '{REFERENCE_PREFIX}'")]
    MalformedEncoded(String),
    /// A bare reference that is not a number.
    #[error("invalid schedule reference '{0}': expected a numeric id or a '{REFERENCE_PREFIX}'-prefixed id")]
    MalformedNumeric(String),
}

/// A schedule reference as received at the boundary, before resolution.
///
/// The two forms are kept distinct so callers can tell how a schedule was
/// addressed, but both resolve to the same canonical numeric identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleRef {
    /// Raw numeric id, e.g. `"42"`.
    Numeric(ScheduleId),
    /// Encoded display form, e.g. `"CH042"`.
    Encoded(ScheduleId),
}

impl ScheduleRef {
    /// Decode a reference string into its canonical numeric identity.
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        if let Some(rest) = raw.strip_prefix(REFERENCE_PREFIX) {
            let id = rest
                .parse::<i64>()
                .map_err(|_| ReferenceError::MalformedEncoded(raw.to_string()))?;
            Ok(ScheduleRef::Encoded(ScheduleId::new(id)))
        } else {
            let id = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ReferenceError::MalformedNumeric(raw.to_string()))?;
            Ok(ScheduleRef::Numeric(ScheduleId::new(id)))
        }
    }

    /// The resolved numeric identity.
    pub fn id(&self) -> ScheduleId {
        match *self {
            ScheduleRef::Numeric(id) | ScheduleRef::Encoded(id) => id,
        }
    }

    /// Encode an id into the display form: `"CH"` + 3-digit zero-padded id.
    pub fn encode(id: ScheduleId) -> String {
        format!("{}{:03}", REFERENCE_PREFIX, id.value())
    }
}

impl std::str::FromStr for ScheduleRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScheduleRef::parse(s)
    }
}
