//! Value-typed network entities (§4.1).
//!
//! Every entity here holds only foreign-key-style ids (stop code, route id,
//! trip id) and never a direct reference to another entity, so the graph
//! builder never has to untangle cyclic ownership.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minutes in a day. Clock arithmetic wraps here, never across a date.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A day-local clock time, `(hour, minute, second)` with `hour < 24`.
///
/// This is the wire-level representation used throughout the core: there is
/// no `NaiveDateTime`, no timezone, since every clock-time is day-local (see
/// Open Question 1 in the design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        debug_assert!(hour < 24, "hour out of range: {hour}");
        debug_assert!(minute < 60, "minute out of range: {minute}");
        debug_assert!(second < 60, "second out of range: {second}");
        Self { hour, minute, second }
    }

    pub fn midnight() -> Self {
        Self { hour: 0, minute: 0, second: 0 }
    }

    /// Total minutes since midnight, fractional seconds truncated down.
    pub fn total_minutes(self) -> f64 {
        self.hour as f64 * 60.0 + self.minute as f64 + self.second as f64 / 60.0
    }

    /// Minutes from `self` to `to`, wrapped to `[0, 1440)`.
    ///
    /// This is the cost model's wait-time helper (§4.3): the wait is never
    /// negative because wraparound is interpreted as "already passed today".
    pub fn minutes_until(self, to: ClockTime) -> f64 {
        let diff = to.total_minutes() - self.total_minutes();
        if diff < 0.0 {
            diff + MINUTES_PER_DAY as f64
        } else {
            diff
        }
    }

    /// `self` advanced by `minutes`, wrapping at midnight.
    pub fn add_minutes(self, minutes: f64) -> ClockTime {
        let total_seconds = self.hour as f64 * 3600.0 + self.minute as f64 * 60.0 + self.second as f64 + minutes * 60.0;
        let wrapped = total_seconds.rem_euclid(86_400.0);
        let hour = (wrapped / 3600.0) as u8;
        let minute = ((wrapped % 3600.0) / 60.0) as u8;
        let second = (wrapped % 60.0) as u8;
        ClockTime { hour, minute, second }
    }

    /// True iff `self` is at or after `other`, within the same day (no wraparound).
    pub fn is_same_day_at_or_after(self, other: ClockTime) -> bool {
        self >= other
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// `bus` | `rail` | `tram` — a closed set, never extended by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    Bus,
    Rail,
    Tram,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportMode::Bus => "bus",
            TransportMode::Rail => "rail",
            TransportMode::Tram => "tram",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognised transport mode: {0:?}")]
pub struct UnknownModeError(pub String);

impl FromStr for TransportMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bus" => Ok(TransportMode::Bus),
            "rail" => Ok(TransportMode::Rail),
            "tram" => Ok(TransportMode::Tram),
            other => Err(UnknownModeError(other.to_owned())),
        }
    }
}

/// A bus stop, tram stop, or rail station, identified by an opaque
/// alphanumeric stop code (an ATCO code in a UK deployment) of at most 20
/// characters. Equality and hashing are by code alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub code: String,
    pub name: String,
    pub mode: TransportMode,
    pub latitude: f64,
    pub longitude: f64,
    pub locality: Option<String>,
    /// Service-density metric, `0 <= hub_score <= hub_score_max` for whatever
    /// `hub_score_max` the caller supplies to the cost model at query time.
    pub hub_score: f64,
}

impl PartialEq for Stop {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}
impl Eq for Stop {}

/// An operator service. Looked up only for display and disruption masking;
/// routing itself never dereferences anything beyond `route_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub route_id: u32,
    pub operator: String,
    pub route_name: String,
    pub mode: TransportMode,
}

/// One scheduled stop-time within a trip.
///
/// `days_of_week`/`valid_from`/`valid_to` are carried through unfiltered —
/// the graph builder does not apply them (Open Question 2); a boundary
/// adaptor is expected to have pre-filtered entries for the query date
/// before a `Snapshot` ever reaches `build_graph`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub route_id: u32,
    pub stop_code: String,
    pub stop_sequence: u32,
    pub arrival_time: Option<ClockTime>,
    pub departure_time: Option<ClockTime>,
    pub trip_id: Option<String>,
    pub days_of_week: Option<String>,
    pub valid_from: Option<chrono::NaiveDate>,
    pub valid_to: Option<chrono::NaiveDate>,
}
