//! # Timestamps
//!
//! The ledger computes in exactly one unit: milliseconds since the Unix epoch,
//! carried by [`Timestamp`].
//!
//! Tranche dates are persisted as decimal strings of **nanoseconds** since the
//! epoch. [`NanoTimestamp`] is that wire type. It keeps the raw nanosecond value
//! so a document written back is bit-identical for every date the ledger did not
//! touch, and converts to a [`Timestamp`] only when arithmetic is needed:
//!
//! ```text
//! "1735689600000000000"  ──parse──►  NanoTimestamp  ──÷ 1_000_000──►  Timestamp(ms)
//! Timestamp(ms)  ──× 1_000_000──►  NanoTimestamp  ──format──►  "1735689600000000000"
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// ── Canonical unit ───────────────────────────────────────────────────

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// `None` when the value is outside chrono's representable range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }

    /// Signed distance `self - earlier` in milliseconds.
    pub fn millis_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn add_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    pub fn add_days(self, days: i64) -> Self {
        self.add_millis(days.saturating_mul(MILLIS_PER_DAY))
    }
}

// ── Wire unit ────────────────────────────────────────────────────────

/// Nanoseconds since the Unix epoch, stored as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NanoTimestamp(i128);

impl NanoTimestamp {
    pub const fn from_nanos(nanos: i128) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> i128 {
        self.0
    }

    pub fn from_timestamp(ts: Timestamp) -> Self {
        Self(i128::from(ts.0) * i128::from(NANOS_PER_MILLI))
    }

    /// Floors to whole milliseconds.
    pub fn to_timestamp(self) -> Timestamp {
        let millis = self.0.div_euclid(i128::from(NANOS_PER_MILLI));
        let clamped = i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX });
        Timestamp(clamped)
    }
}

impl From<Timestamp> for NanoTimestamp {
    fn from(ts: Timestamp) -> Self {
        Self::from_timestamp(ts)
    }
}

impl fmt::Display for NanoTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid nanosecond timestamp: {0:?}")]
pub struct ParseNanoTimestampError(String);

impl FromStr for NanoTimestamp {
    type Err = ParseNanoTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i128>()
            .map(Self)
            .map_err(|_| ParseNanoTimestampError(s.to_string()))
    }
}

impl Serialize for NanoTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NanoTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NanoVisitor)
    }
}

struct NanoVisitor;

impl<'de> Visitor<'de> for NanoVisitor {
    type Value = NanoTimestamp;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal string of nanoseconds since the Unix epoch")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    // Older documents occasionally carry the raw integer instead of a string.
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(NanoTimestamp(i128::from(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(NanoTimestamp(i128::from(v)))
    }
}

// ── Clocks ───────────────────────────────────────────────────────────

/// Source of "now" for the mutating ledger operations.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self(AtomicI64::new(start.as_millis()))
    }

    pub fn set(&self, ts: Timestamp) {
        self.0.store(ts.as_millis(), Ordering::SeqCst);
    }

    pub fn advance_millis(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.0.load(Ordering::SeqCst))
    }
}
