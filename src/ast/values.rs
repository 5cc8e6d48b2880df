use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::PrimitiveKind;

/// A time span with microsecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub micros: i64,
}

impl Interval {
    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub fn from_hms(hours: i64, minutes: i64, seconds: i64) -> Self {
        Self::from_micros(((hours * 60 + minutes) * 60 + seconds) * 1_000_000)
    }
}

impl From<TimeDelta> for Interval {
    fn from(delta: TimeDelta) -> Self {
        let micros = delta
            .num_microseconds()
            .unwrap_or(if delta < TimeDelta::zero() { i64::MIN } else { i64::MAX });
        Self { micros }
    }
}

/// A constant in the command tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Binary(Vec<u8>),
    Guid(Uuid),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Time(Interval),
}

impl Value {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Value::Bool(_) => PrimitiveKind::Boolean,
            Value::Byte(_) => PrimitiveKind::Byte,
            Value::SByte(_) => PrimitiveKind::SByte,
            Value::Int16(_) => PrimitiveKind::Int16,
            Value::Int32(_) => PrimitiveKind::Int32,
            Value::Int64(_) => PrimitiveKind::Int64,
            Value::Single(_) => PrimitiveKind::Single,
            Value::Double(_) => PrimitiveKind::Double,
            Value::Decimal(_) => PrimitiveKind::Decimal,
            Value::String(_) => PrimitiveKind::String,
            Value::Binary(_) => PrimitiveKind::Binary,
            Value::Guid(_) => PrimitiveKind::Guid,
            Value::DateTime(_) => PrimitiveKind::DateTime,
            Value::DateTimeOffset(_) => PrimitiveKind::DateTimeOffset,
            Value::Time(_) => PrimitiveKind::Time,
        }
    }

    /// Integer content of a whole-number constant.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v.into()),
            Value::SByte(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTimeOffset(v)
    }
}

impl From<Interval> for Value {
    fn from(v: Interval) -> Self {
        Value::Time(v)
    }
}
