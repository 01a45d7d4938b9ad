//! Strategy parameter values and combinations.
//!
//! Values are normalized once at construction: `HH:MM` strings become
//! time-of-day values, `-0.0` folds to `0.0`, and non-finite floats are
//! rejected. A [`ParamSet`] is one full combination; its canonical key is
//! what the search cache is keyed by.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("non-finite parameter value: {0}")]
    NonFinite(f64),

    #[error("parameter '{name}' has no candidate values")]
    EmptyCandidates { name: String },

    #[error("parameter '{name}' is declared more than once")]
    DuplicateName { name: String },

    #[error("parameter '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("parameter grid is empty")]
    EmptyGrid,
}

/// One normalized parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Time of day, parsed from `HH:MM` or `HH:MM:SS`.
    Time(NaiveTime),
    Text(String),
}

fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    if !s.contains(':') {
        return None;
    }
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

impl ParamValue {
    /// Finite float, with `-0.0` folded to `0.0`.
    pub fn float(value: f64) -> Result<Self, ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NonFinite(value));
        }
        Ok(Self::Float(if value == 0.0 { 0.0 } else { value }))
    }

    /// Text value; `HH:MM` strings are promoted to [`ParamValue::Time`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        match parse_time_of_day(&value) {
            Some(t) => Self::Time(t),
            None => Self::Text(value),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Self::Time(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) | Self::Float(_) => 1,
            Self::Time(_) => 2,
            Self::Text(_) => 3,
        }
    }

    /// Total order used for median selection.
    ///
    /// Numbers compare by value (ints and floats together), times by seconds
    /// since midnight, text lexicographically, `false < true`. Values of
    /// different kinds order bool < number < time < text.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a
                .num_seconds_from_midnight()
                .cmp(&b.num_seconds_from_midnight()),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }

    /// Unambiguous rendering used inside combination keys.
    ///
    /// Floats always carry a decimal point and text is quoted, so `1`,
    /// `1.0` and `"1"` never collide.
    pub fn canonical(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => format!("{v:?}"),
            Self::Bool(v) => v.to_string(),
            Self::Time(t) => format_time(*t),
            Self::Text(s) => format!("{s:?}"),
        }
    }
}

fn format_time(t: NaiveTime) -> String {
    if t.second() == 0 {
        t.format("%H:%M").to_string()
    } else {
        t.format("%H:%M:%S").to_string()
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Time(t) => f.write_str(&format_time(*t)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<NaiveTime> for ParamValue {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::text(v)
    }
}

impl TryFrom<f64> for ParamValue {
    type Error = ParamError;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::float(v)
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Time(t) => serializer.serialize_str(&format_time(*t)),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParam {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawParam::deserialize(deserializer)? {
            RawParam::Bool(v) => Ok(Self::Bool(v)),
            RawParam::Int(v) => Ok(Self::Int(v)),
            RawParam::Float(v) => Self::float(v).map_err(serde::de::Error::custom),
            RawParam::Text(s) => Ok(Self::text(s)),
        }
    }
}

/// One full parameter combination, keyed by name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Typed lookups and canonical keys for [`ParamSet`].
pub trait ParamSetExt {
    fn int(&self, name: &str) -> Option<i64>;
    fn float(&self, name: &str) -> Option<f64>;
    fn flag(&self, name: &str) -> Option<bool>;
    fn time(&self, name: &str) -> Option<NaiveTime>;
    fn text(&self, name: &str) -> Option<&str>;

    /// `name=value` pairs in name order, joined with `;`.
    fn canonical_key(&self) -> String;
}

impl ParamSetExt for ParamSet {
    fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_i64)
    }

    fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    fn time(&self, name: &str) -> Option<NaiveTime> {
        self.get(name).and_then(ParamValue::as_time)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    fn canonical_key(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{name}={}", value.canonical()))
            .collect::<Vec<_>>()
            .join(";")
    }
}
