use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Named primitive conversions usable as a field transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Converter {
    Boolean,
    Date,
    Number,
    Integer,
    Json,
}

impl Converter {
    pub fn name(self) -> &'static str {
        match self {
            Converter::Boolean => "boolean",
            Converter::Date => "date",
            Converter::Number => "number",
            Converter::Integer => "integer",
            Converter::Json => "json",
        }
    }

    pub fn apply(self, value: Option<&Value>) -> Result<Value> {
        match self {
            Converter::Boolean => Ok(Value::Bool(to_boolean(value))),
            Converter::Date => {
                let date = to_date(value)?;
                Ok(Value::String(date.to_rfc3339()))
            }
            Converter::Number => to_number(value),
            Converter::Integer => to_integer(value).map(Value::from),
            Converter::Json => to_json(value),
        }
    }
}

impl fmt::Display for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Converter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "boolean" => Ok(Converter::Boolean),
            "date" => Ok(Converter::Date),
            "number" => Ok(Converter::Number),
            "integer" => Ok(Converter::Integer),
            "json" => Ok(Converter::Json),
            other => Err(Error::InvalidTransform(format!("unknown converter \"{other}\""))),
        }
    }
}

/// `true` only for the literal string `"true"`.
pub fn to_boolean(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if s == "true")
}

/// Parse a date/time string into a UTC instant.
pub fn to_date(value: Option<&Value>) -> Result<DateTime<Utc>> {
    let Some(Value::String(s)) = value else {
        return Err(Error::conversion("date", value));
    };
    parse_date(s.trim()).ok_or_else(|| Error::conversion("date", value))
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// `""` gives `null`; anything else must be a number written canonically.
pub fn to_number(value: Option<&Value>) -> Result<Value> {
    let s = match value {
        Some(n @ Value::Number(_)) => return Ok(n.clone()),
        Some(Value::String(s)) => s,
        _ => return Err(Error::conversion("number", value)),
    };
    if s.is_empty() {
        return Ok(Value::Null);
    }
    let trimmed = s.trim();
    let n: f64 = trimmed
        .parse()
        .map_err(|_| Error::conversion("number", value))?;
    if !n.is_finite() || canonical_number(n) != trimmed {
        return Err(Error::conversion("number", value));
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| Error::conversion("number", value))
}

/// Shortest round-trip form, switching to exponent notation outside
/// `[1e-6, 1e21)` and printing `-0` as `0`.
fn canonical_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return n.to_string();
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}

/// Base-10 integer whose canonical form equals the input exactly.
pub fn to_integer(value: Option<&Value>) -> Result<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| Error::conversion("integer", value)),
        Some(Value::String(s)) => match s.parse::<i64>() {
            Ok(i) if i.to_string() == *s => Ok(i),
            _ => Err(Error::conversion("integer", value)),
        },
        _ => Err(Error::conversion("integer", value)),
    }
}

/// Decode a JSON string; other values pass through.
pub fn to_json(value: Option<&Value>) -> Result<Value> {
    match value {
        Some(Value::String(s)) => Ok(serde_json::from_str(s)?),
        Some(v) => Ok(v.clone()),
        None => Ok(Value::Null),
    }
}
