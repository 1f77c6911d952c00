use crate::error::CoercionError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// The declared type of a setting or grid column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Long,
    Double,
    String,
    /// Enumerated value carried as its string name.
    Enum,
    Duration,
    DateTime,
    StringList,
    /// A list of row objects; only valid as the type of a data-grid setting.
    DataGrid,
}

impl ValueType {
    /// Returns true for every type a grid column may declare.
    pub fn is_scalar(self) -> bool {
        !matches!(self, ValueType::DataGrid)
    }

    /// The value a freshly created setting or grid cell of this type holds.
    /// `None` for `DataGrid`, whose default is an empty grid with columns.
    pub fn default_value(self) -> Option<SettingValue> {
        let value = match self {
            ValueType::Bool => SettingValue::Bool(false),
            ValueType::Int => SettingValue::Int(0),
            ValueType::Long => SettingValue::Long(0),
            ValueType::Double => SettingValue::Double(0.0),
            ValueType::String => SettingValue::String(String::new()),
            ValueType::Enum => SettingValue::Enum(String::new()),
            ValueType::Duration => SettingValue::Duration(Duration::ZERO),
            ValueType::DateTime => SettingValue::DateTime(DateTime::<Utc>::UNIX_EPOCH),
            ValueType::StringList => SettingValue::StringList(Vec::new()),
            ValueType::DataGrid => return None,
        };
        Some(value)
    }

    /// Parses the textual form of a value (as typed on a command line or
    /// stored in a text field) into this type.
    pub fn parse_str(self, target: &str, text: &str) -> Result<SettingValue, CoercionError> {
        let fail = |reason: &str| CoercionError::new(target, self, format!("\"{text}\""), reason);
        let trimmed = text.trim();
        match self {
            ValueType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Ok(SettingValue::Bool(true)),
                "false" => Ok(SettingValue::Bool(false)),
                _ => Err(fail("expected true or false")),
            },
            ValueType::Int => trimmed
                .parse::<i32>()
                .map(SettingValue::Int)
                .map_err(|e| fail(&e.to_string())),
            ValueType::Long => trimmed
                .parse::<i64>()
                .map(SettingValue::Long)
                .map_err(|e| fail(&e.to_string())),
            ValueType::Double => trimmed
                .parse::<f64>()
                .map(SettingValue::Double)
                .map_err(|e| fail(&e.to_string())),
            ValueType::String => Ok(SettingValue::String(text.to_string())),
            ValueType::Enum => Ok(SettingValue::Enum(text.to_string())),
            ValueType::Duration => parse_duration(trimmed)
                .map(SettingValue::Duration)
                .ok_or_else(|| fail("expected milliseconds or HH:MM:SS[.fff]")),
            ValueType::DateTime => DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| SettingValue::DateTime(dt.with_timezone(&Utc)))
                .map_err(|e| fail(&e.to_string())),
            ValueType::StringList => Ok(SettingValue::StringList(
                text.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            ValueType::DataGrid => Err(fail("grid values cannot be parsed from text")),
        }
    }

    /// Converts a JSON literal (schema files, CLI output) into this type.
    pub fn from_json(
        self,
        target: &str,
        json: &serde_json::Value,
    ) -> Result<SettingValue, CoercionError> {
        use serde_json::Value as Json;

        let fail = |reason: &str| CoercionError::new(target, self, json.to_string(), reason);
        match (self, json) {
            (_, Json::String(s)) if self != ValueType::StringList => self.parse_str(target, s),
            (ValueType::Bool, Json::Bool(b)) => Ok(SettingValue::Bool(*b)),
            (ValueType::Int, Json::Number(n)) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(SettingValue::Int)
                .ok_or_else(|| fail("out of range for a 32-bit integer")),
            (ValueType::Long, Json::Number(n)) => n
                .as_i64()
                .map(SettingValue::Long)
                .ok_or_else(|| fail("not an integer")),
            (ValueType::Double, Json::Number(n)) => n
                .as_f64()
                .map(SettingValue::Double)
                .ok_or_else(|| fail("not a number")),
            (ValueType::String, Json::Number(_) | Json::Bool(_)) => {
                Ok(SettingValue::String(json.to_string()))
            }
            (ValueType::String | ValueType::Enum, Json::Null) => {
                self.default_value().ok_or_else(|| fail("no default"))
            }
            (ValueType::Duration, Json::Number(n)) => n
                .as_u64()
                .map(|ms| SettingValue::Duration(Duration::from_millis(ms)))
                .ok_or_else(|| fail("expected non-negative milliseconds")),
            (ValueType::DateTime, Json::Number(n)) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(SettingValue::DateTime)
                .ok_or_else(|| fail("expected Unix milliseconds")),
            (ValueType::StringList, Json::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Json::String(s) => Ok(s.clone()),
                    Json::Number(_) | Json::Bool(_) => Ok(item.to_string()),
                    _ => Err(fail("list items must be strings")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(SettingValue::StringList),
            (ValueType::StringList, Json::String(s)) => self.parse_str(target, s),
            _ => Err(fail("incompatible JSON value")),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::Enum => "enum",
            ValueType::Duration => "duration",
            ValueType::DateTime => "date-time",
            ValueType::StringList => "string-list",
            ValueType::DataGrid => "data-grid",
        };
        f.write_str(name)
    }
}

/// A typed scalar value held by a setting or a grid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Enum(String),
    Duration(Duration),
    DateTime(DateTime<Utc>),
    StringList(Vec<String>),
}

impl SettingValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            SettingValue::Bool(_) => ValueType::Bool,
            SettingValue::Int(_) => ValueType::Int,
            SettingValue::Long(_) => ValueType::Long,
            SettingValue::Double(_) => ValueType::Double,
            SettingValue::String(_) => ValueType::String,
            SettingValue::Enum(_) => ValueType::Enum,
            SettingValue::Duration(_) => ValueType::Duration,
            SettingValue::DateTime(_) => ValueType::DateTime,
            SettingValue::StringList(_) => ValueType::StringList,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of `Int` and `Long` values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Int(v) => Some(i64::from(*v)),
            SettingValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Double(v) => Some(*v),
            SettingValue::Int(v) => Some(f64::from(*v)),
            SettingValue::Long(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String view of `String` and `Enum` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) | SettingValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            SettingValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        match self {
            SettingValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            SettingValue::StringList(items) => Some(items),
            _ => None,
        }
    }

    /// True for values a required grid cell treats as missing.
    pub fn is_empty(&self) -> bool {
        match self {
            SettingValue::String(s) | SettingValue::Enum(s) => s.trim().is_empty(),
            SettingValue::StringList(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Converts this value to `expected` when the conversion is lossless
    /// (`Int` → `Long`, integer → `Double`, `String` ↔ `Enum`).
    pub fn conform_to(self, target: &str, expected: ValueType) -> Result<Self, CoercionError> {
        if self.value_type() == expected {
            return Ok(self);
        }
        let found = format!("{} {}", self.value_type(), self);
        match (self, expected) {
            (SettingValue::Int(v), ValueType::Long) => Ok(SettingValue::Long(i64::from(v))),
            (SettingValue::Int(v), ValueType::Double) => Ok(SettingValue::Double(f64::from(v))),
            (SettingValue::Long(v), ValueType::Int) => i32::try_from(v)
                .map(SettingValue::Int)
                .map_err(|e| CoercionError::new(target, expected, found, e.to_string())),
            (SettingValue::String(s), ValueType::Enum) => Ok(SettingValue::Enum(s)),
            (SettingValue::Enum(s), ValueType::String) => Ok(SettingValue::String(s)),
            _ => Err(CoercionError::new(target, expected, found, "incompatible type")),
        }
    }

    /// JSON form used by schema files and state dumps. Durations are
    /// total milliseconds and date-times RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            SettingValue::Bool(b) => Json::Bool(*b),
            SettingValue::Int(v) => Json::from(*v),
            SettingValue::Long(v) => Json::from(*v),
            SettingValue::Double(v) => Json::from(*v),
            SettingValue::String(s) | SettingValue::Enum(s) => Json::String(s.clone()),
            SettingValue::Duration(d) => Json::from(duration_millis(*d)),
            SettingValue::DateTime(dt) => Json::String(dt.to_rfc3339()),
            SettingValue::StringList(items) => {
                Json::Array(items.iter().cloned().map(Json::String).collect())
            }
        }
    }
}

impl Serialize for SettingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(v) => write!(f, "{v}"),
            SettingValue::Long(v) => write!(f, "{v}"),
            SettingValue::Double(v) => write!(f, "{v}"),
            SettingValue::String(s) | SettingValue::Enum(s) => f.write_str(s),
            SettingValue::Duration(d) => write!(f, "{}", format_duration(*d)),
            SettingValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            SettingValue::StringList(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Int(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Long(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Double(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

impl From<Duration> for SettingValue {
    fn from(value: Duration) -> Self {
        SettingValue::Duration(value)
    }
}

impl From<DateTime<Utc>> for SettingValue {
    fn from(value: DateTime<Utc>) -> Self {
        SettingValue::DateTime(value)
    }
}

impl From<Vec<String>> for SettingValue {
    fn from(value: Vec<String>) -> Self {
        SettingValue::StringList(value)
    }
}

/// Whole milliseconds in `d`, saturating at `i64::MAX`.
pub(crate) fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Accepts plain milliseconds or `HH:MM:SS[.fff]`.
fn parse_duration(text: &str) -> Option<Duration> {
    if let Ok(ms) = text.parse::<u64>() {
        return Some(Duration::from_millis(ms));
    }
    let mut parts = text.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds_part = parts.next()?;
    if parts.next().is_some() || minutes >= 60 {
        return None;
    }
    let (secs, millis) = match seconds_part.split_once('.') {
        Some((s, frac)) => {
            let frac = format!("{frac:0<3}");
            (s.parse::<u64>().ok()?, frac.get(..3)?.parse::<u64>().ok()?)
        }
        None => (seconds_part.parse::<u64>().ok()?, 0),
    };
    if secs >= 60 {
        return None;
    }
    Some(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + secs) * 1000 + millis,
    ))
}

fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let (h, m, s) = (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60);
    if ms == 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}.{ms:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_millis_and_clock_form() {
        assert_eq!(parse_duration("1500"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("00:02:00"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("01:00:00.5"), Some(Duration::from_millis(3_600_500)));
    }

    #[test]
    fn parse_duration_rejects_out_of_range_fields() {
        assert_eq!(parse_duration("00:60:00"), None);
        assert_eq!(parse_duration("00:00:75"), None);
        assert_eq!(parse_duration("1:2"), None);
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn format_duration_matches_clock_form() {
        assert_eq!(format_duration(Duration::from_secs(120)), "00:02:00");
        assert_eq!(format_duration(Duration::from_millis(3_723_045)), "01:02:03.045");
    }
}
