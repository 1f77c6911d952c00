//! Conversions between typed setting values and script values.
//!
//! Native → script: durations become total milliseconds (integer), date-times
//! RFC 3339 strings, string lists arrays. Script → native parses the script
//! value against the declared type and fails with a [`CoercionError`].

use chrono::{TimeZone, Utc};
use confhub_model::{CoercionError, SettingValue, ValueType};
use rhai::{Array, Dynamic, EvalAltResult, FLOAT, INT, Position};
use std::time::Duration;

/// Converts a native value to its script representation.
pub(crate) fn to_dynamic(value: &SettingValue) -> Dynamic {
    match value {
        SettingValue::Bool(b) => Dynamic::from(*b),
        SettingValue::Int(v) => Dynamic::from(INT::from(*v)),
        SettingValue::Long(v) => Dynamic::from(*v as INT),
        SettingValue::Double(v) => Dynamic::from(*v as FLOAT),
        SettingValue::String(s) | SettingValue::Enum(s) => Dynamic::from(s.clone()),
        SettingValue::Duration(d) => Dynamic::from(duration_to_millis(*d)),
        SettingValue::DateTime(dt) => Dynamic::from(dt.to_rfc3339()),
        SettingValue::StringList(items) => Dynamic::from_array(
            items.iter().cloned().map(Dynamic::from).collect::<Array>(),
        ),
    }
}

fn duration_to_millis(d: Duration) -> INT {
    INT::try_from(d.as_millis()).unwrap_or(INT::MAX)
}

/// Short `type value` description used in coercion errors.
pub(crate) fn describe(value: &Dynamic) -> String {
    if value.is_unit() {
        "()".to_string()
    } else {
        format!("{} {}", value.type_name(), value)
    }
}

fn text_of(value: &Dynamic) -> Option<String> {
    if value.is_string() {
        value.clone().into_string().ok()
    } else if let Ok(c) = value.as_char() {
        Some(c.to_string())
    } else {
        None
    }
}

/// Parses a script value against `expected`.
pub(crate) fn from_dynamic(
    target: &str,
    value: &Dynamic,
    expected: ValueType,
) -> Result<SettingValue, CoercionError> {
    let fail = |reason: &str| CoercionError::new(target, expected, describe(value), reason);

    if let Some(text) = text_of(value) {
        return match expected {
            ValueType::String => Ok(SettingValue::String(text)),
            ValueType::Enum => Ok(SettingValue::Enum(text)),
            ValueType::DataGrid => Err(fail("expected an array of row objects")),
            other => other.parse_str(target, &text),
        };
    }

    match expected {
        ValueType::Bool => value
            .as_bool()
            .map(SettingValue::Bool)
            .map_err(|_| fail("expected a boolean")),
        ValueType::Int => integral(value)
            .and_then(|v| i32::try_from(v).ok())
            .map(SettingValue::Int)
            .ok_or_else(|| fail("expected a 32-bit integer")),
        ValueType::Long => integral(value)
            .map(SettingValue::Long)
            .ok_or_else(|| fail("expected an integer")),
        ValueType::Double => number(value)
            .map(SettingValue::Double)
            .ok_or_else(|| fail("expected a number")),
        ValueType::String | ValueType::Enum => {
            let text = if value.is_unit() {
                String::new()
            } else if value.is_bool() || value.is_int() || value.is_float() {
                value.to_string()
            } else {
                return Err(fail("expected a string"));
            };
            Ok(if expected == ValueType::Enum {
                SettingValue::Enum(text)
            } else {
                SettingValue::String(text)
            })
        }
        ValueType::Duration => number(value)
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| SettingValue::Duration(Duration::from_millis(ms.round() as u64)))
            .ok_or_else(|| fail("expected non-negative milliseconds")),
        ValueType::DateTime => value
            .as_int()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(SettingValue::DateTime)
            .ok_or_else(|| fail("expected an RFC 3339 string or Unix milliseconds")),
        ValueType::StringList => {
            if value.is_unit() {
                return Ok(SettingValue::StringList(Vec::new()));
            }
            let items = value
                .clone()
                .into_array()
                .map_err(|_| fail("expected an array of strings"))?;
            items
                .iter()
                .map(|item| {
                    if item.is_array() || item.is_map() || item.is_unit() {
                        Err(fail("list items must be scalar"))
                    } else {
                        Ok(text_of(item).unwrap_or_else(|| item.to_string()))
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(SettingValue::StringList)
        }
        ValueType::DataGrid => Err(fail("expected an array of row objects")),
    }
}

fn integral(value: &Dynamic) -> Option<i64> {
    if let Ok(v) = value.as_int() {
        return Some(v);
    }
    let f = value.as_float().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as FLOAT && f <= i64::MAX as FLOAT {
        Some(f as i64)
    } else {
        None
    }
}

fn number(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|v| v as f64))
}

/// Optional string property: unit clears it.
pub(crate) fn optional_string(
    target: &str,
    value: &Dynamic,
) -> Result<Option<String>, CoercionError> {
    if value.is_unit() {
        return Ok(None);
    }
    match text_of(value) {
        Some(text) => Ok(Some(text)),
        None => Err(CoercionError::new(
            target,
            ValueType::String,
            describe(value),
            "expected a string or ()",
        )),
    }
}

/// Optional integer property: unit clears it.
pub(crate) fn optional_int(target: &str, value: &Dynamic) -> Result<Option<i64>, CoercionError> {
    if value.is_unit() {
        return Ok(None);
    }
    integral(value).map(Some).ok_or_else(|| {
        CoercionError::new(target, ValueType::Long, describe(value), "expected an integer or ()")
    })
}

pub(crate) fn required_bool(target: &str, value: &Dynamic) -> Result<bool, CoercionError> {
    value.as_bool().map_err(|_| {
        CoercionError::new(target, ValueType::Bool, describe(value), "expected a boolean")
    })
}

pub(crate) fn optional_dynamic_string(value: Option<&String>) -> Dynamic {
    value.map_or(Dynamic::UNIT, |s| Dynamic::from(s.clone()))
}

pub(crate) fn optional_dynamic_int(value: Option<i64>) -> Dynamic {
    value.map_or(Dynamic::UNIT, |v| Dynamic::from(v as INT))
}

pub(crate) fn string_array(items: &[String]) -> Dynamic {
    Dynamic::from_array(items.iter().cloned().map(Dynamic::from).collect::<Array>())
}

/// Raises a coercion failure inside the interpreter. The error object is
/// carried as the thrown value so the sandbox can recover the typed error.
pub(crate) fn throw(err: CoercionError) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(Dynamic::from(err), Position::NONE))
}
