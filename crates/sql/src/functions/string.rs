//! String functions. Non-string arguments are used by their text form.

use super::unconvertible;
use crate::error::{Error, Result};
use crate::types::Value;

pub(super) fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::Str(s) => Value::Str(f(s)),
        other => Value::Str(f(&other.to_string())),
    })
}

pub(super) fn length(value: &Value) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::Str(s) => Value::I32(s.chars().count() as i32),
        other => Value::I32(other.to_string().chars().count() as i32),
    })
}

pub(super) enum TrimSide {
    Both,
    Leading,
    Trailing,
}

pub(super) fn trim(value: &Value, chars: Option<&Value>, side: TrimSide) -> Result<Value> {
    let set: Option<Vec<char>> = match chars {
        None => None,
        Some(Value::Null) => return Ok(Value::Null),
        Some(chars) => Some(chars.to_string().chars().collect()),
    };
    let strip = |c: char| match &set {
        Some(set) => set.contains(&c),
        None => c.is_whitespace(),
    };
    map_text(value, |s| {
        match side {
            TrimSide::Both => s.trim_matches(strip),
            TrimSide::Leading => s.trim_start_matches(strip),
            TrimSide::Trailing => s.trim_end_matches(strip),
        }
        .to_string()
    })
}

fn integer_argument(function: &str, value: &Value) -> Result<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Str(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| unconvertible(function, value)),
        other => other.to_i64().map(Some).ok_or_else(|| unconvertible(function, other)),
    }
}

/// SUBSTRING(s, start [, length]) with a 1-based start. Positions before the
/// start of the string count against the length.
pub(super) fn substring(value: &Value, start: &Value, length: Option<&Value>) -> Result<Value> {
    let Some(start) = integer_argument("SUBSTRING", start)? else {
        return Ok(Value::Null);
    };
    let length = match length {
        Some(length) => match integer_argument("SUBSTRING", length)? {
            Some(length) if length < 0 => {
                return Err(Error::Evaluation(format!(
                    "SUBSTRING length must not be negative, found {}",
                    length
                )));
            }
            Some(length) => Some(length),
            None => return Ok(Value::Null),
        },
        None => None,
    };
    let end = length.map(|length| start.saturating_add(length));
    let from = start.max(1);
    map_text(value, |s| {
        let skip = (from - 1) as usize;
        let take = match end {
            Some(end) => (end - from).max(0) as usize,
            None => usize::MAX,
        };
        s.chars().skip(skip).take(take).collect()
    })
}

pub(super) fn replace(value: &Value, from: &Value, to: &Value) -> Result<Value> {
    if from.is_null() || to.is_null() {
        return Ok(Value::Null);
    }
    let (from, to) = (from.to_string(), to.to_string());
    map_text(value, |s| match from.is_empty() {
        true => s.to_string(),
        false => s.replace(&from, &to),
    })
}
