//! Conversion of raw source fields into typed values
//!
//! Row sources hand out raw strings. `ConversionRules` carries the locale,
//! time zone and temporal formats that turn them into values, and is also
//! used when the engine coerces a string operand against a typed one.

use crate::temporal::{Date, Time, Timestamp, resolve_local};
use crate::{DataType, Error, Result, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::str::FromStr;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decimal and grouping separators of a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl NumberFormat {
    pub const ROOT: NumberFormat = NumberFormat {
        decimal_separator: '.',
        grouping_separator: ',',
    };

    /// Looks up the number format of a locale tag such as `en_US` or `de-DE`.
    pub fn for_locale(tag: &str) -> Result<Self> {
        let language = tag
            .split(['_', '-'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let (decimal_separator, grouping_separator) = match language.as_str() {
            "" | "en" | "ja" | "zh" | "ko" | "he" | "th" => ('.', ','),
            "de" | "es" | "it" | "nl" | "pt" | "da" | "id" | "tr" | "el" => (',', '.'),
            "fr" | "ru" | "pl" | "cs" | "sv" | "fi" | "nb" | "no" | "uk" | "hu" => (',', '\u{a0}'),
            _ => return Err(Error::UnknownLocale(tag.to_string())),
        };
        Ok(Self {
            decimal_separator,
            grouping_separator,
        })
    }

    /// Rewrites a localized number into the plain `-123.45` form.
    fn normalize(&self, raw: &str) -> String {
        raw.chars()
            .filter(|c| {
                *c != self.grouping_separator && !(self.grouping_separator == '\u{a0}' && *c == ' ')
            })
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::ROOT
    }
}

/// Rules for turning raw field text into typed values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRules {
    pub zone: Tz,
    pub number_format: NumberFormat,
    pub date_format: String,
    pub time_format: String,
    pub timestamp_format: String,
}

impl Default for ConversionRules {
    fn default() -> Self {
        Self {
            zone: Tz::UTC,
            number_format: NumberFormat::ROOT,
            date_format: DEFAULT_DATE_FORMAT.into(),
            time_format: DEFAULT_TIME_FORMAT.into(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.into(),
        }
    }
}

impl ConversionRules {
    pub fn with_zone(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_locale(mut self, tag: &str) -> Result<Self> {
        self.number_format = NumberFormat::for_locale(tag)?;
        Ok(self)
    }

    /// Converts a raw field into a value of the given type. Blank fields are
    /// NULL for every type except strings.
    pub fn convert(&self, raw: &str, data_type: &DataType) -> Result<Value> {
        if *data_type == DataType::Str {
            return Ok(Value::Str(raw.to_string()));
        }
        let text = raw.trim();
        if text.is_empty() {
            return Ok(Value::Null);
        }
        let failed = || Error::Conversion {
            raw: raw.to_string(),
            target: data_type.to_string(),
        };
        Ok(match data_type {
            DataType::Null => Value::Null,
            DataType::Str => Value::Str(raw.to_string()),
            DataType::Bool => Value::Bool(parse_bool(text).ok_or_else(failed)?),
            DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64 => {
                let number = self.number_format.normalize(text);
                let n: i64 = number.parse().map_err(|_| failed())?;
                Value::I64(n).widen(data_type).map_err(|_| failed())?
            }
            DataType::F32 => Value::F32(self.parse_f64(text).ok_or_else(failed)? as f32),
            DataType::F64 => Value::F64(self.parse_f64(text).ok_or_else(failed)?),
            DataType::Decimal => {
                let number = self.number_format.normalize(text);
                Value::Decimal(
                    Decimal::from_str(&number)
                        .or_else(|_| Decimal::from_scientific(&number))
                        .map_err(|_| failed())?,
                )
            }
            DataType::Date => Value::Date(self.parse_date(text).ok_or_else(failed)?),
            DataType::Time => Value::Time(self.parse_time(text).ok_or_else(failed)?),
            DataType::Timestamp => Value::Timestamp(self.parse_timestamp(text)?.ok_or_else(failed)?),
            DataType::Array(_) => return Err(failed()),
        })
    }

    fn parse_f64(&self, text: &str) -> Option<f64> {
        self.number_format.normalize(text).parse().ok()
    }

    pub fn parse_date(&self, text: &str) -> Option<Date> {
        NaiveDate::parse_from_str(text, &self.date_format)
            .or_else(|_| NaiveDate::parse_from_str(text, DEFAULT_DATE_FORMAT))
            .ok()
            .map(|date| Date::new(date, self.zone))
    }

    pub fn parse_time(&self, text: &str) -> Option<Time> {
        [self.time_format.as_str(), "%H:%M:%S%.f", "%H:%M"]
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
            .map(|time| Time::from_naive(time, self.zone))
    }

    pub fn parse_timestamp(&self, text: &str) -> Result<Option<Timestamp>> {
        let naive = [
            self.timestamp_format.as_str(),
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            self.parse_date(text)
                .map(|date| date.date.and_time(NaiveTime::MIN))
        });
        naive
            .map(|naive| resolve_local(self.zone, naive).map(Timestamp::new))
            .transpose()
    }

    /// Infers a column type from sample fields. Blank samples are ignored;
    /// a column with no usable samples is a string column.
    pub fn infer_type<'a>(&self, samples: impl IntoIterator<Item = &'a str>) -> DataType {
        let mut candidates = vec![
            DataType::I32,
            DataType::I64,
            DataType::F64,
            DataType::Bool,
            DataType::Date,
            DataType::Timestamp,
        ];
        let mut seen = false;
        for sample in samples.into_iter().map(str::trim).filter(|s| !s.is_empty()) {
            seen = true;
            candidates.retain(|candidate| self.convert(sample, candidate).is_ok());
            if candidates.is_empty() {
                return DataType::Str;
            }
        }
        match seen {
            true => candidates.into_iter().next().unwrap_or(DataType::Str),
            false => DataType::Str,
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
