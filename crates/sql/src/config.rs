//! Engine configuration
//!
//! Settings arrive as plain key/value pairs (or any serde format) and are
//! turned into the conversion rules and declared column types the planner
//! and executor use.

use crate::error::{Error, Result};
use crate::types::DataType;
use chrono_tz::Tz;
use flatsql_value::ConversionRules;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const COLUMN_TYPES_PREFIX: &str = "columnTypes.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// IANA zone name temporal values are read and rendered in (default: UTC)
    pub time_zone_name: Option<String>,

    /// Locale tag selecting decimal and grouping separators, e.g. "de-DE"
    pub locale: Option<String>,

    /// chrono format strings for raw temporal fields
    pub date_format: Option<String>,
    pub time_format: Option<String>,
    pub timestamp_format: Option<String>,

    /// Seed for RANDOM(). Unseeded executions draw from entropy.
    pub random_seed: Option<u64>,

    /// Per-table declared column types, as a comma-separated type list in
    /// column order, e.g. "Int,String,Date".
    pub column_types: HashMap<String, String>,
}

impl EngineConfig {
    /// Reads settings from key/value pairs. `columnTypes.<table>` keys
    /// declare column types; unknown keys are ignored.
    pub fn from_properties<K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref().trim().to_string());
            match key {
                "timeZoneName" => config.time_zone_name = Some(value),
                "locale" => config.locale = Some(value),
                "dateFormat" => config.date_format = Some(value),
                "timeFormat" => config.time_format = Some(value),
                "timestampFormat" => config.timestamp_format = Some(value),
                "randomSeed" => {
                    let seed = value.parse().map_err(|_| {
                        Error::Usage(format!("invalid configuration: randomSeed '{}'", value))
                    })?;
                    config.random_seed = Some(seed);
                }
                key => match key.strip_prefix(COLUMN_TYPES_PREFIX) {
                    Some(table) if !table.is_empty() => {
                        config.column_types.insert(table.to_string(), value);
                    }
                    _ => tracing::warn!(key, "ignoring unknown configuration key"),
                },
            }
        }
        Ok(config)
    }

    pub fn with_time_zone(mut self, zone: impl Into<String>) -> Self {
        self.time_zone_name = Some(zone.into());
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_column_types(mut self, table: impl Into<String>, types: impl Into<String>) -> Self {
        self.column_types.insert(table.into(), types.into());
        self
    }

    /// Builds the rules for converting raw fields.
    pub fn conversion_rules(&self) -> Result<ConversionRules> {
        let invalid = |err: flatsql_value::Error| Error::Usage(format!("invalid configuration: {}", err));
        let mut rules = ConversionRules::default();
        if let Some(name) = &self.time_zone_name {
            let zone: Tz = name.parse().map_err(|_| {
                invalid(flatsql_value::Error::UnknownTimeZone(name.clone()))
            })?;
            rules = rules.with_zone(zone);
        }
        if let Some(locale) = &self.locale {
            rules = rules.with_locale(locale).map_err(invalid)?;
        }
        if let Some(format) = &self.date_format {
            rules.date_format = format.clone();
        }
        if let Some(format) = &self.time_format {
            rules.time_format = format.clone();
        }
        if let Some(format) = &self.timestamp_format {
            rules.timestamp_format = format.clone();
        }
        Ok(rules)
    }

    /// Declared column types for a table, matched case-insensitively.
    pub fn declared_types(&self, table: &str) -> Result<Option<Vec<DataType>>> {
        let Some(types) = self
            .column_types
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, types)| types)
        else {
            return Ok(None);
        };
        types
            .split(',')
            .map(|name| {
                name.trim().parse::<DataType>().map_err(|err| {
                    Error::Usage(format!("invalid configuration: columnTypes.{}: {}", table, err))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}
