//! The fixed ten-field feature record and its placeholder defaults.
//!
//! Only `LOCATION_CODE` comes from the click. The other nine fields are
//! placeholders taken from [`FeatureDefaults`], optionally replaced per
//! request through [`FeatureOverrides`].

use std::path::Path;

use chrono::{Datelike as _, NaiveDateTime, Timelike as _};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::ModelError;

/// Column names of a [`FeatureRecord`], as the model was trained on them.
pub const FEATURE_NAMES: [&str; 10] = [
    "year",
    "month",
    "hour",
    "weekday",
    "ADDR_PCT_CD",
    "CRIME_CLASS",
    "VIC_AGE_GROUP",
    "VIC_RACE",
    "VIC_SEX",
    "LOCATION_CODE",
];

/// One row of model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Calendar year.
    pub year: i64,
    /// Month, 1-12.
    pub month: i64,
    /// Hour of day, 0-23.
    pub hour: i64,
    /// Day of week, Monday = 0.
    pub weekday: i64,
    /// Police precinct code.
    #[serde(rename = "ADDR_PCT_CD")]
    pub address_precinct: i64,
    /// Encoded crime class.
    #[serde(rename = "CRIME_CLASS")]
    pub crime_class: i64,
    /// Encoded victim age group.
    #[serde(rename = "VIC_AGE_GROUP")]
    pub victim_age_group: i64,
    /// Encoded victim race.
    #[serde(rename = "VIC_RACE")]
    pub victim_race: i64,
    /// Encoded victim sex.
    #[serde(rename = "VIC_SEX")]
    pub victim_sex: i64,
    /// Resolved location code, `-1` when unresolved.
    #[serde(rename = "LOCATION_CODE")]
    pub location_code: i64,
}

impl FeatureRecord {
    /// Returns every field paired with its column name, in
    /// [`FEATURE_NAMES`] order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fields(&self) -> [(&'static str, f64); 10] {
        [
            (FEATURE_NAMES[0], self.year as f64),
            (FEATURE_NAMES[1], self.month as f64),
            (FEATURE_NAMES[2], self.hour as f64),
            (FEATURE_NAMES[3], self.weekday as f64),
            (FEATURE_NAMES[4], self.address_precinct as f64),
            (FEATURE_NAMES[5], self.crime_class as f64),
            (FEATURE_NAMES[6], self.victim_age_group as f64),
            (FEATURE_NAMES[7], self.victim_race as f64),
            (FEATURE_NAMES[8], self.victim_sex as f64),
            (FEATURE_NAMES[9], self.location_code as f64),
        ]
    }

    /// Returns the value at `index` in [`FEATURE_NAMES`] order.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<f64> {
        if index < FEATURE_NAMES.len() {
            Some(self.fields()[index].1)
        } else {
            None
        }
    }

    /// Returns the position of a column name in [`FEATURE_NAMES`].
    #[must_use]
    pub fn index_of(name: &str) -> Option<usize> {
        FEATURE_NAMES.iter().position(|n| *n == name)
    }
}

/// Where the temporal fields of a record come from.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemporalMode {
    /// Use the configured year, month, hour, and weekday.
    #[default]
    Fixed,
    /// Derive them from the local clock at request time.
    Now,
}

/// Placeholder values for every field except the location code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureDefaults {
    /// Source of the temporal fields.
    pub temporal: TemporalMode,
    /// Calendar year.
    pub year: i64,
    /// Month, 1-12.
    pub month: i64,
    /// Hour of day, 0-23.
    pub hour: i64,
    /// Day of week, Monday = 0.
    pub weekday: i64,
    /// Police precinct code.
    pub address_precinct: i64,
    /// Encoded crime class.
    pub crime_class: i64,
    /// Encoded victim age group.
    pub victim_age_group: i64,
    /// Encoded victim race.
    pub victim_race: i64,
    /// Encoded victim sex.
    pub victim_sex: i64,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            temporal: TemporalMode::Fixed,
            year: 2023,
            month: 12,
            hour: 15,
            weekday: 5,
            address_precinct: 10,
            crime_class: 0,
            victim_age_group: 3,
            victim_race: 1,
            victim_sex: 0,
        }
    }
}

impl FeatureDefaults {
    /// Parses defaults from TOML; missing keys keep their built-in values.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Toml`] if the TOML is malformed or has a key
    /// that is not a placeholder field.
    pub fn from_toml_str(s: &str) -> Result<Self, ModelError> {
        Ok(toml::de::from_str(s)?)
    }

    /// Loads defaults from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Builds a record for `location_code`, reading the clock if the
    /// temporal mode is [`TemporalMode::Now`].
    #[must_use]
    pub fn record(&self, location_code: i64) -> FeatureRecord {
        self.record_at(location_code, chrono::Local::now().naive_local())
    }

    /// Builds a record for `location_code` as if the current local time
    /// were `now`.
    #[must_use]
    pub fn record_at(&self, location_code: i64, now: NaiveDateTime) -> FeatureRecord {
        let (year, month, hour, weekday) = match self.temporal {
            TemporalMode::Fixed => (self.year, self.month, self.hour, self.weekday),
            TemporalMode::Now => (
                i64::from(now.year()),
                i64::from(now.month()),
                i64::from(now.hour()),
                i64::from(now.weekday().num_days_from_monday()),
            ),
        };

        FeatureRecord {
            year,
            month,
            hour,
            weekday,
            address_precinct: self.address_precinct,
            crime_class: self.crime_class,
            victim_age_group: self.victim_age_group,
            victim_race: self.victim_race,
            victim_sex: self.victim_sex,
            location_code,
        }
    }
}

/// Per-request replacements for placeholder fields.
///
/// There is no location code override; it always comes from the resolver.
/// Fields accept either their camelCase name or the training column name
/// that [`FeatureRecord`] serializes under. Any other key is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureOverrides {
    /// Calendar year.
    pub year: Option<i64>,
    /// Month, 1-12.
    pub month: Option<i64>,
    /// Hour of day, 0-23.
    pub hour: Option<i64>,
    /// Day of week, Monday = 0.
    pub weekday: Option<i64>,
    /// Police precinct code.
    #[serde(alias = "ADDR_PCT_CD")]
    pub address_precinct: Option<i64>,
    /// Encoded crime class.
    #[serde(alias = "CRIME_CLASS")]
    pub crime_class: Option<i64>,
    /// Encoded victim age group.
    #[serde(alias = "VIC_AGE_GROUP")]
    pub victim_age_group: Option<i64>,
    /// Encoded victim race.
    #[serde(alias = "VIC_RACE")]
    pub victim_race: Option<i64>,
    /// Encoded victim sex.
    #[serde(alias = "VIC_SEX")]
    pub victim_sex: Option<i64>,
}

impl FeatureOverrides {
    /// Replaces the fields of `record` that this override sets.
    pub fn apply(&self, record: &mut FeatureRecord) {
        let pairs = [
            (self.year, &mut record.year),
            (self.month, &mut record.month),
            (self.hour, &mut record.hour),
            (self.weekday, &mut record.weekday),
            (self.address_precinct, &mut record.address_precinct),
            (self.crime_class, &mut record.crime_class),
            (self.victim_age_group, &mut record.victim_age_group),
            (self.victim_race, &mut record.victim_race),
            (self.victim_sex, &mut record.victim_sex),
        ];
        for (value, field) in pairs {
            if let Some(value) = value {
                *field = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_uses_placeholder_values() {
        let record = FeatureDefaults::default().record(0);
        assert_eq!(
            record,
            FeatureRecord {
                year: 2023,
                month: 12,
                hour: 15,
                weekday: 5,
                address_precinct: 10,
                crime_class: 0,
                victim_age_group: 3,
                victim_race: 1,
                victim_sex: 0,
                location_code: 0,
            }
        );
    }

    #[test]
    fn record_has_exactly_the_ten_named_fields() {
        let record = FeatureDefaults::default().record(-1);
        let json = serde_json::to_value(record).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), FEATURE_NAMES.len());
        for name in FEATURE_NAMES {
            assert!(obj.contains_key(name), "missing field {name}");
        }
        assert_eq!(obj["LOCATION_CODE"], -1);
    }

    #[test]
    fn fields_follow_feature_name_order() {
        let record = FeatureDefaults::default().record(7);
        let names: Vec<&str> = record.fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, FEATURE_NAMES);
        assert_eq!(FeatureRecord::index_of("LOCATION_CODE"), Some(9));
        assert_eq!(record.value_at(9), Some(7.0));
        assert_eq!(record.value_at(10), None);
    }

    #[test]
    fn now_mode_reads_clock() {
        let defaults = FeatureDefaults {
            temporal: TemporalMode::Now,
            ..FeatureDefaults::default()
        };
        // 2024-03-06 was a Wednesday.
        let now = chrono::NaiveDate::from_ymd_opt(2024, 3, 6)
            .unwrap()
            .and_hms_opt(21, 30, 0)
            .unwrap();
        let record = defaults.record_at(0, now);
        assert_eq!((record.year, record.month, record.hour, record.weekday), (2024, 3, 21, 2));
        assert_eq!(record.address_precinct, 10);
    }

    #[test]
    fn parses_partial_defaults_from_toml() {
        let defaults = FeatureDefaults::from_toml_str(
            r#"
            temporal = "fixed"
            hour = 2
            address_precinct = 75
            "#,
        )
        .unwrap();
        assert_eq!(defaults.hour, 2);
        assert_eq!(defaults.address_precinct, 75);
        assert_eq!(defaults.year, 2023);
    }

    #[test]
    fn rejects_unknown_default_keys() {
        let result = FeatureDefaults::from_toml_str("precinct = 75\n");
        assert!(matches!(result, Err(ModelError::Toml(_))), "got {result:?}");
    }

    #[test]
    fn load_error_names_the_missing_file() {
        let path = Path::new("/nonexistent/feature_defaults.toml");
        let err = FeatureDefaults::load(path).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
        assert!(
            err.to_string().contains("/nonexistent/feature_defaults.toml"),
            "got {err}"
        );
    }

    #[test]
    fn overrides_accept_training_column_names() {
        let overrides: FeatureOverrides =
            serde_json::from_str(r#"{"ADDR_PCT_CD": 75, "VIC_SEX": 1, "hour": 4}"#).unwrap();
        assert_eq!(overrides.address_precinct, Some(75));
        assert_eq!(overrides.victim_sex, Some(1));
        assert_eq!(overrides.hour, Some(4));

        let camel: FeatureOverrides =
            serde_json::from_str(r#"{"addressPrecinct": 76}"#).unwrap();
        assert_eq!(camel.address_precinct, Some(76));
    }

    #[test]
    fn overrides_reject_unknown_keys() {
        assert!(serde_json::from_str::<FeatureOverrides>(r#"{"precinct": 75}"#).is_err());
        assert!(serde_json::from_str::<FeatureOverrides>(r#"{"LOCATION_CODE": 3}"#).is_err());
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let mut record = FeatureDefaults::default().record(4);
        FeatureOverrides {
            hour: Some(3),
            victim_sex: Some(1),
            ..FeatureOverrides::default()
        }
        .apply(&mut record);

        assert_eq!(record.hour, 3);
        assert_eq!(record.victim_sex, 1);
        assert_eq!(record.month, 12);
        assert_eq!(record.location_code, 4);
    }
}
