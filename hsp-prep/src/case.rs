//! Case configuration: the horizon, output resolutions and solver commands
//! of one build.
//!
//! # Example
//! ```json
//! {
//!   "starttime": "2024-01-01 00:00",
//!   "endtime": "2024-01-08 00:00",
//!   "resolution": {"2024-01-01 00:00": 60, "2024-01-03 00:00": 180},
//!   "commands": ["set time_limit 600", "txy"],
//!   "override_shift_minutes": 0
//! }
//! ```

use crate::error::{PrepError, Result};
use crate::transform::MAX_OFFSET_MINUTES;
use chrono::NaiveDateTime;
use hsp_series::time::parse_timestamp;
use hsp_series::ResolutionSchedule;
use serde::Deserialize;
use std::collections::BTreeMap;

const DEFAULT_RESOLUTION_MINUTES: u32 = 60;

#[derive(Debug, Deserialize)]
struct RawCase {
    starttime: String,
    endtime: String,
    #[serde(default)]
    resolution: BTreeMap<String, u32>,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    override_shift_minutes: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseConfig {
    pub starttime: NaiveDateTime,
    pub endtime: NaiveDateTime,
    /// Empty means hourly over the whole horizon.
    pub resolution: ResolutionSchedule,
    pub commands: Vec<String>,
    /// Shift applied to the override mappings.
    pub override_shift_minutes: i64,
}

impl CaseConfig {
    /// Parse and validate a case file.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawCase = serde_json::from_str(json)?;
        let resolution = raw
            .resolution
            .iter()
            .map(|(timestamp, minutes)| {
                if *minutes == 0 {
                    return Err(PrepError::InvalidCase(format!(
                        "zero resolution at {}",
                        timestamp
                    )));
                }
                Ok((parse_timestamp(timestamp)?, *minutes))
            })
            .collect::<Result<ResolutionSchedule>>()?;
        let case = CaseConfig {
            starttime: parse_timestamp(&raw.starttime)?,
            endtime: parse_timestamp(&raw.endtime)?,
            resolution,
            commands: raw.commands,
            override_shift_minutes: raw.override_shift_minutes,
        };
        case.validate()?;
        Ok(case)
    }

    /// The resolution schedule to resample onto.
    pub fn schedule(&self) -> ResolutionSchedule {
        if self.resolution.is_empty() {
            ResolutionSchedule::constant(self.starttime, DEFAULT_RESOLUTION_MINUTES)
        } else {
            self.resolution.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endtime <= self.starttime {
            return Err(PrepError::InvalidCase(format!(
                "endtime {} is not after starttime {}",
                self.endtime, self.starttime
            )));
        }
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&self.override_shift_minutes) {
            return Err(PrepError::InvalidCase(format!(
                "override shift of {} minutes is out of range",
                self.override_shift_minutes
            )));
        }
        if let Some(first) = self.resolution.start() {
            if first > self.starttime {
                return Err(PrepError::InvalidCase(format!(
                    "resolution schedule starts at {}, after starttime {}",
                    first, self.starttime
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_case() {
        let case = CaseConfig::from_json_str(
            r#"{
                "starttime": "2024-01-01 00:00",
                "endtime": "2024-01-08T00:00:00Z",
                "resolution": {"2024-01-01 00:00": 60, "2024-01-03 00:00": 180},
                "commands": ["txy"],
                "override_shift_minutes": -60
            }"#,
        )
        .unwrap();
        assert_eq!(case.starttime, at(1, 0));
        assert_eq!(case.endtime, at(8, 0));
        assert_eq!(
            case.schedule().iter().collect::<Vec<_>>(),
            vec![(at(1, 0), 60), (at(3, 0), 180)]
        );
        assert_eq!(case.commands, vec!["txy".to_string()]);
        assert_eq!(case.override_shift_minutes, -60);
    }

    #[test]
    fn test_default_schedule_is_hourly() {
        let case = CaseConfig::from_json_str(
            r#"{"starttime": "2024-01-01 06:00", "endtime": "2024-01-02 06:00"}"#,
        )
        .unwrap();
        assert_eq!(case.schedule().iter().collect::<Vec<_>>(), vec![(at(1, 6), 60)]);
        assert!(case.commands.is_empty());
    }

    #[test]
    fn test_invalid_cases() {
        let reversed = CaseConfig::from_json_str(
            r#"{"starttime": "2024-01-02 00:00", "endtime": "2024-01-01 00:00"}"#,
        );
        assert!(matches!(reversed, Err(PrepError::InvalidCase(_))));

        let late_schedule = CaseConfig::from_json_str(
            r#"{"starttime": "2024-01-01 00:00", "endtime": "2024-01-02 00:00",
                "resolution": {"2024-01-01 12:00": 60}}"#,
        );
        assert!(matches!(late_schedule, Err(PrepError::InvalidCase(_))));

        let huge_shift = CaseConfig::from_json_str(
            r#"{"starttime": "2024-01-01 00:00", "endtime": "2024-01-02 00:00",
                "override_shift_minutes": 9223372036854775807}"#,
        );
        assert!(matches!(huge_shift, Err(PrepError::InvalidCase(_))));

        let bad_time = CaseConfig::from_json_str(
            r#"{"starttime": "yesterday", "endtime": "2024-01-02 00:00"}"#,
        );
        assert!(matches!(bad_time, Err(PrepError::Series(_))));

        assert!(matches!(
            CaseConfig::from_json_str("{"),
            Err(PrepError::Json(_))
        ));
    }
}
