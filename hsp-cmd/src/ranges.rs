//! Print the resolution ranges of a case.

use anyhow::Context;
use hsp_prep::CaseConfig;
use hsp_series::find_resolution_ranges;
use hsp_series::time::format_timestamp;
use std::fs;

/// One line per constant-resolution range: `start,end,minutes`, with an
/// empty end for the open-ended last range.
pub fn format_ranges(case: &CaseConfig) -> Vec<String> {
    find_resolution_ranges(&case.schedule())
        .iter()
        .map(|range| {
            let end = range.end.as_ref().map(format_timestamp).unwrap_or_default();
            format!(
                "{},{},{}",
                format_timestamp(&range.start),
                end,
                range.resolution_minutes
            )
        })
        .collect()
}

pub fn run_ranges(case_path: &str) -> anyhow::Result<()> {
    let json = fs::read_to_string(case_path)
        .with_context(|| format!("Failed to read {}", case_path))?;
    let case = CaseConfig::from_json_str(&json).context("Failed to load case")?;
    for line in format_ranges(&case) {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ranges() {
        let case = CaseConfig::from_json_str(
            r#"{"starttime": "2024-01-01 00:00", "endtime": "2024-01-08 00:00",
                "resolution": {"2024-01-01 00:00": 60, "2024-01-02 00:00": 60,
                               "2024-01-03 00:00": 180}}"#,
        )
        .unwrap();
        assert_eq!(
            format_ranges(&case),
            vec![
                "2024-01-01 00:00:00,2024-01-03 00:00:00,60".to_string(),
                "2024-01-03 00:00:00,,180".to_string(),
            ]
        );
    }
}
