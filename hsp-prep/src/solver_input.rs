//! The document handed to the solver: model tree, time block and commands.

use crate::case::CaseConfig;
use crate::error::Result;
use hsp_model::ModelTree;
use hsp_series::time::format_timestamp;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBlock {
    pub starttime: String,
    pub endtime: String,
    pub timeunit: String,
    /// Formatted timestamp -> resolution in minutes.
    pub timeresolution: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverInput {
    pub model: ModelTree,
    pub time: TimeBlock,
    pub commands: Vec<String>,
}

impl SolverInput {
    pub fn new(model: ModelTree, case: &CaseConfig) -> Self {
        let time = TimeBlock {
            starttime: format_timestamp(&case.starttime),
            endtime: format_timestamp(&case.endtime),
            timeunit: "minute".to_string(),
            timeresolution: case
                .schedule()
                .iter()
                .map(|(timestamp, minutes)| (format_timestamp(&timestamp), minutes))
                .collect(),
        };
        SolverInput {
            model,
            time,
            commands: case.commands.clone(),
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsp_model::AttributePath;

    #[test]
    fn test_document_layout() {
        let case = CaseConfig::from_json_str(
            r#"{"starttime": "2024-01-01 00:00", "endtime": "2024-01-02 00:00",
                "commands": ["txy"]}"#,
        )
        .unwrap();
        let mut model = ModelTree::new();
        model.insert(&AttributePath::new("reservoir", "Res1", "max_vol"), 12.0.into());

        let json = SolverInput::new(model, &case).to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["model"]["reservoir"]["Res1"]["max_vol"], 12.0);
        assert_eq!(value["time"]["starttime"], "2024-01-01 00:00:00");
        assert_eq!(value["time"]["endtime"], "2024-01-02 00:00:00");
        assert_eq!(value["time"]["timeunit"], "minute");
        assert_eq!(value["time"]["timeresolution"]["2024-01-01 00:00:00"], 60);
        assert_eq!(value["commands"][0], "txy");
    }
}
