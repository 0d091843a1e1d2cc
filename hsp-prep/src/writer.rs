use crate::error::Result;
use crate::mapping::Mapping;
use crate::processor::{MappingProcessor, MappingReport};
use hsp_model::ModelTree;
use log::{info, warn};

/// Builds the final model tree from a template, a base mapping set and an
/// optional override set.
///
/// Overrides are applied after the base mappings (with their own time
/// shift), so where both write the same attribute the override wins.
pub struct ModelWriter<'a> {
    processor: MappingProcessor<'a>,
    model: ModelTree,
    mappings: Vec<Mapping>,
    overrides: Option<(Vec<Mapping>, i64)>,
}

impl<'a> ModelWriter<'a> {
    pub fn new(processor: MappingProcessor<'a>, model: ModelTree, mappings: Vec<Mapping>) -> Self {
        ModelWriter {
            processor,
            model,
            mappings,
            overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: Vec<Mapping>, shift_minutes: i64) -> Self {
        self.overrides = Some((overrides, shift_minutes));
        self
    }

    fn log_report(label: &str, report: &MappingReport) {
        let skipped = report.outcomes.len() - report.applied();
        info!(
            "{} mappings: {} applied, {} skipped",
            label,
            report.applied(),
            skipped
        );
        if skipped > 0 {
            let paths: Vec<String> = report.skipped().map(|(path, _)| path.to_string()).collect();
            warn!("{} mappings skipped: {}", label, paths.join(", "));
        }
    }

    /// Apply all mappings and return the finished tree.
    pub fn write(mut self) -> Result<ModelTree> {
        let base = self.processor.apply(&mut self.model, &self.mappings, 0)?;
        Self::log_report("Base", &base);
        if let Some((overrides, shift_minutes)) = &self.overrides {
            let report = self.processor.apply(&mut self.model, overrides, *shift_minutes)?;
            Self::log_report("Override", &report);
        }
        Ok(self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use hsp_model::AttributePath;
    use hsp_series::ResolutionSchedule;
    use hsp_store::SqliteStore;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn static_mapping(attribute: &str, value: f64) -> String {
        format!(
            r#"[{{"attribute": "{}", "retrieve": "NONE",
                 "transformations": [{{"name": "STATIC", "parameters": {{"0": {}}}}}]}}]"#,
            attribute, value
        )
    }

    fn first_value(model: &ModelTree, path: &str) -> Option<(NaiveDateTime, f64)> {
        let path: AttributePath = path.parse().unwrap();
        model.get_path(&path)?.as_series()?.first()
    }

    #[test]
    fn test_override_wins() {
        let store = SqliteStore::new().unwrap();
        let schedule = ResolutionSchedule::constant(start(), 60);
        let end = start() + Duration::hours(24);
        let processor = MappingProcessor::new(&store, start(), end, &schedule);

        let base = Mapping::parse_list(&static_mapping("reservoir.Res1.X", 1.0)).unwrap();
        let overrides = Mapping::parse_list(&static_mapping("reservoir.Res1.X", 2.0)).unwrap();
        let model = ModelWriter::new(processor, ModelTree::new(), base)
            .with_overrides(overrides, 0)
            .write()
            .unwrap();
        assert_eq!(first_value(&model, "reservoir.Res1.X"), Some((start(), 2.0)));
    }

    #[test]
    fn test_override_shift_moves_static_values() {
        let store = SqliteStore::new().unwrap();
        let schedule = ResolutionSchedule::constant(start(), 60);
        let end = start() + Duration::hours(24);
        let processor = MappingProcessor::new(&store, start(), end, &schedule);

        let base = Mapping::parse_list(&static_mapping("plant.P1.Y", 5.0)).unwrap();
        let overrides = Mapping::parse_list(&static_mapping("plant.P1.Z", 7.0)).unwrap();
        let model = ModelWriter::new(processor, ModelTree::new(), base)
            .with_overrides(overrides, 120)
            .write()
            .unwrap();
        assert_eq!(first_value(&model, "plant.P1.Y"), Some((start(), 5.0)));
        assert_eq!(
            first_value(&model, "plant.P1.Z"),
            Some((start() + Duration::hours(2), 7.0))
        );
    }

    #[test]
    fn test_template_attributes_survive() {
        let store = SqliteStore::new().unwrap();
        let schedule = ResolutionSchedule::constant(start(), 60);
        let processor =
            MappingProcessor::new(&store, start(), start() + Duration::hours(6), &schedule);
        let template = ModelTree::from_json_str(
            r#"{"reservoir": {"Res1": {"max_vol": 12.0, "name": "Upper lake"}}}"#,
        )
        .unwrap();
        let base = Mapping::parse_list(&static_mapping("reservoir.Res1.X", 1.0)).unwrap();
        let model = ModelWriter::new(processor, template, base).write().unwrap();
        assert_eq!(
            model.get("reservoir", "Res1", "max_vol").and_then(|v| v.as_scalar()),
            Some(12.0)
        );
        assert!(model.get("reservoir", "Res1", "X").is_some());
    }
}
