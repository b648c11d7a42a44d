use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, info_span};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::Table;
use crate::error::{CleanerError, Result};
use crate::observability::metrics;
use crate::pipeline::pipeline_config::{PipelineConfig, PipelineStepConfig};
use crate::pipeline::processing::categorical::CategoricalNormalizer;
use crate::pipeline::processing::derive::DerivedFieldCalculator;
use crate::pipeline::processing::numeric::NumericNormalizer;
use crate::pipeline::processing::schema::SchemaNormalizer;
use crate::pipeline::processing::sentinel::SentinelResolver;
use crate::pipeline::processing::temporal::TemporalNormalizer;
use crate::pipeline::processing::{Stage, StageStats};

/// Outcome of one cleaning run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    #[serde(skip)]
    pub table: Table,
    pub stages: Vec<StageStats>,
    /// SHA-256 of the rendered output table
    pub fingerprint: String,
    pub duration: Duration,
}

/// Ordered stages applied to a table, one after another
pub struct CleaningPipeline {
    name: String,
    stages: Vec<Box<dyn Stage>>,
}

impl CleaningPipeline {
    pub fn new(name: impl Into<String>, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }

    /// Build the stages named by `config.pipeline`, configured from the rest
    /// of `config`. The step list is validated first.
    pub fn from_config(config: &Config) -> Result<Self> {
        let pipeline: &PipelineConfig = &config.pipeline;
        pipeline.validate()?;

        let stages = pipeline
            .steps
            .iter()
            .map(|step| -> Box<dyn Stage> {
                match step {
                    PipelineStepConfig::Schema => Box::new(SchemaNormalizer::new(&config.schema)),
                    PipelineStepConfig::Sentinel => Box::new(SentinelResolver::new(&config.sentinels)),
                    PipelineStepConfig::Categorical => {
                        Box::new(CategoricalNormalizer::new(config.corrections.clone()))
                    }
                    PipelineStepConfig::Numeric => Box::new(NumericNormalizer::default()),
                    PipelineStepConfig::Temporal => Box::new(TemporalNormalizer::default()),
                    PipelineStepConfig::Derive => {
                        Box::new(DerivedFieldCalculator::new(config.derive.as_of_or_today()))
                    }
                }
            })
            .collect();

        Ok(Self::new(pipeline.name.clone(), stages))
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order. The first stage error aborts the run.
    pub fn run(&self, input: Table) -> Result<PipelineRun> {
        let run_id = Uuid::new_v4();
        let span = info_span!("cleaning_run", %run_id, pipeline = %self.name);
        let _enter = span.enter();

        let started = Instant::now();
        info!(rows = input.len(), columns = input.columns.len(), "Starting cleaning run");

        let mut table = input;
        let mut stages = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_span = info_span!("stage", stage = stage.name());
            let _stage_enter = stage_span.enter();
            let stage_started = Instant::now();

            let output = stage.apply(&table).map_err(|e| {
                error!(error = %e, "Stage failed");
                metrics::pipeline::run_failed(stage.name());
                match e {
                    CleanerError::Pipeline { .. } => e,
                    other => CleanerError::Pipeline {
                        stage: stage.name().to_string(),
                        message: other.to_string(),
                    },
                }
            })?;

            let elapsed = stage_started.elapsed();
            metrics::pipeline::stage_completed(&output.stats, elapsed.as_secs_f64());
            info!(
                cells_changed = output.stats.cells_changed,
                parse_failures = output.stats.parse_failures,
                elapsed_ms = elapsed.as_millis() as u64,
                "Stage complete"
            );
            for note in &output.stats.notes {
                debug!(note = %note, "Stage note");
            }

            table = output.table;
            stages.push(output.stats);
        }

        let fingerprint = table.fingerprint();
        let duration = started.elapsed();
        metrics::pipeline::run_completed(table.len(), duration.as_secs_f64());
        info!(
            rows = table.len(),
            fingerprint = %fingerprint,
            elapsed_ms = duration.as_millis() as u64,
            "Cleaning run complete"
        );

        Ok(PipelineRun {
            run_id,
            table,
            stages,
            fingerprint,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cell, RawTable};
    use crate::error::CleanerError;
    use crate::pipeline::processing::StageOutput;
    use chrono::NaiveDate;

    fn config() -> Config {
        let mut config = Config::default();
        config.derive.as_of = NaiveDate::from_ymd_opt(2024, 6, 1);
        config
    }

    fn raw() -> RawTable {
        RawTable {
            headers: vec![
                " Grant Req Date ".into(),
                "Payment Submitted?".into(),
                "Amount".into(),
                "Pt City".into(),
                "Unnamed: 30".into(),
            ],
            rows: vec![
                vec!["2024-03-01".into(), "2024-03-05".into(), "$1,200.50".into(), "OmAha".into(), "".into()],
                vec!["2024-03-02".into(), "Yes".into(), "Pending".into(), "".into(), "".into()],
            ],
        }
    }

    #[test]
    fn full_pipeline_runs_every_stage_in_order() {
        let pipeline = CleaningPipeline::from_config(&config()).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["schema", "sentinel", "categorical", "numeric", "temporal", "derive"]
        );

        let run = pipeline.run(Table::from_raw(raw())).unwrap();
        assert_eq!(run.stages.len(), 6);
        assert!(!run.table.has_column("Unnamed: 30"));
        assert_eq!(run.table.cell(0, "Days to Support"), Some(&Cell::Integer(4)));
        assert_eq!(run.table.cell(1, "Days to Support"), Some(&Cell::Integer(1)));
        assert_eq!(run.table.cell(0, "Pt City"), Some(&Cell::text("Omaha")));
        assert_eq!(run.table.cell(1, "Amount"), Some(&Cell::Absent));
        assert_eq!(run.fingerprint, run.table.fingerprint());
    }

    #[test]
    fn rerunning_on_cleaned_output_is_a_no_op() {
        let pipeline = CleaningPipeline::from_config(&config()).unwrap();
        let first = pipeline.run(Table::from_raw(raw())).unwrap();
        let reread = Table::from_raw(RawTable {
            headers: first.table.columns.clone(),
            rows: first.table.rendered_rows().collect(),
        });
        let second = pipeline.run(reread).unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn invalid_step_order_is_rejected() {
        let mut config = config();
        config.pipeline.steps = vec![PipelineStepConfig::Derive];
        assert!(matches!(
            CleaningPipeline::from_config(&config),
            Err(CleanerError::Config(_))
        ));
    }

    struct Failing;

    impl Stage for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn apply(&self, _input: &Table) -> Result<StageOutput> {
            Err(CleanerError::Config("boom".into()))
        }
    }

    #[test]
    fn stage_error_aborts_the_run() {
        let pipeline = CleaningPipeline::new("test", vec![Box::new(Failing)]);
        match pipeline.run(Table::from_raw(raw())) {
            Err(CleanerError::Pipeline { stage, message }) => {
                assert_eq!(stage, "failing");
                assert!(message.contains("boom"));
            }
            other => panic!("expected pipeline error, got {:?}", other.map(|r| r.run_id)),
        }
    }
}
