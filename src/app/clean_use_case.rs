use serde::Serialize;
use tracing::{error, info, warn};

use crate::app::ports::{DataSource, SinkReceipt, TableSink};
use crate::domain::Table;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::quality_gate::{QualityDecision, QualityGate, TableAssessment};
use crate::pipeline::runner::{CleaningPipeline, PipelineRun};

/// Result of a full clean: the in-memory run, its assessment and where the
/// table was written
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutcome {
    pub run: PipelineRun,
    pub assessment: TableAssessment,
    pub receipt: SinkReceipt,
}

/// Fetch raw rows, clean them, assess the result and persist it
pub struct CleanUseCase {
    source: Box<dyn DataSource>,
    pipeline: CleaningPipeline,
    quality_gate: Box<dyn QualityGate>,
    sink: Box<dyn TableSink>,
}

impl CleanUseCase {
    pub fn new(
        source: Box<dyn DataSource>,
        pipeline: CleaningPipeline,
        quality_gate: Box<dyn QualityGate>,
        sink: Box<dyn TableSink>,
    ) -> Self {
        Self {
            source,
            pipeline,
            quality_gate,
            sink,
        }
    }

    pub async fn execute(&self) -> Result<CleanOutcome> {
        let location = self.source.describe();
        info!(source = %location, "Fetching raw applications");

        let raw = self.source.fetch().await.map_err(|e| {
            error!(source = %location, error = %e, "Source unavailable");
            metrics::sources::fetch_error();
            e
        })?;
        metrics::sources::rows_loaded(raw.rows.len());

        let run = self.pipeline.run(Table::from_raw(raw))?;

        let assessment = self.quality_gate.assess(&run.table, &run.stages);
        metrics::quality_gate::assessed(&assessment);
        match assessment.decision {
            QualityDecision::Accept => info!(score = assessment.quality_score, "Quality gate accepted table"),
            QualityDecision::AcceptWithWarnings | QualityDecision::NeedsReview => {
                for issue in &assessment.issues {
                    warn!(
                        issue_type = ?issue.issue_type,
                        severity = ?issue.severity,
                        column = issue.column.as_deref().unwrap_or("-"),
                        "{}",
                        issue.description
                    );
                }
                warn!(
                    decision = ?assessment.decision,
                    score = assessment.quality_score,
                    "Quality gate flagged the cleaned table"
                );
            }
        }

        let receipt = self.sink.write(&run.table).await?;
        metrics::sink::rows_written(receipt.rows);
        info!(
            run_id = %run.run_id,
            rows = receipt.rows,
            bytes = receipt.bytes,
            "Cleaned table persisted"
        );

        Ok(CleanOutcome {
            run,
            assessment,
            receipt,
        })
    }
}
