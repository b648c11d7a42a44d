//! Metrics for the cleaning pipeline
//!
//! Recording functions are grouped by phase. Without an installed recorder
//! every call is a no-op, so library code records unconditionally and only
//! the binary decides whether to install the Prometheus recorder.

use std::fmt;
use std::path::Path;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Every metric name used in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Sources
    SourcesRowsLoaded,
    SourcesFetchError,

    // Pipeline
    PipelineStageCellsChanged,
    PipelineStageParseFailures,
    PipelineStageDuration,
    PipelineRunsCompleted,
    PipelineRunsFailed,
    PipelineRunDuration,
    PipelineRowsCleaned,

    // Quality gate
    QualityGateDecisions,
    QualityGateIssuesDetected,
    QualityGateQualityScore,

    // Sink
    SinkRowsWritten,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourcesRowsLoaded => "grant_cleaner_sources_rows_loaded_total",
            MetricName::SourcesFetchError => "grant_cleaner_sources_fetch_error_total",

            MetricName::PipelineStageCellsChanged => "grant_cleaner_pipeline_stage_cells_changed_total",
            MetricName::PipelineStageParseFailures => "grant_cleaner_pipeline_stage_parse_failures_total",
            MetricName::PipelineStageDuration => "grant_cleaner_pipeline_stage_duration_seconds",
            MetricName::PipelineRunsCompleted => "grant_cleaner_pipeline_runs_completed_total",
            MetricName::PipelineRunsFailed => "grant_cleaner_pipeline_runs_failed_total",
            MetricName::PipelineRunDuration => "grant_cleaner_pipeline_run_duration_seconds",
            MetricName::PipelineRowsCleaned => "grant_cleaner_pipeline_rows_cleaned_total",

            MetricName::QualityGateDecisions => "grant_cleaner_quality_gate_decisions_total",
            MetricName::QualityGateIssuesDetected => "grant_cleaner_quality_gate_issues_detected_total",
            MetricName::QualityGateQualityScore => "grant_cleaner_quality_gate_quality_score",

            MetricName::SinkRowsWritten => "grant_cleaner_sink_rows_written_total",
        }
    }

    /// (phase, description)
    pub fn metadata(&self) -> (&'static str, &'static str) {
        match self {
            MetricName::SourcesRowsLoaded => ("sources", "Raw rows read from the source"),
            MetricName::SourcesFetchError => ("sources", "Failed source fetches"),

            MetricName::PipelineStageCellsChanged => ("pipeline", "Cells rewritten by a stage"),
            MetricName::PipelineStageParseFailures => ("pipeline", "Cells a stage could not coerce"),
            MetricName::PipelineStageDuration => ("pipeline", "Stage duration"),
            MetricName::PipelineRunsCompleted => ("pipeline", "Completed cleaning runs"),
            MetricName::PipelineRunsFailed => ("pipeline", "Cleaning runs aborted by a stage error"),
            MetricName::PipelineRunDuration => ("pipeline", "Cleaning run duration"),
            MetricName::PipelineRowsCleaned => ("pipeline", "Rows in cleaned tables"),

            MetricName::QualityGateDecisions => ("quality_gate", "Quality gate decisions"),
            MetricName::QualityGateIssuesDetected => ("quality_gate", "Quality issues detected"),
            MetricName::QualityGateQualityScore => ("quality_gate", "Quality score distribution"),

            MetricName::SinkRowsWritten => ("sink", "Rows persisted by the sink"),
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            SourcesRowsLoaded,
            SourcesFetchError,
            PipelineStageCellsChanged,
            PipelineStageParseFailures,
            PipelineStageDuration,
            PipelineRunsCompleted,
            PipelineRunsFailed,
            PipelineRunDuration,
            PipelineRowsCleaned,
            QualityGateDecisions,
            QualityGateIssuesDetected,
            QualityGateQualityScore,
            SinkRowsWritten,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the Prometheus recorder and register descriptions
pub fn init() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    for name in MetricName::all_metrics() {
        let (_, description) = name.metadata();
        if name.as_str().ends_with("_total") {
            ::metrics::describe_counter!(name.as_str(), description);
        } else {
            ::metrics::describe_histogram!(name.as_str(), description);
        }
    }
    info!("Metrics recorder installed");
    Ok(handle)
}

/// Write the current Prometheus text exposition to `path`
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, handle.render())
}

// ============================================================================
// Sources Metrics
// ============================================================================

pub mod sources {
    use super::MetricName;

    pub fn rows_loaded(rows: usize) {
        ::metrics::counter!(MetricName::SourcesRowsLoaded.as_str()).increment(rows as u64);
    }

    pub fn fetch_error() {
        ::metrics::counter!(MetricName::SourcesFetchError.as_str()).increment(1);
    }
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

pub mod pipeline {
    use super::MetricName;
    use crate::pipeline::processing::StageStats;

    /// Record a finished stage
    pub fn stage_completed(stats: &StageStats, secs: f64) {
        let stage = stats.stage.clone();
        ::metrics::counter!(MetricName::PipelineStageCellsChanged.as_str(), "stage" => stage.clone())
            .increment(stats.cells_changed as u64);
        ::metrics::counter!(MetricName::PipelineStageParseFailures.as_str(), "stage" => stage.clone())
            .increment(stats.parse_failures as u64);
        ::metrics::histogram!(MetricName::PipelineStageDuration.as_str(), "stage" => stage).record(secs);
    }

    pub fn run_completed(rows: usize, secs: f64) {
        ::metrics::counter!(MetricName::PipelineRunsCompleted.as_str()).increment(1);
        ::metrics::counter!(MetricName::PipelineRowsCleaned.as_str()).increment(rows as u64);
        ::metrics::histogram!(MetricName::PipelineRunDuration.as_str()).record(secs);
    }

    pub fn run_failed(stage: &str) {
        ::metrics::counter!(MetricName::PipelineRunsFailed.as_str(), "stage" => stage.to_string())
            .increment(1);
    }
}

// ============================================================================
// Quality Gate Metrics
// ============================================================================

pub mod quality_gate {
    use super::MetricName;
    use crate::pipeline::processing::quality_gate::TableAssessment;

    /// Record the decision, score and every issue of an assessment
    pub fn assessed(assessment: &TableAssessment) {
        ::metrics::counter!(
            MetricName::QualityGateDecisions.as_str(),
            "decision" => format!("{:?}", assessment.decision)
        )
        .increment(1);
        ::metrics::histogram!(MetricName::QualityGateQualityScore.as_str())
            .record(assessment.quality_score);
        for issue in &assessment.issues {
            ::metrics::counter!(
                MetricName::QualityGateIssuesDetected.as_str(),
                "issue_type" => format!("{:?}", issue.issue_type),
                "severity" => format!("{:?}", issue.severity)
            )
            .increment(1);
        }
    }
}

// ============================================================================
// Sink Metrics
// ============================================================================

pub mod sink {
    use super::MetricName;

    pub fn rows_written(rows: usize) {
        ::metrics::counter!(MetricName::SinkRowsWritten.as_str()).increment(rows as u64);
    }
}
