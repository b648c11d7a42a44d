// Cleaning pipeline: ingestion, processing stages, and storage

pub mod ingestion;
pub mod pipeline_config;
pub mod processing;
pub mod runner;
pub mod storage;

pub use pipeline_config::{PipelineConfig, PipelineStepConfig};
pub use runner::{CleaningPipeline, PipelineRun};
