use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CleanerError, Result};

/// Configuration for a complete cleaning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub steps: Vec<PipelineStepConfig>,
}

/// Configuration for individual pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStepConfig {
    Schema,
    Sentinel,
    Categorical,
    Numeric,
    Temporal,
    Derive,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::full()
    }
}

impl PipelineConfig {
    /// Every stage, ending with the derived fields
    pub fn full() -> Self {
        Self {
            name: "full".to_string(),
            description: "Clean the raw export and derive turnaround, age and income range".to_string(),
            steps: vec![
                PipelineStepConfig::Schema,
                PipelineStepConfig::Sentinel,
                PipelineStepConfig::Categorical,
                PipelineStepConfig::Numeric,
                PipelineStepConfig::Temporal,
                PipelineStepConfig::Derive,
            ],
        }
    }

    /// Cleaning without derived columns
    pub fn normalize_only() -> Self {
        let mut config = Self::full();
        config.name = "normalize_only".to_string();
        config.description = "Clean the raw export without adding derived columns".to_string();
        config.steps.retain(|s| *s != PipelineStepConfig::Derive);
        config
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(CleanerError::Config(format!(
                "pipeline '{}' must have at least one step",
                self.name
            )));
        }

        let mut seen_steps = HashSet::new();

        for step in &self.steps {
            let step_name = step.step_name();
            if !seen_steps.insert(step_name) {
                return Err(CleanerError::Config(format!(
                    "step '{}' appears more than once",
                    step_name
                )));
            }

            for dep in step.dependencies() {
                if !seen_steps.contains(dep) {
                    return Err(CleanerError::Config(format!(
                        "step '{}' depends on '{}' which does not run before it",
                        step_name, dep
                    )));
                }
            }
        }

        Ok(())
    }
}

impl PipelineStepConfig {
    /// Get the step name for dependency checking
    pub fn step_name(&self) -> &'static str {
        match self {
            PipelineStepConfig::Schema => "schema",
            PipelineStepConfig::Sentinel => "sentinel",
            PipelineStepConfig::Categorical => "categorical",
            PipelineStepConfig::Numeric => "numeric",
            PipelineStepConfig::Temporal => "temporal",
            PipelineStepConfig::Derive => "derive",
        }
    }

    /// Get the dependencies for this step
    pub fn dependencies(&self) -> Vec<&'static str> {
        match self {
            PipelineStepConfig::Schema => vec![],
            PipelineStepConfig::Sentinel => vec!["schema"],
            PipelineStepConfig::Categorical
            | PipelineStepConfig::Numeric
            | PipelineStepConfig::Temporal => vec!["sentinel"],
            PipelineStepConfig::Derive => vec!["numeric", "temporal"],
        }
    }
}
