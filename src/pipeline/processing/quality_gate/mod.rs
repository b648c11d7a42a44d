use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{self, AMOUNT, GENDER, GRANT_REQ_DATE, PAYMENT_SUBMITTED, REMAINING_BALANCE};
use crate::domain::{Cell, Table};
use crate::pipeline::processing::corrections::CorrectionTable;
use crate::pipeline::processing::derive::{turnaround, Turnaround};
use crate::pipeline::processing::StageStats;

/// Quality assessment of a cleaned table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableAssessment {
    /// The quality gate decision
    pub decision: QualityDecision,
    /// Overall quality score (0.0 to 1.0)
    pub quality_score: f64,
    /// Specific quality issues found
    pub issues: Vec<QualityIssue>,
    /// The quality rule set version used
    pub rule_version: String,
    pub assessed_at: DateTime<Utc>,
}

/// Quality Gate decision for a table. The gate reports; it never blocks
/// persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum QualityDecision {
    Accept,
    AcceptWithWarnings,
    /// Critical problems; a person should look before the table is used
    NeedsReview,
}

/// Individual quality issue found during assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub issue_type: QualityIssueType,
    pub severity: QualitySeverity,
    pub description: String,
    /// Column that triggered this issue
    pub column: Option<String>,
    /// Number of affected rows, when meaningful
    pub affected_rows: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum QualityIssueType {
    /// Expected column absent from the source
    SchemaMismatch,
    /// Missing required data
    MissingData,
    /// Cells that could not be coerced
    InvalidFormat,
    /// Values left outside the correction tables
    SuspiciousValue,
    /// Date/time inconsistencies
    TemporalInconsistency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, PartialOrd)]
pub enum QualitySeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Configuration for Quality Gate assessment rules
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Minimum quality score before a table needs review
    pub min_quality_score: f64,
    pub rule_version: String,
    /// Share of rows a stage may fail to parse before it becomes a warning
    pub max_parse_failure_ratio: f64,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_quality_score: 0.5,
            rule_version: "v1.0.0".to_string(),
            max_parse_failure_ratio: 0.05,
        }
    }
}

/// Trait for implementing Quality Gate assessment logic
pub trait QualityGate: Send + Sync {
    fn assess(&self, table: &Table, stages: &[StageStats]) -> TableAssessment;
}

pub struct DefaultQualityGate {
    pub config: QualityGateConfig,
    gender: CorrectionTable,
}

impl DefaultQualityGate {
    pub fn new(gender: CorrectionTable) -> Self {
        Self::with_config(QualityGateConfig::default(), gender)
    }

    pub fn with_config(config: QualityGateConfig, gender: CorrectionTable) -> Self {
        Self { config, gender }
    }

    fn assess_schema(&self, table: &Table) -> Vec<QualityIssue> {
        constants::expected_columns()
            .into_iter()
            .filter(|c| !table.has_column(c))
            .map(|c| QualityIssue {
                issue_type: QualityIssueType::SchemaMismatch,
                severity: QualitySeverity::Warning,
                description: format!("Expected column '{}' is missing; views using it are skipped", c),
                column: Some(c.to_string()),
                affected_rows: None,
            })
            .collect()
    }

    fn assess_parse_failures(&self, table: &Table, stages: &[StageStats]) -> Vec<QualityIssue> {
        let rows = table.len().max(1) as f64;
        stages
            .iter()
            .filter(|s| s.parse_failures > 0)
            .map(|s| {
                let ratio = s.parse_failures as f64 / rows;
                QualityIssue {
                    issue_type: QualityIssueType::InvalidFormat,
                    severity: if ratio > self.config.max_parse_failure_ratio {
                        QualitySeverity::Warning
                    } else {
                        QualitySeverity::Info
                    },
                    description: format!(
                        "Stage '{}' could not parse {} cells; they were left absent",
                        s.stage, s.parse_failures
                    ),
                    column: None,
                    affected_rows: Some(s.parse_failures),
                }
            })
            .collect()
    }

    fn assess_gender(&self, table: &Table) -> Option<QualityIssue> {
        let mut unmapped: BTreeMap<&str, usize> = BTreeMap::new();
        for cell in table.column(GENDER)? {
            if let Cell::Text(value) = cell {
                if !self.gender.is_canonical(value) {
                    *unmapped.entry(value.as_str()).or_default() += 1;
                }
            }
        }
        if unmapped.is_empty() {
            return None;
        }
        let total = unmapped.values().sum();
        let values: Vec<String> = unmapped.iter().map(|(v, n)| format!("'{}' x{}", v, n)).collect();
        Some(QualityIssue {
            issue_type: QualityIssueType::SuspiciousValue,
            severity: QualitySeverity::Info,
            description: format!("Gender values outside the correction table: {}", values.join(", ")),
            column: Some(GENDER.to_string()),
            affected_rows: Some(total),
        })
    }

    fn assess_turnaround_order(&self, table: &Table) -> Option<QualityIssue> {
        let pay_idx = table.column_index(PAYMENT_SUBMITTED)?;
        let req_idx = table.column_index(GRANT_REQ_DATE)?;
        let out_of_order = table
            .rows
            .iter()
            .filter(|r| {
                turnaround(r.cells[pay_idx].as_payment(), r.cells[req_idx].as_date())
                    == Turnaround::OutOfOrder
            })
            .count();
        (out_of_order > 0).then(|| QualityIssue {
            issue_type: QualityIssueType::TemporalInconsistency,
            severity: QualitySeverity::Warning,
            description: format!(
                "{} payments are dated before their grant request; turnaround left absent",
                out_of_order
            ),
            column: Some(PAYMENT_SUBMITTED.to_string()),
            affected_rows: Some(out_of_order),
        })
    }

    fn assess_amounts(&self, table: &Table) -> Option<QualityIssue> {
        let amount_idx = table.column_index(AMOUNT)?;
        let balance_idx = table.column_index(REMAINING_BALANCE)?;
        let missing = table
            .rows
            .iter()
            .filter(|r| r.cells[amount_idx].is_absent() && r.cells[balance_idx].is_absent())
            .count();
        (missing > 0).then(|| QualityIssue {
            issue_type: QualityIssueType::MissingData,
            severity: QualitySeverity::Info,
            description: format!("{} rows have neither an amount nor a remaining balance", missing),
            column: Some(AMOUNT.to_string()),
            affected_rows: Some(missing),
        })
    }

    /// Calculate overall quality score based on issues
    fn calculate_quality_score(&self, issues: &[QualityIssue]) -> f64 {
        issues.iter().fold(1.0_f64, |score, issue| {
            let deduction = match issue.severity {
                QualitySeverity::Info => 0.01,
                QualitySeverity::Warning => 0.05,
                QualitySeverity::Error => 0.15,
                QualitySeverity::Critical => 0.30,
            };
            (score - deduction).max(0.0)
        })
    }

    /// Determine quality decision based on score and issues
    fn determine_decision(&self, quality_score: f64, issues: &[QualityIssue]) -> QualityDecision {
        if issues.iter().any(|i| i.severity == QualitySeverity::Critical) {
            return QualityDecision::NeedsReview;
        }
        if quality_score < self.config.min_quality_score {
            return QualityDecision::NeedsReview;
        }
        if issues.iter().any(|i| i.severity >= QualitySeverity::Warning) {
            return QualityDecision::AcceptWithWarnings;
        }
        QualityDecision::Accept
    }
}

impl QualityGate for DefaultQualityGate {
    fn assess(&self, table: &Table, stages: &[StageStats]) -> TableAssessment {
        let mut issues = Vec::new();

        if table.is_empty() {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::MissingData,
                severity: QualitySeverity::Critical,
                description: "Cleaned table has no rows".to_string(),
                column: None,
                affected_rows: Some(0),
            });
        }

        issues.extend(self.assess_schema(table));
        issues.extend(self.assess_parse_failures(table, stages));
        issues.extend(self.assess_gender(table));
        issues.extend(self.assess_turnaround_order(table));
        issues.extend(self.assess_amounts(table));

        let quality_score = self.calculate_quality_score(&issues);
        let decision = self.determine_decision(quality_score, &issues);

        TableAssessment {
            decision,
            quality_score,
            issues,
            rule_version: self.config.rule_version.clone(),
            assessed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PaymentStatus, Record};
    use crate::pipeline::processing::corrections::Corrections;
    use chrono::NaiveDate;

    fn gate() -> DefaultQualityGate {
        DefaultQualityGate::new(Corrections::default().gender)
    }

    fn full_table(rows: Vec<Vec<Cell>>) -> Table {
        let columns = constants::expected_columns().into_iter().map(str::to_string).collect();
        Table::new(columns, rows.into_iter().map(|cells| Record { cells }).collect())
    }

    fn row() -> Vec<Cell> {
        let mut cells = vec![Cell::Absent; constants::expected_columns().len()];
        cells[2] = Cell::Amount(100.into());
        cells[4] = Cell::text("Female");
        cells
    }

    #[test]
    fn clean_table_is_accepted() {
        let assessment = gate().assess(&full_table(vec![row()]), &[]);
        assert_eq!(assessment.decision, QualityDecision::Accept);
        assert!(assessment.issues.is_empty());
        assert_eq!(assessment.quality_score, 1.0);
    }

    #[test]
    fn missing_columns_are_schema_warnings() {
        let table = Table::new(
            vec![AMOUNT.to_string()],
            vec![Record { cells: vec![Cell::Amount(5.into())] }],
        );
        let assessment = gate().assess(&table, &[]);
        assert_eq!(assessment.decision, QualityDecision::AcceptWithWarnings);
        let mismatches = assessment
            .issues
            .iter()
            .filter(|i| i.issue_type == QualityIssueType::SchemaMismatch)
            .count();
        assert_eq!(mismatches, constants::expected_columns().len() - 1);
    }

    #[test]
    fn flags_unmapped_gender_and_out_of_order_payments() {
        let mut odd = row();
        odd[4] = Cell::text("fe male");
        odd[0] = Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        odd[1] = Cell::Payment(PaymentStatus::SubmittedOn(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));

        let assessment = gate().assess(&full_table(vec![row(), odd]), &[]);
        let kinds: Vec<_> = assessment.issues.iter().map(|i| i.issue_type.clone()).collect();
        assert!(kinds.contains(&QualityIssueType::SuspiciousValue));
        assert!(kinds.contains(&QualityIssueType::TemporalInconsistency));
        assert_eq!(assessment.decision, QualityDecision::AcceptWithWarnings);
    }

    #[test]
    fn parse_failures_escalate_past_threshold() {
        let mut stats = StageStats::new("numeric");
        stats.parse_failures = 1;
        let table = full_table(vec![row(); 100]);
        let assessment = gate().assess(&table, &[stats.clone()]);
        assert_eq!(assessment.issues[0].severity, QualitySeverity::Info);

        stats.parse_failures = 10;
        let assessment = gate().assess(&table, &[stats]);
        assert_eq!(assessment.issues[0].severity, QualitySeverity::Warning);
    }

    #[test]
    fn empty_table_needs_review() {
        let assessment = gate().assess(&full_table(vec![]), &[]);
        assert_eq!(assessment.decision, QualityDecision::NeedsReview);
    }
}
