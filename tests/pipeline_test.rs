use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::tempdir;

use grant_cleaner::app::clean_use_case::{CleanOutcome, CleanUseCase};
use grant_cleaner::config::Config;
use grant_cleaner::constants::*;
use grant_cleaner::domain::{Cell, PaymentStatus, Table};
use grant_cleaner::error::CleanerError;
use grant_cleaner::infra::{source_for, CsvFileSink};
use grant_cleaner::pipeline::processing::derive::IncomeBracket;
use grant_cleaner::pipeline::processing::quality_gate::{DefaultQualityGate, QualityIssueType};
use grant_cleaner::pipeline::CleaningPipeline;
use grant_cleaner::reporting;

const RAW: &str = "\
Grant Req Date,Payment Submitted?,Amount,Remaining Balance, Gender ,Insurance Type,Pt City ,Pt State,Total Household Gross Monthly Income,DOB,Application Signed?,Unnamed: 30,Unnamed: 31
2024-03-01,2024-03-05,\"$1,200.50\",$0,male,Medicaid & Medicare,OmAha,NE,\"$2,500\",1/2/1970,Yes,,
,Yes,Pending,$100,female,,,NE,,Missing,No,,
3/10/2024,No,$300,$50,fe male,uninsurred,O maha,NE,\"$9,000\",1990-05-05,,,
2024-04-10,2024-04-01,$50,Waiting on next statement,Female,MediCare,lincon,NE,-5,2030-01-01,Yes,,
";

fn config(source: &Path, output: &Path) -> Config {
    let mut config = Config::default();
    config.source.location = Some(source.display().to_string());
    config.output.path = output.to_path_buf();
    config.derive.as_of = NaiveDate::from_ymd_opt(2024, 6, 1);
    config
}

async fn clean(config: &Config) -> Result<CleanOutcome, CleanerError> {
    let location = config.source.location.clone().unwrap_or_default();
    CleanUseCase::new(
        source_for(&location),
        CleaningPipeline::from_config(config)?,
        Box::new(DefaultQualityGate::new(config.corrections.gender.clone())),
        Box::new(CsvFileSink::new(&config.output.path)),
    )
    .execute()
    .await
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn cleaned_fixture() -> (tempfile::TempDir, CleanOutcome) {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    std::fs::write(&raw, RAW).unwrap();
    let outcome = clean(&config(&raw, &dir.path().join("out/cleaned.csv"))).await.unwrap();
    (dir, outcome)
}

#[tokio::test]
async fn schema_is_trimmed_and_junk_columns_dropped() {
    let (_dir, outcome) = cleaned_fixture().await;
    let table = &outcome.run.table;
    for column in expected_columns() {
        assert!(table.has_column(column), "missing {column}");
    }
    assert!(!table.has_column("Unnamed: 30"));
    assert!(!table.has_column("Unnamed: 31"));
    assert!(table.has_column(DAYS_TO_SUPPORT));
    assert!(table.has_column(AGE));
    assert!(table.has_column(INCOME_RANGE));
}

#[tokio::test]
async fn turnaround_scenarios() {
    let (_dir, outcome) = cleaned_fixture().await;
    let t = &outcome.run.table;

    // dated submission: 2024-03-05 minus 2024-03-01
    assert_eq!(t.cell(0, DAYS_TO_SUPPORT), Some(&Cell::Integer(4)));
    // "Yes" with no request date is still one day
    assert_eq!(t.cell(1, PAYMENT_SUBMITTED), Some(&Cell::Payment(PaymentStatus::Confirmed)));
    assert_eq!(t.cell(1, GRANT_REQ_DATE), Some(&Cell::Absent));
    assert_eq!(t.cell(1, DAYS_TO_SUPPORT), Some(&Cell::Integer(1)));
    // "No" has no turnaround
    assert_eq!(t.cell(2, DAYS_TO_SUPPORT), Some(&Cell::Absent));
    // payment before request is left absent
    assert_eq!(t.cell(3, DAYS_TO_SUPPORT), Some(&Cell::Absent));

    for cell in t.column(DAYS_TO_SUPPORT).unwrap() {
        match cell {
            Cell::Absent => {}
            Cell::Integer(n) => assert!(*n >= 0),
            other => panic!("unexpected turnaround cell {other:?}"),
        }
    }
}

#[tokio::test]
async fn numeric_and_categorical_scenarios() {
    let (_dir, outcome) = cleaned_fixture().await;
    let t = &outcome.run.table;

    assert_eq!(t.cell(0, AMOUNT), Some(&Cell::Amount(dec("1200.50"))));
    assert_eq!(t.cell(1, AMOUNT), Some(&Cell::Absent));
    assert_eq!(t.cell(3, REMAINING_BALANCE), Some(&Cell::Absent));

    assert_eq!(t.cell(0, PT_CITY), Some(&Cell::text("Omaha")));
    assert_eq!(t.cell(1, PT_CITY), Some(&Cell::Absent));
    assert_eq!(t.cell(2, PT_CITY), Some(&Cell::text("Omaha")));
    assert_eq!(t.cell(3, PT_CITY), Some(&Cell::text("Lincoln")));

    assert_eq!(t.cell(0, INSURANCE_TYPE), Some(&Cell::text("Medicare & Medicaid")));
    assert_eq!(t.cell(1, INSURANCE_TYPE), Some(&Cell::text("Unknown")));
    assert_eq!(t.cell(2, INSURANCE_TYPE), Some(&Cell::text("Uninsured")));
    assert_eq!(t.cell(3, INSURANCE_TYPE), Some(&Cell::text("Medicare")));

    let genders: Vec<&Cell> = t.column(GENDER).unwrap().collect();
    assert_eq!(genders[0], &Cell::text("Male"));
    assert_eq!(genders[1], &Cell::text("Female"));
    assert_eq!(genders[2], &Cell::text("fe male"));
    assert!(genders
        .iter()
        .all(|g| !matches!(g, Cell::Text(s) if s == "male" || s == "female")));
}

#[tokio::test]
async fn derived_age_and_income_range() {
    let (_dir, outcome) = cleaned_fixture().await;
    let t = &outcome.run.table;

    assert_eq!(t.cell(0, AGE), Some(&Cell::Integer(54)));
    assert_eq!(t.cell(1, AGE), Some(&Cell::Absent));
    assert_eq!(t.cell(2, AGE), Some(&Cell::Integer(34)));
    // born after the reference date
    assert_eq!(t.cell(3, AGE), Some(&Cell::Absent));

    assert_eq!(t.cell(0, INCOME_RANGE), Some(&Cell::text("$2,000–3,999")));
    assert_eq!(t.cell(1, INCOME_RANGE), Some(&Cell::text("Missing")));
    assert_eq!(t.cell(2, INCOME_RANGE), Some(&Cell::text("$8,000+")));
    assert_eq!(t.cell(3, INCOME_RANGE), Some(&Cell::text("Missing")));
    for cell in t.column(INCOME_RANGE).unwrap() {
        let label = cell.as_text().expect("income range is never absent");
        assert!(IncomeBracket::from_label(label).is_some(), "{label}");
    }

    assert_eq!(t.cell(3, DOB), Some(&Cell::Date(ymd(2030, 1, 1))));
}

#[tokio::test]
async fn no_sentinel_text_survives() {
    let (_dir, outcome) = cleaned_fixture().await;
    let sentinels = ["Missing", "Pending", "Waiting on next statement", ""];
    for (column_idx, column) in outcome.run.table.columns.iter().enumerate() {
        if column == INCOME_RANGE {
            continue;
        }
        for row in &outcome.run.table.rows {
            if let Cell::Text(s) = &row.cells[column_idx] {
                assert!(!sentinels.contains(&s.as_str()), "{column}: {s:?}");
            }
        }
    }
}

#[tokio::test]
async fn cleaning_the_cleaned_file_is_a_no_op() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    std::fs::write(&raw, RAW).unwrap();
    let first_out = dir.path().join("first.csv");
    let second_out = dir.path().join("second.csv");

    let first = clean(&config(&raw, &first_out)).await.unwrap();
    let second = clean(&config(&first_out, &second_out)).await.unwrap();

    assert_eq!(first.run.fingerprint, second.run.fingerprint);
    assert_eq!(
        std::fs::read(&first_out).unwrap(),
        std::fs::read(&second_out).unwrap()
    );
    let categorical = second.run.stages.iter().find(|s| s.stage == "categorical").unwrap();
    assert_eq!(categorical.cells_changed, 0);
}

#[tokio::test]
async fn quality_gate_reports_without_blocking() {
    let (dir, outcome) = cleaned_fixture().await;
    let kinds: Vec<QualityIssueType> = outcome
        .assessment
        .issues
        .iter()
        .map(|i| i.issue_type.clone())
        .collect();
    assert!(kinds.contains(&QualityIssueType::SuspiciousValue));
    assert!(kinds.contains(&QualityIssueType::TemporalInconsistency));
    assert!(dir.path().join("out/cleaned.csv").exists());
}

#[tokio::test]
async fn missing_source_aborts_with_no_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("cleaned.csv");
    let err = clean(&config(&dir.path().join("nope.csv"), &output)).await.unwrap_err();
    assert!(matches!(err, CleanerError::SourceUnavailable { .. }));
    assert!(!output.exists());
}

#[tokio::test]
async fn reports_read_the_cleaned_table() {
    let (_dir, outcome) = cleaned_fixture().await;
    let t: &Table = &outcome.run.table;

    assert_eq!(reporting::review_queue(t).len(), 2);
    let by_city = reporting::support_by(t, PT_CITY);
    let omaha = by_city.iter().find(|g| g.group == "Omaha").unwrap();
    assert_eq!(omaha.total, dec("1500.50"));
    assert_eq!(omaha.applications, 2);

    let unused = reporting::unused_grants(t);
    assert_eq!(unused.considered, 2);
    assert_eq!(unused.count, 1);

    let impact = reporting::impact_summary(t);
    assert_eq!(impact.total_applications, 4);
    assert_eq!(impact.total_distributed, dec("1550.50"));
    assert_eq!(impact.cities_served, 2);
}
