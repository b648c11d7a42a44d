use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use grant_cleaner::app::clean_use_case::{CleanOutcome, CleanUseCase};
use grant_cleaner::config::{Config, ENV_SOURCE};
use grant_cleaner::infra::{source_for, CsvFileSink};
use grant_cleaner::observability::{self, metrics};
use grant_cleaner::pipeline::processing::quality_gate::DefaultQualityGate;
use grant_cleaner::pipeline::CleaningPipeline;
use grant_cleaner::reporting::Report;

#[derive(Parser)]
#[command(name = "grant_cleaner")]
#[command(about = "Clean and enrich grant application exports")]
#[command(version)]
struct Cli {
    /// Config file (defaults to grant_cleaner.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raw CSV path or http(s) URL
    #[arg(long, global = true)]
    source: Option<String>,

    /// Where to write the cleaned CSV
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Write a Prometheus metrics snapshot here on exit
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the source and write the cleaned CSV
    Clean,
    /// Clean the source, then print the reporting aggregates
    Report {
        /// Print the aggregates as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and pipeline without touching any data
    CheckConfig,
}

fn build_use_case(config: &Config) -> Result<CleanUseCase> {
    let location = config.source.location.as_deref().ok_or_else(|| {
        anyhow!("no source configured: pass --source, set {} or add [source] location", ENV_SOURCE)
    })?;
    let pipeline = CleaningPipeline::from_config(config).context("invalid pipeline configuration")?;

    Ok(CleanUseCase::new(
        source_for(location),
        pipeline,
        Box::new(DefaultQualityGate::new(config.corrections.gender.clone())),
        Box::new(CsvFileSink::new(&config.output.path)),
    ))
}

fn print_outcome(outcome: &CleanOutcome) {
    println!("\n📊 Cleaning run {}", outcome.run.run_id);
    println!("   Rows: {}", outcome.receipt.rows);
    if let Some(path) = &outcome.receipt.path {
        println!("   Output file: {}", path.display());
    }
    println!("   Fingerprint: {}", outcome.run.fingerprint);
    println!("   Duration: {:.2?}", outcome.run.duration);
    for stage in &outcome.run.stages {
        println!(
            "   {:<12} changed {:>6}  parse failures {:>4}",
            stage.stage, stage.cells_changed, stage.parse_failures
        );
    }
    println!(
        "   Quality: {:?} (score {:.2})",
        outcome.assessment.decision, outcome.assessment.quality_score
    );
    for issue in &outcome.assessment.issues {
        println!("   - [{:?}] {}", issue.severity, issue.description);
    }
}

fn print_report(report: &Report) {
    println!("\nApplications ready for review: {}", report.review_queue_size);

    let groups = [
        ("gender", &report.support_by_gender),
        ("insurance type", &report.support_by_insurance),
        ("income range", &report.support_by_income_range),
        ("age", &report.support_by_age_bucket),
    ];
    for (title, totals) in groups {
        println!("\nSupport by {}:", title);
        for group in totals.iter() {
            println!("   {:<24} ${:>12.2}  ({} applications)", group.group, group.total, group.applications);
        }
    }

    println!("\nTime to provide support:");
    for month in &report.turnaround_by_month {
        println!("   {}-{:02}  {:.2} days", month.year, month.month, month.mean_days);
    }

    let unused = &report.unused_grants;
    println!("\nUnused grants: {} of {} ({:.2}%)", unused.count, unused.considered, unused.percent);
    if let Some(avg) = unused.average_remaining {
        println!("   Average remaining balance: ${:.2}", avg);
    }

    let impact = &report.impact;
    println!("\nImpact:");
    println!("   Total applications: {}", impact.total_applications);
    println!("   Total distributed: ${:.2}", impact.total_distributed);
    match impact.average_award {
        Some(avg) => println!("   Average award: ${:.2}", avg),
        None => println!("   Average award: N/A"),
    }
    match impact.average_days_to_support {
        Some(days) => println!("   Avg. days to support: {:.2} days", days),
        None => println!("   Avg. days to support: N/A"),
    }
    println!("   Cities served: {}", impact.cities_served);
    for city in &impact.top_cities {
        println!("   {:<24} {}", city.label.as_deref().unwrap_or("(blank)"), city.count);
    }
}

fn check_config(config: &Config) -> Result<()> {
    let pipeline = CleaningPipeline::from_config(config).context("invalid pipeline configuration")?;
    println!("✅ Pipeline '{}': {}", config.pipeline.name, pipeline.stage_names().join(" -> "));
    println!(
        "   Source: {}",
        config.source.location.as_deref().unwrap_or("(not set)")
    );
    println!("   Output: {}", config.output.path.display());
    println!("   Age as of: {}", config.derive.as_of_or_today());
    let tables = [
        ("gender", &config.corrections.gender),
        ("insurance", &config.corrections.insurance),
        ("city", &config.corrections.city),
    ];
    for (name, table) in tables {
        println!("   Corrections '{}' v{}: {} entries", name, table.version, table.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config.source.location = Some(source);
    }
    if let Some(output) = cli.output {
        config.output.path = output;
    }

    let _log_guard = observability::init_logging(&config.output.log_dir);
    let metrics_handle = match metrics::init() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    match cli.command {
        Commands::Clean => {
            let outcome = build_use_case(&config)?.execute().await?;
            print_outcome(&outcome);
        }
        Commands::Report { json } => {
            let outcome = build_use_case(&config)?.execute().await?;
            let report = Report::build(&outcome.run.table);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_outcome(&outcome);
                print_report(&report);
            }
        }
        Commands::CheckConfig => check_config(&config)?,
    }

    if let (Some(path), Some(handle)) = (cli.metrics_out, metrics_handle.as_ref()) {
        metrics::write_snapshot(handle, &path)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "Wrote metrics snapshot");
    }

    Ok(())
}
