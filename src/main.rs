use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use workload_ranker::aggregate::{Aggregation, Aggregator};
use workload_ranker::bugzilla::BugzillaClient;
use workload_ranker::config::AppConfig;
use workload_ranker::jira::JiraClient;
use workload_ranker::normalize::Normalizer;
use workload_ranker::report::{self, OutputFormat};
use workload_ranker::sources::{self, Source};
use workload_ranker::weights::threshold_is_valid;
use workload_ranker::{rank, telemetry};

#[derive(Parser)]
#[command(name = "workload-ranker")]
#[command(about = "Ranks team workload across Bugzilla and Jira and flags untriaged issues", long_about = None)]
struct Cli {
    /// Read Bugzilla bugs from a saved REST response instead of the server
    #[arg(long, global = true)]
    bugzilla_snapshot: Option<PathBuf>,
    /// Read Jira issues from a saved search response instead of the server
    #[arg(long, global = true)]
    jira_snapshot: Option<PathBuf>,
    #[arg(long, global = true)]
    skip_bugzilla: bool,
    #[arg(long, global = true)]
    skip_jira: bool,
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank roster members from least to most loaded
    Rank {
        /// List every attributed issue under each person
        #[arg(long)]
        urls: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List issues left in NEW longer than the threshold
    Stale {
        /// Overrides RANKER_STALE_DAYS
        #[arg(long)]
        days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.telemetry).context("failed to initialise logging")?;

    if config.roster.is_empty() {
        warn!("roster is empty; set RANKER_ROSTER or the roster list in RANKER_CONFIG");
    }

    let threshold_days = match &cli.command {
        Commands::Stale { days: Some(days) } if threshold_is_valid(*days) => *days,
        Commands::Stale { days: Some(days) } => {
            anyhow::bail!("--days must be a non-negative number of days within range, got {days}")
        }
        _ => config.stale_threshold_days,
    };

    let http = reqwest::Client::builder()
        .user_agent(concat!("workload-ranker/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let bugzilla_source = if cli.skip_bugzilla {
        Source::Disabled
    } else if let Some(path) = cli.bugzilla_snapshot {
        Source::Snapshot(path)
    } else if let Some(key) = config.bugzilla.api_key.as_deref() {
        Source::Live(BugzillaClient::new(
            http.clone(),
            &config.bugzilla.url,
            key,
            config.bugzilla.query.clone(),
        ))
    } else {
        info!("BUGZILLA_API_KEY not set, skipping bugzilla");
        Source::Disabled
    };

    let jira_source = if cli.skip_jira {
        Source::Disabled
    } else if let Some(path) = cli.jira_snapshot {
        Source::Snapshot(path)
    } else if let Some(token) = config.jira.token.as_deref() {
        Source::Live(JiraClient::new(
            http.clone(),
            &config.jira.url,
            token,
            config.jira.query.clone(),
        ))
    } else {
        info!("JIRA_TOKEN not set, skipping jira");
        Source::Disabled
    };

    let batches = sources::fetch_all(&bugzilla_source, &jira_source).await;

    let normalizer = Normalizer::new(
        config.weights.clone(),
        config.areas.clone(),
        config.bugzilla.url.as_str(),
        config.jira.url.as_str(),
    );
    let aggregator = Aggregator::new(normalizer, threshold_days, Utc::now());
    let mut state = Aggregation::new(&config.roster);

    for (backend, records) in batches.in_fold_order() {
        let summary = aggregator.ingest(records, &mut state);
        if summary.dropped > 0 {
            warn!(
                backend = backend.label(),
                dropped = summary.dropped,
                "some records were skipped"
            );
        }
    }

    let output = match cli.command {
        Commands::Rank { urls, limit } => {
            let mut ranking = rank::rank(&state.workload);
            if let Some(limit) = limit {
                ranking.truncate(limit);
            }
            report::render_leaderboard(&ranking, cli.format, urls)?
        }
        Commands::Stale { .. } => report::render_stale(
            &state.stale,
            aggregator.now(),
            aggregator.threshold_days(),
            cli.format,
        )?,
    };

    print!("{output}");
    Ok(())
}
