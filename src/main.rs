//! # Good News Gather
//!
//! Runs one gathering pass and writes its report.
//!
//! ## Usage
//!
//! ```sh
//! goodnews_gather -o ./out --mode cohort
//! goodnews_gather -o ./out --mode site -c gather.yaml
//! ```
//!
//! ## Modes
//!
//! - **cohort**: web-search news for every active cohort's faculty, partner
//!   university and participants
//! - **site**: sweep each configured university's news pages and feeds
//! - **faculty**: look each roster faculty member up through their
//!   university's site search
//!
//! Saved items are appended to `{output_dir}/news.jsonl`; the run report lands
//! in `{output_dir}/{date}/{mode}.json`. Ctrl-C stops the run after the
//! current entity and still writes the partial report.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use goodnews_gather::cancel::{CancelToken, cancel_pair};
use goodnews_gather::cli::{Cli, Mode};
use goodnews_gather::collaborators::StaticRoster;
use goodnews_gather::config::GatherConfig;
use goodnews_gather::enricher::ContentEnricher;
use goodnews_gather::error::GatherError;
use goodnews_gather::http::HttpClient;
use goodnews_gather::orchestrator::{GatherWindow, Orchestrator};
use goodnews_gather::outputs::json::write_report;
use goodnews_gather::outputs::store::JsonlStore;
use goodnews_gather::search::adapters::EntitySearch;
use goodnews_gather::search::google::GoogleSearchClient;
use goodnews_gather::sweep::{FacultySiteSearch, SiteSweep};
use goodnews_gather::utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("goodnews_gather starting up");

    let args = Cli::parse();
    debug!(?args.output_dir, ?args.config, ?args.mode, args.days_back, "Parsed CLI arguments");

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let config = GatherConfig::load(args.config.as_deref().map(Path::new))?;

    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current entity");
            handle.cancel();
        }
    });

    let report_path = match args.mode {
        Mode::Cohort => run_cohorts(&args, &config, cancel).await?,
        Mode::Site => run_site_sweep(&args, &config, cancel).await?,
        Mode::Faculty => run_faculty_search(&args, &config, cancel).await?,
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        report = %report_path.display(),
        "Execution complete"
    );
    Ok(())
}

async fn run_cohorts(
    args: &Cli,
    config: &GatherConfig,
    cancel: CancelToken,
) -> Result<std::path::PathBuf, GatherError> {
    let api = GoogleSearchClient::new(args.google_api_key.clone(), args.google_engine_id.clone());
    let orchestrator = Orchestrator::new(
        EntitySearch::new(api, config.vocabularies.clone()),
        JsonlStore::new(&args.output_dir),
        HttpClient::new(),
        ContentEnricher::new(&config.enrichment.search)?,
        config.pacing.clone(),
    )
    .with_cancel(cancel);

    let roster = StaticRoster::new(config.cohorts.clone());
    let now = Utc::now();
    let window = GatherWindow::new(now - chrono::Duration::days(i64::from(args.days_back)), now);
    let results = orchestrator.gather_active(&roster, window).await;

    let total: usize = results.iter().map(|(_, r)| r.total()).sum();
    let errors: usize = results.iter().map(|(_, r)| r.errors.len()).sum();
    info!(cohorts = results.len(), total, errors, "Cohort gathering finished");

    let report: serde_json::Map<String, serde_json::Value> = results
        .into_iter()
        .map(|(id, r)| Ok((id, serde_json::to_value(r)?)))
        .collect::<Result<_, GatherError>>()?;
    write_report(&report, &args.output_dir, Mode::Cohort.report_name()).await
}

async fn run_site_sweep(
    args: &Cli,
    config: &GatherConfig,
    cancel: CancelToken,
) -> Result<std::path::PathBuf, GatherError> {
    let fetcher = HttpClient::new();
    let store = JsonlStore::new(&args.output_dir);
    let roster = StaticRoster::new(config.cohorts.clone());
    let sweep = SiteSweep::new(config, &fetcher, &store, &roster)?.with_cancel(cancel);

    let reports = sweep.run().await;
    write_report(&reports, &args.output_dir, Mode::Site.report_name()).await
}

async fn run_faculty_search(
    args: &Cli,
    config: &GatherConfig,
    cancel: CancelToken,
) -> Result<std::path::PathBuf, GatherError> {
    if config.faculty_roster.is_empty() {
        warn!("Faculty roster is empty; nothing to search");
    }
    let fetcher = HttpClient::new();
    let search = FacultySiteSearch::new(config, &fetcher).with_cancel(cancel);

    let reports = search.run(&config.faculty_roster).await;
    write_report(&reports, &args.output_dir, Mode::Faculty.report_name()).await
}
