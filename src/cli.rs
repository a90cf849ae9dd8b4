//! Command-line interface definitions.
//!
//! Every option can also come from the environment; the search API
//! credentials normally do.

use clap::{Parser, ValueEnum};

/// Which gathering run to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Search news for every active cohort's faculty, university and participants
    Cohort,
    /// Sweep the configured university news sites
    Site,
    /// Look up the faculty roster through university site search
    Faculty,
}

impl Mode {
    /// Name of the run's report file.
    pub fn report_name(self) -> &'static str {
        match self {
            Mode::Cohort => "cohorts",
            Mode::Site => "site_sweep",
            Mode::Faculty => "faculty_search",
        }
    }
}

/// Gather good news about faculty, partner universities and participants.
///
/// ```sh
/// goodnews_gather -o ./out --mode site
/// goodnews_gather -o ./out -c gather.yaml --mode cohort --days-back 14
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory for run reports and the news store
    #[arg(short, long, env = "GOODNEWS_OUTPUT_DIR")]
    pub output_dir: String,

    /// Optional path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Mode::Cohort)]
    pub mode: Mode,

    /// How far back cohort searches look, in days
    #[arg(short, long, default_value_t = 7)]
    pub days_back: u32,

    /// Search API key
    #[arg(long, env = "GOOGLE_SEARCH_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Search engine id
    #[arg(long, env = "GOOGLE_SEARCH_ENGINE_ID")]
    pub google_engine_id: Option<String>,
}
