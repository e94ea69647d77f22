//! Fusion CLI - Command-line interface for Activity Fusion
//!
//! Commands:
//! - reconcile: Merge, enrich and compare provider exports into a summary document
//! - normalize: Print the canonical records of one provider export
//! - ride-report: Build the latest ride report from a summary document
//! - cache status: Inspect the Strava activity cache

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use activity_fusion::adapters::{BoschAdapter, GarminAdapter, ProviderAdapter, StravaAdapter};
use activity_fusion::cache::{ActivityCache, CacheStatus};
use activity_fusion::config::{ConfigError, FusionConfig};
use activity_fusion::encoder::{SummaryDocument, SummaryEncoder};
use activity_fusion::intensity::{parse_garmin_dailies, weekly_intensity_window};
use activity_fusion::pipeline::{FusionProcessor, JsonFileSource, STRAVA_CACHE_KEY};
use activity_fusion::report::ride_report;
use activity_fusion::{FusionError, FUSION_VERSION};

/// Fusion - Reconcile fitness activities from Garmin, Strava and Bosch eBike
#[derive(Parser)]
#[command(name = "fusion")]
#[command(version = FUSION_VERSION)]
#[command(about = "Reconcile and enrich fitness activities across providers", long_about = None)]
struct Cli {
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge, enrich and compare provider exports into a summary document
    Reconcile {
        /// Garmin activity list export
        #[arg(long)]
        garmin: PathBuf,

        /// Strava athlete activities export
        #[arg(long)]
        strava: PathBuf,

        /// Bosch eBike Flow or Connect export
        #[arg(long)]
        bosch: PathBuf,

        /// Garmin daily summaries, for weekly intensity minutes
        #[arg(long)]
        dailies: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Directory holding the Strava cache
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Always read Strava from the export, bypassing the cache
        #[arg(long)]
        no_cache: bool,

        /// Same-day distance tolerance for duplicates (km)
        #[arg(long)]
        tolerance_km: Option<f64>,

        /// Minimum enrichment match score
        #[arg(long)]
        min_score: Option<f64>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the canonical records of one provider export
    Normalize {
        #[arg(long, value_enum)]
        provider: ProviderArg,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Build the latest ride report from a summary document
    RideReport {
        /// Summary document (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Inspect the provider cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report whether the Strava cache is fresh, stale, missing or corrupt
    Status {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Garmin,
    Strava,
    Bosch,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout is reserved for JSON output
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("activity_fusion=info,fusion=info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true)
                    .with_writer(io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn run(cli: Cli) -> Result<(), FusionCliError> {
    match cli.command {
        Commands::Reconcile {
            garmin,
            strava,
            bosch,
            dailies,
            output,
            cache_dir,
            no_cache,
            tolerance_km,
            min_score,
            pretty,
        } => {
            let mut config = FusionConfig::from_env()?;
            if let Some(dir) = cache_dir {
                config.cache_dir = dir;
            }
            if let Some(tolerance) = tolerance_km {
                config.dedup_tolerance_km = tolerance;
            }
            if let Some(score) = min_score {
                config.enrich_min_score = score;
            }
            config.validate()?;

            cmd_reconcile(
                &config,
                &garmin,
                &strava,
                &bosch,
                dailies.as_deref(),
                &output,
                no_cache,
                pretty,
            )
        }

        Commands::Normalize { provider, input } => cmd_normalize(provider, &input),

        Commands::RideReport { input, output } => cmd_ride_report(&input, &output),

        Commands::Cache {
            action: CacheAction::Status { cache_dir },
        } => cmd_cache_status(cache_dir),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_reconcile(
    config: &FusionConfig,
    garmin: &Path,
    strava: &Path,
    bosch: &Path,
    dailies: Option<&Path>,
    output: &Path,
    no_cache: bool,
    pretty: bool,
) -> Result<(), FusionCliError> {
    let mut processor = FusionProcessor::from_config(config);
    if no_cache {
        processor = processor.with_cache(None);
    }

    let timeline = processor.run(
        &JsonFileSource::new("garmin", garmin),
        &JsonFileSource::new("strava", strava),
        &JsonFileSource::new("bosch", bosch),
    );

    if timeline.is_empty() {
        return Err(FusionCliError::NoActivities);
    }

    let weekly = match dailies {
        Some(path) => match read_input(path)
            .map_err(FusionError::from)
            .and_then(|raw| parse_garmin_dailies(&raw))
        {
            Ok(days) => Some(weekly_intensity_window(&days, config.weekly_window)),
            Err(e) => {
                tracing::warn!(error = %e, "Daily summaries unavailable, skipping weekly intensity");
                None
            }
        },
        None => None,
    };

    let json = SummaryEncoder::new().encode_to_json(&timeline, weekly, pretty || is_terminal_output(output))?;
    write_output(output, &json)?;
    Ok(())
}

fn cmd_normalize(provider: ProviderArg, input: &Path) -> Result<(), FusionCliError> {
    let raw = read_input(input)?;
    let json = match provider {
        ProviderArg::Garmin => serde_json::to_string_pretty(&GarminAdapter.parse(&raw)?)?,
        ProviderArg::Strava => serde_json::to_string_pretty(&StravaAdapter.parse(&raw)?)?,
        ProviderArg::Bosch => serde_json::to_string_pretty(&BoschAdapter.parse(&raw)?)?,
    };
    println!("{json}");
    Ok(())
}

fn cmd_ride_report(input: &Path, output: &Path) -> Result<(), FusionCliError> {
    let config = FusionConfig::from_env()?;
    let document = SummaryDocument::from_json(&read_input(input)?)?;

    let report = ride_report(&document.activities(), config.ride_history, Utc::now());
    let json = serde_json::to_string_pretty(&report)?;
    write_output(output, &json)?;
    Ok(())
}

fn cmd_cache_status(cache_dir: Option<PathBuf>) -> Result<(), FusionCliError> {
    let config = FusionConfig::from_env()?;
    let cache = ActivityCache::new(cache_dir.unwrap_or(config.cache_dir), config.cache_ttl);
    let status = cache.inspect_at(STRAVA_CACHE_KEY, Utc::now());

    let (age_minutes, activities, detail) = match &status {
        CacheStatus::Fresh { age, activities } => (Some(age.num_minutes()), Some(*activities), None),
        CacheStatus::Stale { age } => (Some(age.num_minutes()), None, None),
        CacheStatus::Missing => (None, None, None),
        CacheStatus::Corrupt(reason) => (None, None, Some(reason.clone())),
    };

    let report = CacheReport {
        key: STRAVA_CACHE_KEY.to_string(),
        path: cache.path_for(STRAVA_CACHE_KEY).display().to_string(),
        status: status.label().to_string(),
        ttl_hours: cache.ttl().num_hours(),
        age_minutes,
        activities,
        detail,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// Helper functions

fn read_input(path: &Path) -> io::Result<String> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(path)
    }
}

fn write_output(path: &Path, data: &str) -> io::Result<()> {
    if path.to_string_lossy() == "-" {
        println!("{data}");
        Ok(())
    } else {
        fs::write(path, data)
    }
}

fn is_terminal_output(path: &Path) -> bool {
    path.to_string_lossy() == "-" && atty::is(atty::Stream::Stdout)
}

// Error types

#[derive(Debug)]
enum FusionCliError {
    Io(io::Error),
    Fusion(FusionError),
    Json(serde_json::Error),
    Config(ConfigError),
    NoActivities,
}

impl From<io::Error> for FusionCliError {
    fn from(e: io::Error) -> Self {
        FusionCliError::Io(e)
    }
}

impl From<FusionError> for FusionCliError {
    fn from(e: FusionError) -> Self {
        FusionCliError::Fusion(e)
    }
}

impl From<serde_json::Error> for FusionCliError {
    fn from(e: serde_json::Error) -> Self {
        FusionCliError::Json(e)
    }
}

impl From<ConfigError> for FusionCliError {
    fn from(e: ConfigError) -> Self {
        FusionCliError::Config(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FusionCliError> for CliError {
    fn from(e: FusionCliError) -> Self {
        match e {
            FusionCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FusionCliError::Fusion(e) => CliError {
                code: "FUSION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the input is a provider activity export".to_string()),
            },
            FusionCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FusionCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check FUSION_* environment variables and flags".to_string()),
            },
            FusionCliError::NoActivities => CliError {
                code: "NO_ACTIVITIES".to_string(),
                message: "No activities found from any provider".to_string(),
                hint: Some("Check that the Garmin and Strava exports contain activities with distance".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct CacheReport {
    key: String,
    path: String,
    status: String,
    ttl_hours: i64,
    age_minutes: Option<i64>,
    activities: Option<usize>,
    detail: Option<String>,
}
