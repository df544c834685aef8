//! paycast - salary estimates from a skill list
//!
//! Usage:
//!   paycast predict rust go --region DE --experience 6
//!   paycast batch sets.json              # one skill list per JSON array entry
//!   paycast skills                       # supported skill keys
//!   paycast regions                      # supported region codes
//!   paycast schedule python --webhook https://hooks.example/salary
//!
//! Settings come from `PAYCAST_*` environment variables; `--data-url` overrides
//! `PAYCAST_DATA_URL` for live weights.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use paycast_infra::{JobOptions, JobQueue, LogWebhookNotifier, PaycastConfig};
use paycast_loader::{HttpWeightSource, WeightLoader};
use paycast_predictor::{DataStatus, LiveDataSource, Predictor, PredictorConfig};

#[derive(Parser)]
#[command(name = "paycast")]
#[command(about = "Deterministic salary estimates from skills, region, and experience")]
#[command(version)]
struct Cli {
    /// Live weight endpoint (overrides PAYCAST_DATA_URL)
    #[arg(long, global = true)]
    data_url: Option<String>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate a salary for one skill list
    Predict {
        /// Skills, e.g. "React" "TypeScript" "Node.js"
        #[arg(required = true)]
        skills: Vec<String>,

        /// Region code (default: PAYCAST_DEFAULT_REGION or US)
        #[arg(short, long)]
        region: Option<String>,

        /// Years of experience
        #[arg(short, long, default_value_t = 0.0)]
        experience: f64,
    },

    /// Estimate salaries for many skill lists
    Batch {
        /// JSON file holding an array of skill arrays (or - for stdin)
        #[arg(default_value = "-")]
        input: String,

        #[arg(short, long)]
        region: Option<String>,

        #[arg(short, long, default_value_t = 0.0)]
        experience: f64,
    },

    /// List supported skill keys
    Skills,

    /// List supported region codes
    Regions,

    /// Run a prediction through the job queue and wait for it
    Schedule {
        #[arg(required = true)]
        skills: Vec<String>,

        #[arg(short, long)]
        region: Option<String>,

        #[arg(short, long)]
        experience: Option<f64>,

        /// Webhook URL notified when the job finishes (logged, not sent)
        #[arg(long)]
        webhook: Option<String>,

        /// Give up waiting after this many milliseconds
        #[arg(long, default_value_t = 10_000)]
        wait_ms: u64,
    },
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {input}"))
    }
}

fn print_json(value: &impl serde::Serialize, compact: bool) -> Result<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{out}");
    Ok(())
}

/// Build a predictor, resolving live weights when a data URL is configured.
async fn build_predictor(
    config: &PaycastConfig,
    predictor_config: PredictorConfig,
) -> Result<Predictor> {
    let Some(http) = config.http_source() else {
        return Ok(Predictor::new(predictor_config)?);
    };

    let source = HttpWeightSource::new(http)?;
    let live = LiveDataSource::new(WeightLoader::new(), Arc::new(source), config.load_options());
    let mut predictor = Predictor::with_live_source(predictor_config, live)?;

    match predictor.ensure_live_data().await {
        DataStatus::Live => info!("using live weights"),
        status => {
            let info = predictor.data_info();
            warn!(
                status = ?status,
                error = info.error.as_deref().unwrap_or_default(),
                "live weights unavailable"
            );
        }
    }
    Ok(predictor)
}

#[tokio::main]
async fn main() -> Result<()> {
    paycast_observability::init();

    let cli = Cli::parse();
    let mut config = PaycastConfig::from_env()?;
    if let Some(url) = cli.data_url {
        config.data_url = Some(url);
    }
    let region_or_default =
        |region: Option<String>| region.unwrap_or_else(|| config.default_region.clone());

    match cli.command {
        Commands::Predict {
            skills,
            region,
            experience,
        } => {
            let predictor_config = PredictorConfig::new(region_or_default(region), experience);
            let predictor = build_predictor(&config, predictor_config).await?;
            let result = predictor.predict(&skills)?;
            print_json(&result, cli.compact)?;
        }

        Commands::Batch {
            input,
            region,
            experience,
        } => {
            let sets: Vec<Vec<String>> = serde_json::from_str(&read_input(&input)?)
                .context("batch input must be a JSON array of skill arrays")?;
            let predictor_config = PredictorConfig::new(region_or_default(region), experience);
            let predictor = build_predictor(&config, predictor_config).await?;
            let results = predictor.batch_predict(&sets)?;
            print_json(&results, cli.compact)?;
        }

        Commands::Skills => {
            let predictor = build_predictor(&config, PredictorConfig::default()).await?;
            print_json(&predictor.supported_skills(), cli.compact)?;
        }

        Commands::Regions => {
            let predictor = build_predictor(&config, PredictorConfig::default()).await?;
            print_json(
                &json!({
                    "regions": predictor.supported_regions(),
                    "dataSource": predictor.data_info(),
                }),
                cli.compact,
            )?;
        }

        Commands::Schedule {
            skills,
            region,
            experience,
            webhook,
            wait_ms,
        } => {
            let mut options = JobOptions::default().with_region(region_or_default(region));
            if let Some(years) = experience {
                options = options.with_experience(years);
            }
            if let Some(url) = webhook {
                options = options.with_webhook(url);
            }

            let queue = JobQueue::spawn(config.queue_config(), Arc::new(LogWebhookNotifier))?;
            let receipt = queue.schedule_job(&skills, options)?;
            info!(job_id = %receipt.job_id, "job scheduled");

            let deadline = tokio::time::Instant::now() + Duration::from_millis(wait_ms);
            let job = loop {
                match queue.get_job(receipt.job_id.as_str()) {
                    Some(job) if job.status.is_terminal() => break job,
                    _ if tokio::time::Instant::now() >= deadline => {
                        bail!("job {} did not finish within {wait_ms}ms", receipt.job_id)
                    }
                    _ => tokio::time::sleep(Duration::from_millis(10)).await,
                }
            };

            print_json(&job, cli.compact)?;
            queue.shutdown();
        }
    }

    Ok(())
}
