use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ride_duration::config::{target_buckets, Config};
use ride_duration::model::ModelArtifact;
use ride_duration::pipeline::Pipeline;
use ride_duration::storage::StorageRouter;
use ride_duration::types::Period;
use ride_duration::{fixtures, logging, metrics};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "ride_duration")]
#[command(about = "Scores FHV trip durations with a pre-trained model")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PeriodArgs {
    /// Year of the trip data
    #[arg(long, env = "YEAR")]
    year: i32,
    /// Month of the trip data (1-12)
    #[arg(long, env = "MONTH")]
    month: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Read, score and write predictions for one month
    Run {
        #[command(flatten)]
        period: PeriodArgs,
        /// Write the fixture trips to the input path first (only with INPUT_FILE_PATTERN set)
        #[arg(long)]
        seed: bool,
        /// Do not try to create the target S3 bucket
        #[arg(long)]
        skip_bucket: bool,
    },
    /// Write the fixture trips to the input path
    Seed {
        #[command(flatten)]
        period: PeriodArgs,
    },
}

fn load_config(args: &PeriodArgs) -> Result<Config> {
    let period = Period::new(args.year, args.month)?;
    Ok(Config::from_env(period)?)
}

async fn run(args: &PeriodArgs, seed: bool, skip_bucket: bool) -> Result<()> {
    let config = load_config(args)?;
    let handle = metrics::init_metrics();
    let store = StorageRouter::new(config.s3_store());
    let job = config.job()?;

    let seeding = seed && config.input_pattern_overridden;
    if !skip_bucket {
        for bucket in target_buckets(&job, seeding) {
            store
                .s3()
                .ensure_bucket(&bucket)
                .await
                .with_context(|| format!("failed to create bucket '{}'", bucket))?;
        }
    }

    if seeding {
        fixtures::seed(&store, &job.input).await.context("failed to seed fixture input")?;
    } else if seed {
        warn!("--seed ignored: INPUT_FILE_PATTERN is not set");
    }

    let model = ModelArtifact::load(&config.model_path)
        .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;

    let summary = Pipeline::new(&store, &model)
        .with_unseen_policy(config.unseen_categories)
        .run(&job)
        .await
        .with_context(|| format!("pipeline failed for {}", job.period))?;

    info!(
        rows_read = summary.rows_read,
        rows_scored = summary.rows_scored,
        output = %summary.output,
        "Run finished"
    );
    println!("predicted sum of duration: {}", summary.predicted_duration_sum);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let (Some(url), Some(handle)) = (&config.pushgateway_url, &handle) {
        metrics::push_to_gateway(url, &summary.period, handle).await;
    }
    Ok(())
}

async fn seed_input(args: &PeriodArgs) -> Result<()> {
    let config = load_config(args)?;
    let store = StorageRouter::new(config.s3_store());
    let input = config.input_location()?;
    fixtures::seed(&store, &input).await.context("failed to seed fixture input")?;
    println!("Seeded fixture trips to {}", input);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { period, seed, skip_bucket } => run(&period, seed, skip_bucket).await,
        Commands::Seed { period } => seed_input(&period).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
