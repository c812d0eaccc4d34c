use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eventlog_seed::{BulkLoader, SeedGenerator, SeedPlan};
use eventlog_store::{DatabaseConfig, EventStore};

#[derive(Parser)]
#[command(name = "eventlog-seed", about = "Bulk-load synthetic events into event_logs")]
struct Cli {
    /// Target year
    #[arg(long, default_value_t = 2025)]
    year: i32,

    /// Target months (comma separated)
    #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 3, 4])]
    months: Vec<u32>,

    /// Records generated per month
    #[arg(long, default_value_t = 1_000_000)]
    per_month: usize,

    /// Records per insert statement
    #[arg(long, default_value_t = 1_000)]
    batch_size: usize,

    /// Fix the random seed for a reproducible dataset
    #[arg(long, env = "SEED")]
    seed: Option<u64>,

    /// Do not run migrations before loading
    #[arg(long)]
    skip_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let cli = Cli::parse();
    let plan = SeedPlan {
        year: cli.year,
        months: cli.months,
        records_per_month: cli.per_month,
        batch_size: cli.batch_size,
    };
    plan.validate().context("Invalid seed plan")?;

    let config = DatabaseConfig::from_env().context("Database configuration")?;
    config.log_redacted();

    let pool = config
        .connect()
        .await
        .context("Failed to connect to Postgres")?;
    let store = EventStore::new(pool);

    if !cli.skip_migrate {
        if let Err(e) = store.migrate().await {
            store.pool().close().await;
            return Err(e).context("Failed to run migrations");
        }
    }

    let mut generator = match cli.seed {
        Some(seed) => {
            info!(seed, "Using fixed seed");
            SeedGenerator::seeded(seed)
        }
        None => SeedGenerator::from_entropy(),
    };

    // The loader owns the pool from here and closes it when the run ends.
    let report = BulkLoader::new(store)
        .run(&mut generator, &plan)
        .await?;

    println!("{report}");
    Ok(())
}
