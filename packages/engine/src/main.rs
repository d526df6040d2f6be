use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;

use wordcat_engine::config::{Config, RunMode, StoreLocation};
use wordcat_engine::logging;
use wordcat_engine::terminal::{self, RunOutcome};
use wordcat_engine::{
    Catalog, Clock, EngineResult, JsonCatalog, MemoryStore, PracticeController, ProgressStore,
    SessionController, SqliteStore, SystemClock,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let log_guard = logging::init_tracing(&config);

    let code = match run(&config).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "wordcat failed");
            1
        }
    };

    // Stdin is read on a blocking thread that would otherwise hold the runtime open.
    drop(log_guard);
    std::process::exit(code);
}

async fn run(config: &Config) -> EngineResult<()> {
    let algo = config.load_algo_config()?;

    let catalog: Arc<dyn Catalog> = Arc::new(JsonCatalog::from_path(&config.catalog_path)?);
    let store: Arc<dyn ProgressStore> = match &config.store {
        StoreLocation::Memory => {
            tracing::warn!("using in-memory store, progress will not be kept");
            Arc::new(MemoryStore::new())
        }
        StoreLocation::File(path) => Arc::new(SqliteStore::open(path)?),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    let question_time = Duration::from_secs(config.question_seconds);

    let grade_items = catalog.item_count(config.grade)?;
    tracing::info!(
        grade = config.grade,
        items = grade_items,
        mode = ?config.mode,
        seeded = config.seed.is_some(),
        "wordcat starting"
    );

    match config.mode {
        RunMode::Assessment => {
            let mut session =
                SessionController::new(catalog, store, clock, &algo, config.grade, config.seed);
            let outcome = terminal::run_assessment(
                &mut session,
                input,
                &mut out,
                question_time,
                shutdown_signal(),
            )
            .await?;
            match outcome {
                RunOutcome::Completed(record) => {
                    tracing::info!(
                        id = %record.id,
                        score = record.score,
                        total = record.total,
                        "session saved"
                    );
                }
                RunOutcome::Interrupted => {
                    tracing::warn!("assessment interrupted, no record written")
                }
            }
        }
        RunMode::Practice => {
            let mut practice =
                PracticeController::new(catalog, store, clock, &algo, config.grade, config.seed);
            terminal::run_practice(
                &mut practice,
                input,
                &mut out,
                question_time,
                shutdown_signal(),
            )
            .await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
