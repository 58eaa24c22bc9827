// Snakecast entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout is for the table)
// 2. Load config
// 3. Open database
// 4. Load candidates and the model
// 5. Build the session and the polling host
// 6. Poll on an interval until Ctrl+C or the draft completes

mod display;
mod host;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use snakecast_core::config;
use snakecast_core::db::Database;
use snakecast_core::model::{DraftModel, LogisticModel};
use snakecast_core::players;
use snakecast_core::session::DraftSession;
use snakecast_core::sources::{CsvEntrySource, CsvSelectionSource};

use host::{Host, TickStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Snakecast starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: draft={}, observer={}, {} rounds",
        config.draft.draft_id, config.draft.observer_entry_id, config.draft.rounds
    );

    // 3. Open database
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Load candidates and the model
    let candidates = players::load_candidates(
        Path::new(&config.data_paths.players),
        config.players.missing_adp,
    )
    .context("failed to load candidates")?;
    let model = LogisticModel::from_config(&config.model);
    info!(
        "Model {} using {} features",
        model.metadata().version_name(),
        model.metadata().features.len()
    );

    // 5. Build the session and host
    let session = DraftSession::new(
        config.draft.clone(),
        config.features.clone(),
        candidates,
        Box::new(model),
    );
    let mut host = Host::new(
        session,
        db,
        Box::new(CsvEntrySource::new(&config.data_paths.entries)),
        Box::new(CsvSelectionSource::new(&config.data_paths.selections)),
    );

    // 6. Poll until Ctrl+C or completion
    let mut interval = tokio::time::interval(Duration::from_secs(config.refresh_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Ctrl+C received, shutting down");
                break;
            }
            _ = interval.tick() => {
                match host.tick() {
                    Ok(TickStatus::Updated) => {
                        if let Some(table) = host.session().table() {
                            println!("{}", display::render_table(table, config.top_n));
                        }
                    }
                    Ok(TickStatus::Finished) => {
                        let board = host.session().final_board()?;
                        println!("Draft complete.\n");
                        println!("{}", display::render_board(&board, host.session().candidates()));
                        break;
                    }
                    Ok(TickStatus::Waiting) | Ok(TickStatus::Idle) => {}
                    Err(e) => {
                        error!("Polling failed: {:#}", e);
                        return Err(e);
                    }
                }
            }
        }
    }

    info!("Snakecast shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file, keeping stdout for the table.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("snakecast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snakecast=info,snakecast_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
