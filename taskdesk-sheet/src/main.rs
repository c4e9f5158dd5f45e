//! Taskdesk sheet service — the authoritative row store.
//!
//! An axum WebSocket server holding the shared task rows. All client
//! mutations go through per-row version checks; the service is the only
//! writer of the `version` column.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:9100
//! cargo run --bin taskdesk-sheet
//!
//! # Run on a custom address with seeded data
//! cargo run --bin taskdesk-sheet -- --bind 127.0.0.1:9100 --seed board.toml
//!
//! # Or via environment variable
//! SHEET_ADDR=127.0.0.1:9100 cargo run --bin taskdesk-sheet
//! ```

use std::sync::Arc;

use clap::Parser;

use taskdesk_sheet::config::{SheetCliArgs, SheetConfig, Workbook};
use taskdesk_sheet::service::{self, SheetState};
use taskdesk_sheet::store::SheetStore;

#[tokio::main]
async fn main() {
    let cli = SheetCliArgs::parse();

    let config = match SheetConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskdesk sheet service");

    let store = SheetStore::new();
    if let Some(path) = &config.seed_path {
        match Workbook::load(path) {
            Ok(workbook) => {
                let (employees, tasks) = workbook.into_seed();
                let employee_count = employees.len();
                let loaded = store.seed(employees, tasks).await;
                tracing::info!(
                    employees = employee_count,
                    tasks = loaded,
                    seed = %path.display(),
                    "workbook loaded"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, seed = %path.display(), "failed to load workbook");
                std::process::exit(1);
            }
        }
    }

    let state = Arc::new(SheetState::with_store(store));
    match service::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "sheet service listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "sheet service task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start sheet service");
            std::process::exit(1);
        }
    }
}
