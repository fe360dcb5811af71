// Venue billing entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database
// 4. Load persisted roster and court colors (best effort)
// 5. Build SessionState
// 6. Run the interactive command loop

use std::collections::HashMap;

use shuttlebill::app;
use shuttlebill::config;
use shuttlebill::db;
use shuttlebill::session::state::SessionState;

use anyhow::Context;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("shuttlebill starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} courts, court fee {}, shuttlecock fee {}",
        config.venue.num_courts, config.venue.court_fee, config.venue.shuttlecock_fee_per_match
    );

    // 3. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Load persisted roster and court colors. Neither is fatal: a fresh
    // session with default players still works.
    let roster = match db.load_roster() {
        Ok(roster) => {
            info!("Loaded {} roster entries", roster.len());
            roster
        }
        Err(e) => {
            warn!("failed to load roster, starting with defaults: {e:#}");
            vec![]
        }
    };
    let court_colors: HashMap<usize, String> = match db.load_court_colors() {
        Ok(colors) => colors.into_iter().collect(),
        Err(e) => {
            warn!("failed to load court colors: {e:#}");
            HashMap::new()
        }
    };

    // 5. Build SessionState
    let state = SessionState::new(&config, roster);
    info!("Session initialized with {} players", state.players.len());

    // 6. Run the interactive command loop (blocking until quit)
    let result = app::run(app::App::new(state, db, config, court_colors));

    info!("shuttlebill shut down cleanly");
    result
}

/// Initialize tracing to log to a file (not the terminal, which is used by
/// the command prompt).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("shuttlebill.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shuttlebill=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
