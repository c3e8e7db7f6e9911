//! ophiuchus-quest - Musical scavenger-hunt game service
//!
//! Derives a hidden "cosmic song" from a player's listening history and
//! guides them through five puzzle rooms toward guessing it. Progress is
//! persisted per session and archived into a cross-game leaderboard.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use ophiuchus_common::config::QuestConfig;
use ophiuchus_common::db::init_database;
use ophiuchus_quest::services::{
    GeneratorEmotionScorer, HttpContentGenerator, RandomSelector, SpotifyOracle,
};
use ophiuchus_quest::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "ophiuchus-quest", about = "Ophiuchus quest game service")]
struct Args {
    /// Path to config.toml (overrides OPHIUCHUS_CONFIG and defaults)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Ophiuchus Quest (ophiuchus-quest) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();
    let config = QuestConfig::load(args.config.as_deref())?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path).await?;
    info!("✓ Connected to database");

    let generator = Arc::new(HttpContentGenerator::new(&config.generator)?);
    let oracle = Arc::new(SpotifyOracle::new(&config.oracle)?);
    let selector = Arc::new(RandomSelector::default());
    let scorer = Arc::new(GeneratorEmotionScorer::new(generator.clone()));

    let state = AppState::new(pool, generator, oracle, selector, scorer);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("ophiuchus-quest listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
