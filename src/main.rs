use minesweeper::{Difficulty, GameSession, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SessionConfig::from_env();
    info!("Reading leaderboard from {}", config.score_file.display());

    let mut session = GameSession::new(config);
    session.flush_scores().await;

    for difficulty in Difficulty::ALL {
        println!(
            "\n{} LEVEL LEADERBOARD:",
            difficulty.name().to_uppercase()
        );
        for row in session.leaderboard(difficulty) {
            println!("{row}");
        }
    }

    session.terminate().await;
}
