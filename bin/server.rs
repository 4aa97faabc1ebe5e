// Costume Contest - Web Server
// Serves the contest API and the static front-end

use anyhow::Result;
use costume_contest::{api, config, Config};
use tracing_subscriber::fmt;

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(config::log_filter("info"))
        .init();

    println!("🎃 Costume Contest - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Misconfigured deadlines stop us here, before anything is served
    let config = Config::load()?;

    api::serve(config).await
}
