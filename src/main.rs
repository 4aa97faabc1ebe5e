// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Result};
use costume_contest::{config, open_database, reset_entries, Config, Contest, SystemClock, UploadStager};
use std::env;
use std::sync::Arc;
use tracing_subscriber::fmt;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("board");

    // The board owns the terminal, so only the plain commands log to it
    if command != "board" {
        fmt()
            .with_env_filter(config::log_filter("warn"))
            .init();
    }

    let config = Config::load()?;

    match command {
        "board" => run_board(&config),
        "results" => run_results(&config),
        "status" => run_status(&config),
        "reset" => run_reset(&config),
        other => {
            eprintln!("Usage: costume-contest [board|results|status|reset]");
            bail!("Unknown command: {}", other)
        }
    }
}

fn open_contest(config: &Config) -> Result<Contest> {
    let conn = open_database(&config.database_path)?;
    let stager = UploadStager::new(&config.upload_dir)?;

    Ok(Contest::new(
        conn,
        config.schedule,
        Arc::new(SystemClock),
        stager,
        config.contest_options(),
    ))
}

fn run_results(config: &Config) -> Result<()> {
    let contest = open_contest(config)?;

    println!("🏆 Costume Contest - Results");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for board in contest.results()? {
        println!("\n{}", board.category);
        if board.entries.is_empty() {
            println!("   (no entries)");
        }
        for (place, entry) in board.entries.iter().enumerate() {
            println!(
                "   {}. {} by {} - {} vote{}",
                place + 1,
                entry.costume_name,
                entry.submitter_name,
                entry.votes,
                if entry.votes == 1 { "" } else { "s" }
            );
        }
    }

    Ok(())
}

fn run_status(config: &Config) -> Result<()> {
    let contest = open_contest(config)?;
    let status = contest.status();

    println!("🎃 Phase: {}", status.phase.as_str());
    println!("   Submissions close: {}", status.submission_end);
    println!("   Voting closes:     {}", status.voting_end);
    println!("   Entries:           {}", contest.entry_count()?);

    Ok(())
}

fn run_reset(config: &Config) -> Result<()> {
    // Operator command: not subject to ALLOW_RESET, which guards the HTTP endpoint
    let conn = open_database(&config.database_path)?;
    let removed = reset_entries(&conn)?;

    println!("🧹 Removed {} entries from {:?}", removed, config.database_path);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_board(config: &Config) -> Result<()> {
    let contest = open_contest(config)?;
    let mut app = ui::App::new(contest);
    ui::run_ui(&mut app)?;

    println!("\n✅ Board closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_board(_config: &Config) -> Result<()> {
    eprintln!("❌ Board not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: costume-contest results");
    std::process::exit(1);
}
