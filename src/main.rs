use std::process;

use anyhow::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use fpl_snapshot::config::SnapshotConfig;
use fpl_snapshot::fetcher::Fetcher;
use fpl_snapshot::http_client::http_client;
use fpl_snapshot::pipeline::run_pipeline;
use fpl_snapshot::snapshot::{Snapshot, write_snapshot};

fn main() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cfg = SnapshotConfig::from_env();
    let snapshot = match run(&cfg) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            // Nothing is written on failure; the previous snapshot stays in place.
            error!(error = %format!("{err:#}"), "snapshot run failed");
            process::exit(1);
        }
    };

    let blank_players = snapshot
        .players
        .iter()
        .filter(|p| p.last6_matches.iter().all(|m| m.is_blank))
        .count();

    println!("Snapshot complete");
    println!("Path: {}", cfg.output_path.display());
    println!("Updated: {}", snapshot.updated_at.to_rfc3339());
    println!("Current gameweek: {}", snapshot.current_gameweek);
    println!("Teams: {}", snapshot.teams.len());
    println!("Players: {}/{}", snapshot.players.len(), cfg.top_players);
    if blank_players > 0 {
        println!("Players without a fixture in the window: {blank_players}");
    }
}

fn run(cfg: &SnapshotConfig) -> Result<Snapshot> {
    let client = http_client(cfg.request_timeout)?;
    let fetcher = Fetcher::new(client, cfg.fetch.clone());
    let snapshot = run_pipeline(cfg, &fetcher)?;
    write_snapshot(&cfg.output_path, &snapshot)?;
    Ok(snapshot)
}
