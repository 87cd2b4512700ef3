use std::thread;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::SnapshotConfig;
use crate::fetcher::{Fetcher, Transport};
use crate::fixtures::{FixtureIndex, TeamDirectory};
use crate::fpl_api::{
    Bootstrap, BootstrapTeam, Element, LiveEvent, bootstrap_url, element_summary_url,
    fixtures_url, live_url, parse_bootstrap_json, parse_element_summary_json,
    parse_fixtures_json, parse_live_json,
};
use crate::gameweek::{GameweekWindow, select_window};
use crate::ownership::fetch_ownership;
use crate::player_form::{PlayerForm, Position, build_player_form, top_players};
use crate::snapshot::{Snapshot, load_snapshot};
use crate::team_form::{TeamXgTable, aggregate_teams};

pub fn run_pipeline<T: Transport>(cfg: &SnapshotConfig, fetcher: &Fetcher<T>) -> Result<Snapshot> {
    run_pipeline_at(cfg, fetcher, Utc::now())
}

/// One full run. Bootstrap and fixtures are required; live rounds, player
/// histories and ownership degrade to partial data when they fail.
pub fn run_pipeline_at<T: Transport>(
    cfg: &SnapshotConfig,
    fetcher: &Fetcher<T>,
    now: DateTime<Utc>,
) -> Result<Snapshot> {
    info!(mode = ?fetcher.config().mode, "fetching bootstrap");
    let bootstrap = fetcher
        .fetch_with(&bootstrap_url(&cfg.api_base), parse_bootstrap_json)
        .context("bootstrap fetch failed")?;

    info!("fetching fixtures");
    let fixtures = fetcher
        .fetch_with(&fixtures_url(&cfg.api_base), parse_fixtures_json)
        .context("fixtures fetch failed")?;

    let window = select_window(&bootstrap.events, cfg.window_size);
    if window.is_empty() {
        warn!("no gameweek has started, form tables will be empty");
    } else {
        info!(
            current = window.current,
            rounds = window.len(),
            first = window.rounds[0],
            "gameweek window selected"
        );
    }

    let live = fetch_live_rounds(cfg, fetcher, &window);
    let xg = TeamXgTable::accumulate(&bootstrap.elements, live.iter().map(|(gw, l)| (*gw, l)));

    let index = FixtureIndex::finished(&fixtures);
    let directory = TeamDirectory::new(&bootstrap.teams);
    let teams = aggregate_teams(&bootstrap.teams, &window, &index, &xg, &directory);

    let players = collect_player_forms(cfg, fetcher, &bootstrap, &window, &index, &directory);
    let ownership = fetch_ownership(fetcher, &cfg.ownership_url);

    let snapshot = Snapshot::assemble(teams, players, &ownership, window.current, now);
    info!(
        teams = snapshot.teams.len(),
        players = snapshot.players.len(),
        current = snapshot.current_gameweek,
        "snapshot assembled"
    );
    Ok(snapshot)
}

/// Serves the stored snapshot unless it is missing, unreadable or older than
/// `max_age`, in which case a live run is made instead.
pub fn load_or_refresh<T: Transport>(
    cfg: &SnapshotConfig,
    fetcher: &Fetcher<T>,
    max_age: Duration,
) -> Result<Snapshot> {
    match load_snapshot(&cfg.output_path) {
        Ok(Some(stored)) if !stored.is_stale(Utc::now(), max_age) => {
            info!(updated_at = %stored.updated_at, "using stored snapshot");
            return Ok(stored);
        }
        Ok(Some(_)) => info!("stored snapshot is stale, running live"),
        Ok(None) => info!("no stored snapshot, running live"),
        Err(err) => warn!(error = %format!("{err:#}"), "stored snapshot unreadable, running live"),
    }
    run_pipeline(cfg, fetcher)
}

fn fetch_live_rounds<T: Transport>(
    cfg: &SnapshotConfig,
    fetcher: &Fetcher<T>,
    window: &GameweekWindow,
) -> Vec<(u32, LiveEvent)> {
    with_fetch_pool(cfg.parallelism, || {
        window
            .rounds
            .par_iter()
            .filter_map(|&gw| {
                match fetcher.fetch_with(&live_url(&cfg.api_base, gw), parse_live_json) {
                    Ok(live) => Some((gw, live)),
                    Err(err) => {
                        warn!(gameweek = gw, error = %err, "live stats unavailable, gameweek xG left at zero");
                        None
                    }
                }
            })
            .collect()
    })
}

fn collect_player_forms<T: Transport>(
    cfg: &SnapshotConfig,
    fetcher: &Fetcher<T>,
    bootstrap: &Bootstrap,
    window: &GameweekWindow,
    index: &FixtureIndex<'_>,
    directory: &TeamDirectory<'_>,
) -> Vec<PlayerForm> {
    let candidates: Vec<(&Element, Position, &BootstrapTeam)> =
        top_players(&bootstrap.elements, cfg.top_players)
            .into_iter()
            .filter_map(|element| {
                let position = Position::from_element_type(element.element_type)?;
                let Some(team) = directory.get(element.team) else {
                    warn!(player = element.id, team = element.team, "player team missing from bootstrap");
                    return None;
                };
                Some((element, position, team))
            })
            .collect();
    info!(players = candidates.len(), "fetching player histories");

    let mut out = Vec::with_capacity(candidates.len());
    for (batch_no, batch) in candidates.chunks(cfg.batch_size.max(1)).enumerate() {
        if batch_no > 0 && !cfg.batch_pause.is_zero() {
            thread::sleep(cfg.batch_pause);
        }
        let forms: Vec<Option<PlayerForm>> = with_fetch_pool(cfg.parallelism, || {
            batch
                .par_iter()
                .map(|&(element, position, team)| {
                    let url = element_summary_url(&cfg.api_base, element.id);
                    match fetcher.fetch_with(&url, parse_element_summary_json) {
                        Ok(summary) => Some(build_player_form(
                            element, position, team, &summary, window, index, directory,
                        )),
                        Err(err) => {
                            warn!(player = element.id, error = %err, "player history unavailable, dropping player");
                            None
                        }
                    }
                })
                .collect()
        });
        let before = out.len();
        out.extend(forms.into_iter().flatten());
        info!(
            batch = batch_no + 1,
            fetched = out.len() - before,
            requested = batch.len(),
            "player batch done"
        );
    }
    out
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}
