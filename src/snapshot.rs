use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ownership::OwnershipMap;
use crate::player_form::PlayerForm;
use crate::team_form::TeamForm;

pub const DEFAULT_SNAPSHOT_PATH: &str = "public/data/snapshot.json";

/// Gameweek assumed by readers of snapshots written before the field existed.
pub const FALLBACK_GAMEWEEK: u32 = 38;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub updated_at: DateTime<Utc>,
    pub teams: Vec<TeamForm>,
    pub players: Vec<PlayerForm>,
    #[serde(default = "fallback_gameweek")]
    pub current_gameweek: u32,
}

fn fallback_gameweek() -> u32 {
    FALLBACK_GAMEWEEK
}

impl Snapshot {
    /// Joins players with ownership (missing figures become `0.0`) and drops
    /// any player whose team is not part of `teams`.
    pub fn assemble(
        teams: Vec<TeamForm>,
        players: Vec<PlayerForm>,
        ownership: &OwnershipMap,
        current_gameweek: u32,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let team_ids: HashSet<u32> = teams.iter().map(|t| t.id).collect();
        let players = players
            .into_iter()
            .filter(|p| {
                let known = team_ids.contains(&p.team_id);
                if !known {
                    warn!(player = p.id, team = p.team_id, "dropping player with unknown team");
                }
                known
            })
            .map(|mut p| {
                p.apply_ownership(ownership.get(&p.id.to_string()));
                p
            })
            .collect();

        Self {
            updated_at,
            teams,
            players,
            current_gameweek,
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now.signed_duration_since(self.updated_at) > max_age
    }

    pub fn team(&self, team_id: u32) -> Option<&TeamForm> {
        self.teams.iter().find(|t| t.id == team_id)
    }
}

/// Replaces whatever is at `path`. Readers never observe a partial file.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("create snapshot dir {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(snapshot).context("serialize snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

/// `Ok(None)` when no snapshot has been written yet.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("read snapshot {}", path.display()));
        }
    };
    let snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("invalid snapshot json in {}", path.display()))?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{FALLBACK_GAMEWEEK, Snapshot};

    #[test]
    fn missing_current_gameweek_falls_back() {
        let raw = r#"{"updatedAt":"2025-11-02T09:30:00Z","teams":[],"players":[]}"#;
        let snapshot: Snapshot = serde_json::from_str(raw).expect("snapshot should parse");
        assert_eq!(snapshot.current_gameweek, FALLBACK_GAMEWEEK);
    }

    #[test]
    fn staleness_uses_generation_time() {
        let updated_at = Utc.with_ymd_and_hms(2025, 11, 2, 9, 30, 0).unwrap();
        let snapshot = Snapshot {
            updated_at,
            teams: Vec::new(),
            players: Vec::new(),
            current_gameweek: 10,
        };
        let later = updated_at + Duration::hours(7);
        assert!(snapshot.is_stale(later, Duration::hours(6)));
        assert!(!snapshot.is_stale(later, Duration::hours(8)));
    }
}
