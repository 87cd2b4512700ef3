use std::collections::HashMap;

use crate::fpl_api::{BootstrapTeam, Fixture};

/// Finished fixtures keyed by (gameweek, team). Each fixture is listed under
/// both of its teams, so a double gameweek shows up as two entries.
#[derive(Debug, Default)]
pub struct FixtureIndex<'a> {
    by_round_team: HashMap<(u32, u32), Vec<&'a Fixture>>,
}

impl<'a> FixtureIndex<'a> {
    pub fn finished(fixtures: &'a [Fixture]) -> Self {
        let mut by_round_team: HashMap<(u32, u32), Vec<&'a Fixture>> = HashMap::new();
        for fixture in fixtures {
            if !fixture.finished {
                continue;
            }
            let Some(gameweek) = fixture.event else {
                continue;
            };
            by_round_team
                .entry((gameweek, fixture.team_h))
                .or_default()
                .push(fixture);
            if fixture.team_a != fixture.team_h {
                by_round_team
                    .entry((gameweek, fixture.team_a))
                    .or_default()
                    .push(fixture);
            }
        }
        Self { by_round_team }
    }

    pub fn for_team(&self, gameweek: u32, team_id: u32) -> &[&'a Fixture] {
        self.by_round_team
            .get(&(gameweek, team_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, gameweek: u32, team_id: u32) -> usize {
        self.for_team(gameweek, team_id).len()
    }
}

/// Team id -> bootstrap team, for opponent labels.
#[derive(Debug, Default)]
pub struct TeamDirectory<'a> {
    by_id: HashMap<u32, &'a BootstrapTeam>,
}

impl<'a> TeamDirectory<'a> {
    pub fn new(teams: &'a [BootstrapTeam]) -> Self {
        Self {
            by_id: teams.iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn get(&self, team_id: u32) -> Option<&'a BootstrapTeam> {
        self.by_id.get(&team_id).copied()
    }

    pub fn short_name(&self, team_id: u32) -> Option<&'a str> {
        self.get(team_id).map(|t| t.short_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::FixtureIndex;
    use crate::fpl_api::Fixture;

    fn fixture(id: u32, event: Option<u32>, home: u32, away: u32, finished: bool) -> Fixture {
        Fixture {
            id,
            event,
            team_h: home,
            team_a: away,
            team_h_score: Some(1),
            team_a_score: Some(0),
            finished,
        }
    }

    #[test]
    fn indexes_finished_fixtures_under_both_teams() {
        let fixtures = vec![
            fixture(1, Some(5), 1, 2, true),
            fixture(2, Some(5), 3, 1, true),
            fixture(3, Some(5), 4, 5, false),
            fixture(4, None, 1, 4, true),
        ];
        let index = FixtureIndex::finished(&fixtures);
        assert_eq!(index.count(5, 1), 2);
        assert_eq!(index.count(5, 2), 1);
        assert_eq!(index.count(5, 3), 1);
        assert_eq!(index.count(5, 4), 0);
        assert_eq!(index.count(6, 1), 0);
    }
}
