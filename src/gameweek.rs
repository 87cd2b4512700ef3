use crate::fpl_api::Event;

pub const DEFAULT_WINDOW_SIZE: u32 = 6;

/// The trailing run of gameweeks the form tables are built over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameweekWindow {
    pub current: u32,
    pub rounds: Vec<u32>,
}

impl GameweekWindow {
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }
}

/// Latest gameweek that is in progress or done, scanning newest first. 0 when
/// the season has not started.
pub fn current_gameweek(events: &[Event]) -> u32 {
    events
        .iter()
        .rev()
        .find(|e| e.is_current || e.finished)
        .map(|e| e.id)
        .unwrap_or(0)
}

pub fn window_ending_at(current: u32, size: u32) -> GameweekWindow {
    let size = size.max(1);
    let rounds = if current == 0 {
        Vec::new()
    } else {
        let first = current.saturating_sub(size - 1).max(1);
        (first..=current).collect()
    };
    GameweekWindow { current, rounds }
}

pub fn select_window(events: &[Event], size: u32) -> GameweekWindow {
    window_ending_at(current_gameweek(events), size)
}
