use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::tracking::TrackedRace;

/// Stable handle to a race column of one leaderboard.
///
/// The handle carries the owning leaderboard's identity, so a handle from
/// another leaderboard is rejected instead of silently addressing a
/// different column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId {
    board: u64,
    index: u32,
}

impl ColumnId {
    pub(crate) fn new(board: u64, index: u32) -> Self {
        Self { board, index }
    }

    pub(crate) fn board(self) -> u64 {
        self.board
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column#{}@{}", self.index, self.board)
    }
}

/// One race slot of a series, e.g. "R3" or "Medal".
///
/// Each fleet of the series can have one tracked race bound to the column.
#[derive(Debug, Clone)]
pub struct RaceColumn {
    id: ColumnId,
    name: String,
    series: usize,
    explicit_factor: Option<f64>,
    is_medal_race: bool,
    is_carry_forward: bool,
    starts_series: bool,
    races: HashMap<String, Arc<dyn TrackedRace>>,
}

impl RaceColumn {
    pub(crate) fn new(
        id: ColumnId,
        name: String,
        series: usize,
        is_medal_race: bool,
        is_carry_forward: bool,
        starts_series: bool,
    ) -> Self {
        Self {
            id,
            name,
            series,
            explicit_factor: None,
            is_medal_race,
            is_carry_forward,
            starts_series,
            races: HashMap::new(),
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the owning series within the leaderboard.
    pub fn series_index(&self) -> usize {
        self.series
    }

    /// The factor set explicitly for this column, if any.
    pub fn explicit_factor(&self) -> Option<f64> {
        self.explicit_factor
    }

    pub fn is_medal_race(&self) -> bool {
        self.is_medal_race
    }

    /// Seeded results from a previous stage; never discarded.
    pub fn is_carry_forward(&self) -> bool {
        self.is_carry_forward
    }

    /// Whether this is the first column of its series.
    pub fn starts_series(&self) -> bool {
        self.starts_series
    }

    /// The race bound for `fleet`, if any.
    pub fn tracked_race(&self, fleet: &str) -> Option<&Arc<dyn TrackedRace>> {
        self.races.get(fleet)
    }

    pub fn has_tracked_races(&self) -> bool {
        !self.races.is_empty()
    }

    /// Bound races keyed by fleet name, in no particular order.
    pub fn tracked_races(&self) -> impl Iterator<Item = (&str, &Arc<dyn TrackedRace>)> {
        self.races.iter().map(|(fleet, race)| (fleet.as_str(), race))
    }

    pub(crate) fn set_explicit_factor(&mut self, factor: Option<f64>) {
        self.explicit_factor = factor;
    }

    pub(crate) fn bind(&mut self, fleet: &str, race: Arc<dyn TrackedRace>) {
        self.races.insert(fleet.to_string(), race);
    }

    pub(crate) fn release(&mut self, fleet: &str) -> Option<Arc<dyn TrackedRace>> {
        self.races.remove(fleet)
    }
}
