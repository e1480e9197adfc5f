//! The externally shaped leaderboard result.
//!
//! A [`LeaderboardSnapshot`] is the per-competitor, per-column grid that
//! presentation layers render. It is computed once per (time point,
//! request) and shared through the snapshot cache.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::competitor::Competitor;
use crate::error::LeaderboardResult;
use crate::leaderboard::{Engine, LeaderboardEntry, Standings};
use crate::scoring::ScoringScheme;
use crate::time::TimePoint;

/// Parameters of a snapshot query beyond the time point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SnapshotRequest {
    column_names: Option<BTreeSet<String>>,
}

impl SnapshotRequest {
    /// Include every column.
    pub fn all() -> Self {
        Self::default()
    }

    /// Include only the named columns in the grid; totals and ranks still
    /// consider every column.
    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column_names: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    pub fn includes(&self, column: &str) -> bool {
        self.column_names
            .as_ref()
            .map_or(true, |names| names.contains(column))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub name: String,
    pub ordering: Option<u32>,
    /// Name of the bound race, if any.
    pub race: Option<String>,
    pub has_started: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSnapshot {
    pub name: String,
    pub series: String,
    pub is_medal_race: bool,
    pub is_carry_forward: bool,
    pub factor: f64,
    pub is_valid_in_total_score: bool,
    pub fleets: Vec<FleetSnapshot>,
    /// Competitor ids ranked by their result in this column.
    pub competitors_from_best_to_worst: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySnapshot {
    pub column: String,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSnapshot {
    /// 1-based overall rank.
    pub rank: usize,
    pub competitor: Competitor,
    pub display_name: Option<String>,
    pub carried_points: Option<f64>,
    pub total_points: Option<f64>,
    /// One entry per included column, in column order.
    pub entries: Vec<EntrySnapshot>,
}

/// Standings of a leaderboard at one time point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardSnapshot {
    pub name: String,
    pub display_name: Option<String>,
    pub time_point: TimePoint,
    /// Structural version the snapshot was computed from.
    pub version: u64,
    pub scoring_scheme: ScoringScheme,
    pub higher_is_better: bool,
    pub discard_thresholds: Vec<u32>,
    pub columns: Vec<ColumnSnapshot>,
    pub rows: Vec<RowSnapshot>,
    pub score_correction_comment: Option<String>,
    pub last_score_correction: Option<TimePoint>,
}

impl LeaderboardSnapshot {
    /// A snapshot without columns or rows.
    pub fn empty(name: impl Into<String>, time_point: TimePoint, version: u64) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            time_point,
            version,
            scoring_scheme: ScoringScheme::default(),
            higher_is_better: false,
            discard_thresholds: Vec::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            score_correction_comment: None,
            last_score_correction: None,
        }
    }

    pub(crate) fn compute(engine: &Engine<'_>, request: &SnapshotRequest) -> LeaderboardResult<Self> {
        let structure = engine.structure();
        let standings = Standings::all(engine);
        let included: Vec<_> = standings
            .columns()
            .iter()
            .copied()
            .filter(|column| request.includes(column.name()))
            .collect();

        let mut columns = Vec::with_capacity(included.len());
        for &column in &included {
            let series = structure.series_of(column);
            let fleets = series
                .fleets()
                .iter()
                .map(|fleet| {
                    let race = column.tracked_race(fleet.name());
                    FleetSnapshot {
                        name: fleet.name().to_string(),
                        ordering: fleet.ordering(),
                        race: race.map(|race| race.name().to_string()),
                        has_started: race.is_some_and(|race| race.has_started(engine.at())),
                    }
                })
                .collect();
            let ranked = standings
                .column_ranking(column)?
                .into_iter()
                .map(|index| engine.competitors()[index].id().to_string())
                .collect();
            columns.push(ColumnSnapshot {
                name: column.name().to_string(),
                series: series.name().to_string(),
                is_medal_race: column.is_medal_race(),
                is_carry_forward: column.is_carry_forward(),
                factor: structure.factor(column),
                is_valid_in_total_score: engine.is_valid(column),
                fleets,
                competitors_from_best_to_worst: ranked,
            });
        }

        let mut rows = Vec::new();
        for (position, index) in standings.ranking()?.into_iter().enumerate() {
            let competitor = &engine.competitors()[index];
            let mut entries = Vec::with_capacity(included.len());
            for &column in &included {
                entries.push(EntrySnapshot {
                    column: column.name().to_string(),
                    entry: standings.entry(index, column)?,
                });
            }
            rows.push(RowSnapshot {
                rank: position + 1,
                competitor: competitor.clone(),
                display_name: structure.display_name(competitor).map(str::to_string),
                carried_points: structure.carried_points(competitor),
                total_points: standings.total(index)?,
                entries,
            });
        }

        Ok(Self {
            name: structure.name.clone(),
            display_name: structure.display_name.clone(),
            time_point: engine.at(),
            version: structure.version,
            scoring_scheme: structure.scheme,
            higher_is_better: structure.scheme.is_higher_better(),
            discard_thresholds: structure.discarding_rule.thresholds().to_vec(),
            columns,
            rows,
            score_correction_comment: structure.corrections.comment().map(str::to_string),
            last_score_correction: structure.corrections.last_update(),
        })
    }

    /// The row of a competitor, if ranked.
    pub fn row(&self, competitor: &Competitor) -> Option<&RowSnapshot> {
        self.rows.iter().find(|row| &row.competitor == competitor)
    }

    /// Ranked competitors, best first.
    pub fn competitors(&self) -> Vec<&Competitor> {
        self.rows.iter().map(|row| &row.competitor).collect()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_filter() {
        let all = SnapshotRequest::all();
        assert!(all.includes("R1"));

        let some = SnapshotRequest::columns(["R1", "R3"]);
        assert!(some.includes("R3"));
        assert!(!some.includes("R2"));
        assert_ne!(all, some);
    }

    #[test]
    fn test_empty_snapshot_serializes() {
        let snapshot = LeaderboardSnapshot::empty("Empty", TimePoint::from_millis(5), 1);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"name\": \"Empty\""));
        assert!(json.contains("\"scoring_scheme\": \"low_point\""));
    }
}
