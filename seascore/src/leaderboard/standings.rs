//! Totals, discards and the ranking cascade over a set of columns.
//!
//! A `Standings` view looks at a prefix (or filtered subset) of the
//! leaderboard's columns through an [`Engine`]. Cells come from the engine's
//! memo, so views over different prefixes share the per-column work.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::LeaderboardResult;
use crate::leaderboard::engine::Engine;
use crate::leaderboard::entry::LeaderboardEntry;
use crate::model::{ColumnId, RaceColumn};
use crate::scoring::WINS_TO_CLOSE_MEDAL_STAGE;

/// Everything the ranking comparator needs for one competitor.
#[derive(Debug)]
struct RankingKey {
    index: usize,
    /// Latest medal series the competitor has a score in.
    medal_stage: Option<usize>,
    /// (column position, fleet ordering) where the competitor sailed an ordered fleet.
    fleet_orderings: Vec<(usize, u32)>,
    /// Results in unordered-group columns that do not count yet.
    pending_group_races: usize,
    total: Option<f64>,
    /// Non-discarded net points of valid columns, best first.
    best_scores: Vec<f64>,
    /// (series index, column total ignoring discards), in race order.
    last_scores: Vec<(usize, f64)>,
}

pub(crate) struct Standings<'e, 's> {
    engine: &'e Engine<'s>,
    columns: Vec<&'s RaceColumn>,
    discards: RefCell<HashMap<usize, Rc<HashSet<ColumnId>>>>,
    /// Win-count medal series index to the column position closing each fleet's stage.
    stage_ends: RefCell<HashMap<usize, Rc<StageEnds>>>,
}

/// Keyed by fleet index; `None` closes the stage for every fleet.
type StageEnds = HashMap<Option<usize>, usize>;

impl<'e, 's> Standings<'e, 's> {
    pub(crate) fn new(engine: &'e Engine<'s>, columns: Vec<&'s RaceColumn>) -> Self {
        Self {
            engine,
            columns,
            discards: RefCell::new(HashMap::new()),
            stage_ends: RefCell::new(HashMap::new()),
        }
    }

    /// Standings over every column of the leaderboard.
    pub(crate) fn all(engine: &'e Engine<'s>) -> Self {
        Self::new(engine, engine.structure().ordered_columns().collect())
    }

    pub(crate) fn engine(&self) -> &'e Engine<'s> {
        self.engine
    }

    pub(crate) fn columns(&self) -> &[&'s RaceColumn] {
        &self.columns
    }

    /// Columns dropped for the competitor by the discarding rule.
    pub(crate) fn discarded(&self, competitor: usize) -> LeaderboardResult<Rc<HashSet<ColumnId>>> {
        if let Some(found) = self.discards.borrow().get(&competitor) {
            return Ok(Rc::clone(found));
        }
        let discarded = Rc::new(self.compute_discards(competitor)?);
        self.discards
            .borrow_mut()
            .insert(competitor, Rc::clone(&discarded));
        Ok(discarded)
    }

    fn compute_discards(&self, competitor: usize) -> LeaderboardResult<HashSet<ColumnId>> {
        let structure = self.engine.structure();
        let scheme = structure.scheme;

        let mut counted = 0;
        let mut pool = Vec::new();
        for &column in &self.columns {
            if column.is_carry_forward() {
                continue;
            }
            let cell = self.engine.cell(competitor, column)?;
            let took_part = cell.raced || cell.corrected;
            if took_part && self.engine.is_valid(column) {
                counted += 1;
            }
            let discardable = cell.reason.map_or(true, |reason| reason.is_discardable());
            if let Some(net) = cell.net_points {
                if took_part && discardable && !column.is_medal_race() {
                    pool.push((column.id(), self.engine.factor(column) * net));
                }
            }
        }

        let allowed = structure.discarding_rule.number_of_discards(counted);
        if allowed == 0 || pool.is_empty() {
            return Ok(HashSet::new());
        }

        pool.sort_by(|a, b| scheme.compare_scores(Some(a.1), Some(b.1), true));
        Ok(pool
            .iter()
            .rev()
            .take(allowed)
            .map(|(column, _)| *column)
            .collect())
    }

    pub(crate) fn is_discarded(&self, competitor: usize, column: &RaceColumn) -> LeaderboardResult<bool> {
        Ok(self.discarded(competitor)?.contains(&column.id()))
    }

    /// Factor-scaled points of one column, 0 when discarded.
    pub(crate) fn column_total(
        &self,
        competitor: usize,
        column: &'s RaceColumn,
    ) -> LeaderboardResult<Option<f64>> {
        let cell = self.engine.cell(competitor, column)?;
        let Some(net) = cell.net_points else {
            return Ok(None);
        };
        if self.is_discarded(competitor, column)? {
            return Ok(Some(0.0));
        }
        Ok(Some(self.engine.factor(column) * net))
    }

    /// What a column adds to the running total.
    fn contribution(&self, competitor: usize, column: &'s RaceColumn) -> LeaderboardResult<Option<f64>> {
        let scheme = self.engine.structure().scheme;
        if !(scheme.counts_wins() && column.is_medal_race()) {
            return self.column_total(competitor, column);
        }
        self.win_value(competitor, column)
    }

    /// Wins a win-count medal column adds; carry-forward columns bring their wins in.
    fn win_value(&self, competitor: usize, column: &'s RaceColumn) -> LeaderboardResult<Option<f64>> {
        let scheme = self.engine.structure().scheme;
        let cell = self.engine.cell(competitor, column)?;
        Ok(cell.net_points.map(|net| {
            if column.is_carry_forward() {
                net
            } else if let Some(rank) = cell.scored_rank {
                scheme.points_for_rank(rank, cell.fleet_size, true)
            } else if (net - 1.0).abs() < f64::EPSILON {
                1.0
            } else {
                0.0
            }
        }))
    }

    /// Where each fleet's stage of a win-count medal series closed: the
    /// column in which a competitor of that fleet first reached the winning
    /// count.
    fn stage_ends(&self, series_index: usize) -> LeaderboardResult<Rc<StageEnds>> {
        if let Some(found) = self.stage_ends.borrow().get(&series_index) {
            return Ok(Rc::clone(found));
        }
        let needed = f64::from(WINS_TO_CLOSE_MEDAL_STAGE);
        let mut wins: HashMap<usize, f64> = HashMap::new();
        let mut ends = StageEnds::new();

        for (position, &column) in self.columns.iter().enumerate() {
            if column.series_index() != series_index
                || !column.is_medal_race()
                || !self.engine.is_valid(column)
            {
                continue;
            }
            for competitor in 0..self.engine.competitors().len() {
                let Some(value) = self.win_value(competitor, column)? else {
                    continue;
                };
                let fleet = self.engine.cell(competitor, column)?.fleet;
                if closing(&ends, fleet).is_some_and(|end| end < position) {
                    continue;
                }
                let total = wins.entry(competitor).or_insert(0.0);
                *total += value;
                if *total >= needed {
                    ends.entry(fleet).or_insert(position);
                }
            }
        }

        let ends = Rc::new(ends);
        self.stage_ends
            .borrow_mut()
            .insert(series_index, Rc::clone(&ends));
        Ok(ends)
    }

    /// Whether the competitor's win-count medal stage closed before the
    /// column at `position`; such columns no longer count.
    fn after_stage_end(&self, competitor: usize, position: usize, column: &'s RaceColumn) -> LeaderboardResult<bool> {
        if !(self.engine.structure().scheme.counts_wins() && column.is_medal_race()) {
            return Ok(false);
        }
        let ends = self.stage_ends(column.series_index())?;
        let fleet = self.engine.cell(competitor, column)?.fleet;
        Ok(closing(&ends, fleet).is_some_and(|end| end < position))
    }

    /// Carried points plus every counting column, `None` while nothing counts.
    pub(crate) fn total(&self, competitor: usize) -> LeaderboardResult<Option<f64>> {
        let structure = self.engine.structure();
        let carried = structure.carried_points(&self.engine.competitors()[competitor]);
        let mut total = carried;
        let mut reset_pending = false;

        for (position, &column) in self.columns.iter().enumerate() {
            let series = structure.series_of(column);
            if series.starts_with_zero_score() && column.starts_series() {
                reset_pending = true;
            }
            if !self.engine.is_valid(column) || self.after_stage_end(competitor, position, column)? {
                continue;
            }
            if let Some(points) = self.contribution(competitor, column)? {
                let running = if reset_pending { 0.0 } else { total.unwrap_or(0.0) };
                reset_pending = false;
                total = Some(running + points);
            }
        }
        Ok(total)
    }

    pub(crate) fn entry(&self, competitor: usize, column: &'s RaceColumn) -> LeaderboardResult<LeaderboardEntry> {
        let cell = self.engine.cell(competitor, column)?;
        let fleet = cell.fleet.map(|index| {
            self.engine.structure().series_of(column).fleets()[index]
                .name()
                .to_string()
        });
        Ok(LeaderboardEntry {
            tracked_rank: cell.tracked_rank,
            net_points: cell.net_points,
            is_net_points_corrected: cell.corrected,
            total_points: self.column_total(competitor, column)?,
            max_points_reason: cell.reason,
            is_discarded: self.is_discarded(competitor, column)?,
            fleet,
        })
    }

    fn ranking_key(&self, competitor: usize) -> LeaderboardResult<RankingKey> {
        let structure = self.engine.structure();
        let scheme = structure.scheme;
        let mut key = RankingKey {
            index: competitor,
            medal_stage: None,
            fleet_orderings: Vec::new(),
            pending_group_races: 0,
            total: self.total(competitor)?,
            best_scores: Vec::new(),
            last_scores: Vec::new(),
        };

        for (position, &column) in self.columns.iter().enumerate() {
            let cell = self.engine.cell(competitor, column)?;
            let series = structure.series_of(column);

            if let Some(fleet) = cell.fleet.map(|index| &series.fleets()[index]) {
                if let (true, Some(ordering)) = (series.fleets().len() > 1, fleet.ordering()) {
                    key.fleet_orderings.push((position, ordering));
                }
            }

            let Some(net) = cell.net_points else {
                continue;
            };
            if column.is_medal_race() {
                key.medal_stage = key.medal_stage.max(Some(column.series_index()));
            }
            if !self.engine.is_valid(column) {
                if series.is_unordered_group() {
                    key.pending_group_races += 1;
                }
                continue;
            }
            if self.after_stage_end(competitor, position, column)? {
                continue;
            }
            key.last_scores
                .push((column.series_index(), self.engine.factor(column) * net));
            if !self.is_discarded(competitor, column)? {
                key.best_scores.push(net);
            }
        }

        key.best_scores
            .sort_by(|a, b| scheme.compare_scores(Some(*a), Some(*b), false));
        Ok(key)
    }

    /// Ranked competitor indices, best first.
    ///
    /// The win-count scheme breaks remaining ties with the ranking over the
    /// opening (non-medal) columns.
    pub(crate) fn ranking(&self) -> LeaderboardResult<Vec<usize>> {
        let scheme = self.engine.structure().scheme;
        let has_medal = self.columns.iter().any(|column| column.is_medal_race());
        let reference = if scheme.counts_wins() && has_medal {
            let opening = self
                .columns
                .iter()
                .copied()
                .filter(|column| !column.is_medal_race())
                .collect();
            let order = Standings::new(self.engine, opening).sorted(None)?;
            Some(
                order
                    .into_iter()
                    .enumerate()
                    .map(|(position, competitor)| (competitor, position))
                    .collect::<HashMap<_, _>>(),
            )
        } else {
            None
        };
        self.sorted(reference.as_ref())
    }

    fn sorted(&self, reference: Option<&HashMap<usize, usize>>) -> LeaderboardResult<Vec<usize>> {
        let keys = self
            .engine
            .ranked_competitors()
            .into_iter()
            .map(|competitor| self.ranking_key(competitor))
            .collect::<LeaderboardResult<Vec<_>>>()?;
        let mut order: Vec<&RankingKey> = keys.iter().collect();
        order.sort_by(|a, b| self.compare(a, b, reference));
        Ok(order.into_iter().map(|key| key.index).collect())
    }

    fn compare(
        &self,
        a: &RankingKey,
        b: &RankingKey,
        reference: Option<&HashMap<usize, usize>>,
    ) -> Ordering {
        let scheme = self.engine.structure().scheme;
        let win_stage = scheme.counts_wins() && a.medal_stage.is_some();

        b.medal_stage
            .cmp(&a.medal_stage)
            .then_with(|| compare_fleets(a, b))
            .then_with(|| {
                if win_stage {
                    b.total.unwrap_or(0.0).total_cmp(&a.total.unwrap_or(0.0))
                } else {
                    scheme.compare_scores(a.total, b.total, false)
                }
            })
            .then_with(|| {
                if scheme.compares_number_of_races() {
                    b.pending_group_races.cmp(&a.pending_group_races)
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| {
                if win_stage || !scheme.uses_best_score_tie_break() {
                    Ordering::Equal
                } else {
                    self.compare_sequences(a.best_scores.iter(), b.best_scores.iter())
                }
            })
            .then_with(|| {
                let stage = a.medal_stage.filter(|_| win_stage);
                let last = |key: &'_ RankingKey| -> Vec<f64> {
                    key.last_scores
                        .iter()
                        .filter(|(series, _)| stage.map_or(true, |stage| *series == stage))
                        .map(|(_, points)| *points)
                        .collect()
                };
                let (a_last, b_last) = (last(a), last(b));
                if win_stage {
                    // Only the last race of the stage counts; the opening series decides the rest.
                    self.compare_sequences(a_last.last().into_iter(), b_last.last().into_iter())
                } else {
                    self.compare_sequences(a_last.iter().rev(), b_last.iter().rev())
                }
            })
            .then_with(|| match reference {
                Some(reference) => reference.get(&a.index).cmp(&reference.get(&b.index)),
                None => Ordering::Equal,
            })
    }

    /// Pairwise comparison; when one runs out first, the longer one is better.
    fn compare_sequences<'a>(
        &self,
        a: impl Iterator<Item = &'a f64>,
        b: impl Iterator<Item = &'a f64>,
    ) -> Ordering {
        let scheme = self.engine.structure().scheme;
        let (mut a, mut b) = (a, b);
        loop {
            match (a.next(), b.next()) {
                (Some(x), Some(y)) => {
                    let ordering = scheme.compare_scores(Some(*x), Some(*y), false);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => return Ordering::Equal,
            }
        }
    }

    /// Competitors ranked by their result in one column.
    ///
    /// Better ordered fleets come first; within a fleet (or across unordered
    /// fleets) the column total decides, unscored competitors last.
    pub(crate) fn column_ranking(&self, column: &'s RaceColumn) -> LeaderboardResult<Vec<usize>> {
        let structure = self.engine.structure();
        let scheme = structure.scheme;
        let fleets = structure.series_of(column).fleets();

        let mut rows = Vec::new();
        for competitor in self.engine.ranked_competitors() {
            let cell = self.engine.cell(competitor, column)?;
            let ordering = cell.fleet.and_then(|index| fleets[index].ordering());
            let points = cell.net_points.map(|net| self.engine.factor(column) * net);
            rows.push((competitor, ordering, points));
        }

        rows.sort_by(|a, b| {
            let by_fleet = match (a.1, b.1) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => Ordering::Equal,
            };
            by_fleet.then_with(|| scheme.compare_scores(a.2, b.2, false))
        });
        Ok(rows.into_iter().map(|(competitor, _, _)| competitor).collect())
    }
}

/// The earliest stage end that applies to a competitor of `fleet`.
fn closing(ends: &StageEnds, fleet: Option<usize>) -> Option<usize> {
    match fleet {
        Some(fleet) => match (ends.get(&Some(fleet)), ends.get(&None)) {
            (Some(own), Some(all)) => Some(*own.min(all)),
            (own, all) => own.or(all).copied(),
        },
        None => ends.values().min().copied(),
    }
}

/// In the latest column where both sailed ordered fleets of different rank,
/// the better fleet wins.
fn compare_fleets(a: &RankingKey, b: &RankingKey) -> Ordering {
    for (position, a_ordering) in a.fleet_orderings.iter().rev() {
        let b_ordering = b
            .fleet_orderings
            .binary_search_by_key(position, |(p, _)| *p)
            .ok()
            .map(|found| b.fleet_orderings[found].1);
        if let Some(b_ordering) = b_ordering {
            if b_ordering != *a_ordering {
                return a_ordering.cmp(&b_ordering);
            }
        }
    }
    Ordering::Equal
}
