//! The leaderboard: race columns, bound races, corrections and the queries
//! that turn them into scores and rankings.
//!
//! # Concurrency
//!
//! The structural state lives in an `Arc<Structure>` behind a
//! `parking_lot::RwLock`. Writers clone it, apply their change, bump the
//! version and swap it in; readers grab the current `Arc` and compute
//! without holding any lock. Listeners are notified after the write lock is
//! released, so a listener may call back into the leaderboard.
//!
//! # Caching
//!
//! [`Leaderboard::get_leaderboard_snapshot`] results are cached per time
//! point and request, stamped with the structural version. Repeating a query
//! without an intervening mutation returns the same `Arc`.

mod engine;
mod entry;
mod listener;
mod standings;
mod structure;

pub use entry::LeaderboardEntry;
pub use listener::{LeaderboardChange, LeaderboardListener};

pub(crate) use engine::Engine;
pub(crate) use standings::Standings;

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::cache::{CacheStats, SnapshotCache, SnapshotKey};
use crate::competitor::Competitor;
use crate::config::LeaderboardConfig;
use crate::error::{LeaderboardError, LeaderboardResult};
use crate::model::{ColumnId, Fleet, RaceColumn, Regatta, Series, SeriesDefinition};
use crate::scoring::{ScoringScheme, ThresholdDiscardingRule};
use crate::snapshot::{LeaderboardSnapshot, SnapshotRequest};
use crate::time::TimePoint;
use crate::tracking::TrackedRace;

use structure::Structure;

/// Name of the implicit series of a flexible leaderboard.
pub const DEFAULT_SERIES_NAME: &str = "Default";

/// A regatta (or flexible) leaderboard.
pub struct Leaderboard {
    state: RwLock<Arc<Structure>>,
    cache: SnapshotCache,
    listeners: Mutex<Vec<Weak<dyn LeaderboardListener>>>,
}

impl std::fmt::Debug for Leaderboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Leaderboard")
            .field("name", &state.name)
            .field("version", &state.version)
            .field("columns", &state.columns.len())
            .finish()
    }
}

impl Leaderboard {
    fn from_structure(structure: Structure, config: &LeaderboardConfig) -> Self {
        Self {
            state: RwLock::new(Arc::new(structure)),
            cache: SnapshotCache::new(config.snapshot_cache_capacity),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Create a leaderboard for a regatta, with every declared series and
    /// race column.
    pub fn for_regatta(regatta: &Regatta, config: &LeaderboardConfig) -> LeaderboardResult<Self> {
        let mut structure = Structure::new(
            regatta.name().to_string(),
            regatta.scoring_scheme(),
            regatta.discarding_rule().clone(),
            config.medal_race_factor,
        );
        structure.boat_class = regatta.boat_class().cloned();
        for series in regatta.series() {
            structure.add_series(series)?;
        }
        tracing::info!(
            leaderboard = regatta.name(),
            scheme = %regatta.scoring_scheme(),
            columns = structure.columns.len(),
            "created regatta leaderboard"
        );
        Ok(Self::from_structure(structure, config))
    }

    /// Create a leaderboard without a regatta.
    ///
    /// It has a single implicit series; races added with an unknown fleet
    /// name create that fleet.
    pub fn flexible(
        name: impl Into<String>,
        scheme: ScoringScheme,
        discarding_rule: ThresholdDiscardingRule,
        config: &LeaderboardConfig,
    ) -> LeaderboardResult<Self> {
        let name = name.into();
        let mut structure = Structure::new(name.clone(), scheme, discarding_rule, config.medal_race_factor);
        structure.is_flexible = true;
        structure.add_series(&SeriesDefinition::new(DEFAULT_SERIES_NAME).with_fleet(Fleet::default_fleet()))?;
        tracing::info!(leaderboard = %name, scheme = %scheme, "created flexible leaderboard");
        Ok(Self::from_structure(structure, config))
    }

    fn current(&self) -> Arc<Structure> {
        Arc::clone(&self.state.read())
    }

    /// Apply a change to a private copy of the structure and publish it.
    ///
    /// Nothing is published when `apply` fails or reports no change.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Structure) -> LeaderboardResult<(T, Option<LeaderboardChange>)>,
    ) -> LeaderboardResult<T> {
        let (value, notification) = {
            let mut state = self.state.write();
            let mut next = Structure::clone(&state);
            let (value, change) = apply(&mut next)?;
            match change {
                Some(change) => {
                    next.version += 1;
                    let name = next.name.clone();
                    *state = Arc::new(next);
                    self.cache.invalidate_all();
                    (value, Some((name, change)))
                }
                None => (value, None),
            }
        };
        if let Some((name, change)) = notification {
            self.notify(&name, &change);
        }
        Ok(value)
    }

    /// [`Self::mutate`] for changes that cannot fail.
    fn update(&self, apply: impl FnOnce(&mut Structure) -> Option<LeaderboardChange>) {
        if let Err(error) = self.mutate(|s| Ok(((), apply(s)))) {
            tracing::warn!(%error, "structural update failed");
        }
    }

    fn notify(&self, name: &str, change: &LeaderboardChange) {
        let listeners: Vec<Arc<dyn LeaderboardListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|listener| listener.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        tracing::trace!(leaderboard = name, ?change, listeners = listeners.len(), "notifying");
        for listener in listeners {
            listener.leaderboard_changed(name, change);
        }
    }

    /// Register a listener for structural changes. Dropped listeners are
    /// pruned on the next notification.
    pub fn add_listener(&self, listener: Weak<dyn LeaderboardListener>) {
        self.listeners.lock().push(listener);
    }

    // -- structure --------------------------------------------------------

    pub fn name(&self) -> String {
        self.state.read().name.clone()
    }

    pub fn display_name(&self) -> Option<String> {
        self.state.read().display_name.clone()
    }

    pub fn set_display_name(&self, display_name: Option<String>) {
        self.update(|s| {
            s.display_name = display_name;
            Some(LeaderboardChange::DisplayNameChanged)
        });
    }

    pub fn scoring_scheme(&self) -> ScoringScheme {
        self.state.read().scheme
    }

    pub fn discarding_rule(&self) -> ThresholdDiscardingRule {
        self.state.read().discarding_rule.clone()
    }

    pub fn set_discarding_rule(&self, rule: ThresholdDiscardingRule) {
        tracing::info!(thresholds = ?rule.thresholds(), "discarding rule changed");
        self.update(|s| {
            s.discarding_rule = rule;
            Some(LeaderboardChange::DiscardingRuleChanged)
        });
    }

    /// Structural version; changes whenever results may change.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    pub fn is_flexible(&self) -> bool {
        self.state.read().is_flexible
    }

    pub fn series(&self) -> Vec<Series> {
        self.state.read().series.clone()
    }

    /// Race columns in race order.
    pub fn race_columns(&self) -> Vec<RaceColumn> {
        self.state.read().ordered_columns().cloned().collect()
    }

    pub fn race_column_by_name(&self, name: &str) -> Option<RaceColumn> {
        self.state.read().column_by_name(name).cloned()
    }

    pub fn race_column(&self, id: ColumnId) -> LeaderboardResult<RaceColumn> {
        self.state.read().column(id).cloned()
    }

    /// Add a race column to the end of a series.
    ///
    /// Fleets not yet known to the series are added to it.
    pub fn add_race_column(
        &self,
        series: &str,
        name: &str,
        is_medal_race: bool,
        fleets: &[Fleet],
    ) -> LeaderboardResult<RaceColumn> {
        let column = self.mutate(|s| {
            let index = s.series_index(series)?;
            for fleet in fleets {
                if s.series[index].fleet(fleet.name()).is_none() {
                    s.series[index].add_fleet(fleet.clone());
                }
            }
            let id = s.add_column(index, name, is_medal_race)?;
            let column = s.column(id)?.clone();
            Ok((column, Some(LeaderboardChange::RaceColumnAdded { column: name.to_string() })))
        })?;
        tracing::info!(series, column = name, is_medal_race, "race column added");
        Ok(column)
    }

    /// Bind a race to a column, creating the column in the last series when
    /// it does not exist yet.
    ///
    /// For an existing column `is_medal_race` is ignored; the column keeps
    /// its own flag.
    pub fn add_race(
        &self,
        race: Arc<dyn TrackedRace>,
        column_name: &str,
        is_medal_race: bool,
        fleet: Option<&str>,
    ) -> LeaderboardResult<RaceColumn> {
        self.mutate(|s| {
            let (id, created) = match s.column_by_name(column_name) {
                Some(existing) => {
                    if existing.is_medal_race() != is_medal_race {
                        tracing::debug!(
                            column = column_name,
                            requested = is_medal_race,
                            kept = existing.is_medal_race(),
                            "ignoring medal flag for existing column"
                        );
                    }
                    (existing.id(), false)
                }
                None => {
                    let last = s
                        .series
                        .len()
                        .checked_sub(1)
                        .ok_or_else(|| LeaderboardError::UnknownSeries(DEFAULT_SERIES_NAME.to_string()))?;
                    (s.add_column(last, column_name, is_medal_race)?, true)
                }
            };
            let bound = bind(s, id, fleet, race)?;
            let column = s.column(id)?.clone();
            let change = match bound {
                Some(fleet) => Some(LeaderboardChange::TrackedRaceLinked {
                    column: column_name.to_string(),
                    fleet,
                }),
                None if created => Some(LeaderboardChange::RaceColumnAdded {
                    column: column_name.to_string(),
                }),
                None => None,
            };
            Ok((column, change))
        })
    }

    /// Bind a race to a column's fleet (`None` for the series' first fleet).
    ///
    /// Binding the race that is already bound is a no-op.
    ///
    /// # Errors
    ///
    /// [`LeaderboardError::RaceAlreadyBound`] when another race occupies the
    /// slot; release it first.
    pub fn set_tracked_race(
        &self,
        column: ColumnId,
        fleet: Option<&str>,
        race: Arc<dyn TrackedRace>,
    ) -> LeaderboardResult<()> {
        self.mutate(|s| {
            let name = s.column(column)?.name().to_string();
            let change = bind(s, column, fleet, race)?
                .map(|fleet| LeaderboardChange::TrackedRaceLinked { column: name, fleet });
            Ok(((), change))
        })
    }

    /// Unbind the race of a column's fleet, returning it.
    pub fn release_tracked_race(
        &self,
        column: ColumnId,
        fleet: Option<&str>,
    ) -> LeaderboardResult<Option<Arc<dyn TrackedRace>>> {
        self.mutate(|s| {
            let (fleet, _) = s.resolve_fleet(s.column(column)?, fleet)?;
            let target = s.column_mut(column)?;
            let released = target.release(&fleet);
            let change = released.as_ref().map(|_| {
                tracing::info!(column = target.name(), fleet = %fleet, "tracked race released");
                LeaderboardChange::TrackedRaceUnlinked {
                    column: target.name().to_string(),
                    fleet,
                }
            });
            Ok((released, change))
        })
    }

    /// Override the factor of a column; `None` restores the scheme default.
    pub fn set_column_factor(&self, column: ColumnId, factor: Option<f64>) -> LeaderboardResult<()> {
        if let Some(value) = factor {
            if !value.is_finite() || value <= 0.0 {
                return Err(LeaderboardError::InvalidFactor(value));
            }
        }
        self.mutate(|s| {
            let target = s.column_mut(column)?;
            target.set_explicit_factor(factor);
            let change = LeaderboardChange::FactorChanged {
                column: target.name().to_string(),
            };
            Ok(((), Some(change)))
        })
    }

    pub fn column_factor(&self, column: ColumnId) -> LeaderboardResult<f64> {
        let state = self.state.read();
        let column = state.column(column)?;
        Ok(state.factor(column))
    }

    // -- competitors ------------------------------------------------------

    /// Every known competitor, in order of first appearance.
    pub fn competitors(&self) -> Vec<Competitor> {
        self.current().all_competitors()
    }

    /// Register a competitor that is not (yet) in any bound race.
    pub fn add_competitor(&self, competitor: Competitor) {
        self.update(|s| {
            if s.all_competitors().contains(&competitor) {
                return None;
            }
            let change = LeaderboardChange::CompetitorAdded {
                competitor: competitor.id().to_string(),
            };
            s.registered.push(competitor);
            Some(change)
        });
    }

    pub fn carried_points(&self, competitor: &Competitor) -> Option<f64> {
        self.state.read().carried_points(competitor)
    }

    pub fn has_carried_points(&self, competitor: &Competitor) -> bool {
        self.carried_points(competitor).is_some()
    }

    /// Points a competitor brings into this leaderboard.
    pub fn set_carried_points(&self, competitor: &Competitor, points: f64) {
        self.change_carried_points(competitor, Some(points));
    }

    pub fn unset_carried_points(&self, competitor: &Competitor) {
        self.change_carried_points(competitor, None);
    }

    fn change_carried_points(&self, competitor: &Competitor, points: Option<f64>) {
        self.update(|s| {
            let previous = match points {
                Some(points) => s.carried_points.insert(competitor.id().to_string(), points),
                None => s.carried_points.remove(competitor.id()),
            };
            if previous == points {
                return None;
            }
            if !s.all_competitors().contains(competitor) {
                s.registered.push(competitor.clone());
            }
            tracing::debug!(competitor = competitor.id(), ?points, "carried points changed");
            let change = LeaderboardChange::CarriedPointsChanged {
                competitor: competitor.id().to_string(),
            };
            Some(change)
        });
    }

    /// Hide a competitor from rankings and snapshots.
    pub fn set_suppressed(&self, competitor: &Competitor, suppressed: bool) {
        self.update(|s| {
            let changed = if suppressed {
                s.suppressed.insert(competitor.id().to_string())
            } else {
                s.suppressed.remove(competitor.id())
            };
            changed.then(|| LeaderboardChange::CompetitorSuppressed {
                competitor: competitor.id().to_string(),
                suppressed,
            })
        });
    }

    pub fn is_suppressed(&self, competitor: &Competitor) -> bool {
        self.state.read().is_suppressed(competitor)
    }

    pub fn set_competitor_display_name(&self, competitor: &Competitor, display_name: Option<String>) {
        self.update(|s| {
            match display_name {
                Some(name) => s.display_names.insert(competitor.id().to_string(), name),
                None => s.display_names.remove(competitor.id()),
            };
            Some(LeaderboardChange::DisplayNameChanged)
        });
    }

    pub fn competitor_display_name(&self, competitor: &Competitor) -> Option<String> {
        self.state.read().display_name(competitor).map(str::to_string)
    }

    // -- corrections ------------------------------------------------------

    /// Access the score correction of this leaderboard.
    pub fn score_correction(&self) -> ScoreCorrectionHandle<'_> {
        ScoreCorrectionHandle { leaderboard: self }
    }

    /// Signal that results of a bound race moved on.
    pub fn race_data_changed(&self) {
        self.update(|_| Some(LeaderboardChange::RaceDataChanged));
    }

    // -- queries ----------------------------------------------------------

    fn with_standings<T>(
        &self,
        at: TimePoint,
        query: impl FnOnce(&Standings<'_, '_>) -> LeaderboardResult<T>,
    ) -> LeaderboardResult<T> {
        let structure = self.current();
        let engine = Engine::new(&structure, at);
        query(&Standings::all(&engine))
    }

    /// Total points of a competitor, `None` when nothing counts yet.
    pub fn get_total_points(&self, competitor: &Competitor, at: TimePoint) -> LeaderboardResult<Option<f64>> {
        self.with_standings(at, |standings| match standings.engine().position(competitor) {
            Some(index) => standings.total(index),
            None => Ok(None),
        })
    }

    /// Points a column adds to the competitor's total: factor times net
    /// points, or 0 when discarded.
    pub fn get_total_points_in_column(
        &self,
        competitor: &Competitor,
        column: ColumnId,
        at: TimePoint,
    ) -> LeaderboardResult<Option<f64>> {
        self.with_standings(at, |standings| {
            let engine = standings.engine();
            let column = engine.structure().column(column)?;
            match engine.position(competitor) {
                Some(index) => standings.column_total(index, column),
                None => Ok(None),
            }
        })
    }

    /// Unscaled points of a competitor in a column.
    pub fn get_net_points(
        &self,
        competitor: &Competitor,
        column: ColumnId,
        at: TimePoint,
    ) -> LeaderboardResult<Option<f64>> {
        Ok(self.get_entry(competitor, column, at)?.net_points)
    }

    /// A competitor's result in one column. Unknown competitors get an empty
    /// entry.
    pub fn get_entry(
        &self,
        competitor: &Competitor,
        column: ColumnId,
        at: TimePoint,
    ) -> LeaderboardResult<LeaderboardEntry> {
        self.with_standings(at, |standings| {
            let engine = standings.engine();
            let column = engine.structure().column(column)?;
            match engine.position(competitor) {
                Some(index) => standings.entry(index, column),
                None => Ok(LeaderboardEntry::default()),
            }
        })
    }

    pub fn is_discarded(&self, competitor: &Competitor, column: ColumnId, at: TimePoint) -> LeaderboardResult<bool> {
        Ok(self.get_entry(competitor, column, at)?.is_discarded)
    }

    /// Whether the column's results enter total points at `at`.
    pub fn is_valid_in_total_score(&self, column: ColumnId, at: TimePoint) -> LeaderboardResult<bool> {
        let structure = self.current();
        let column = structure.column(column)?;
        Ok(Engine::new(&structure, at).is_valid(column))
    }

    /// Overall ranking, best first. Suppressed competitors are left out.
    pub fn get_competitors_from_best_to_worst(&self, at: TimePoint) -> LeaderboardResult<Vec<Competitor>> {
        self.with_standings(at, |standings| {
            let engine = standings.engine();
            Ok(to_competitors(engine, standings.ranking()?))
        })
    }

    /// Ranking by the result of a single column.
    pub fn get_competitors_from_best_to_worst_in_column(
        &self,
        column: ColumnId,
        at: TimePoint,
    ) -> LeaderboardResult<Vec<Competitor>> {
        self.with_standings(at, |standings| {
            let engine = standings.engine();
            let column = engine.structure().column(column)?;
            Ok(to_competitors(engine, standings.column_ranking(column)?))
        })
    }

    /// The overall ranking as it stood after each column, in race order.
    pub fn get_ranked_competitors_from_best_to_worst_after_each_race_column(
        &self,
        at: TimePoint,
    ) -> LeaderboardResult<Vec<(ColumnId, Vec<Competitor>)>> {
        let structure = self.current();
        let engine = Engine::new(&structure, at);
        let columns: Vec<&RaceColumn> = structure.ordered_columns().collect();
        let mut rankings = Vec::with_capacity(columns.len());
        for end in 1..=columns.len() {
            let prefix = Standings::new(&engine, columns[..end].to_vec());
            rankings.push((columns[end - 1].id(), to_competitors(&engine, prefix.ranking()?)));
        }
        Ok(rankings)
    }

    /// 1-based overall rank, `None` for unknown or suppressed competitors.
    pub fn get_total_rank(&self, competitor: &Competitor, at: TimePoint) -> LeaderboardResult<Option<usize>> {
        Ok(self
            .get_competitors_from_best_to_worst(at)?
            .iter()
            .position(|ranked| ranked == competitor)
            .map(|position| position + 1))
    }

    /// The full grid at `at`, served from the cache while nothing changed.
    pub fn get_leaderboard_snapshot(
        &self,
        at: TimePoint,
        request: &SnapshotRequest,
    ) -> LeaderboardResult<Arc<LeaderboardSnapshot>> {
        let structure = self.current();
        let key = SnapshotKey {
            at,
            request: request.clone(),
        };
        if let Some(found) = self.cache.get(&key, structure.version) {
            return Ok(found);
        }
        let engine = Engine::new(&structure, at);
        let snapshot = Arc::new(LeaderboardSnapshot::compute(&engine, request)?);
        tracing::debug!(
            leaderboard = %structure.name,
            at = %at,
            version = structure.version,
            rows = snapshot.rows.len(),
            "computed leaderboard snapshot"
        );
        self.cache.insert(key, structure.version, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// A leaderboard listens to the leaderboards it depends on (overall
/// leaderboards to their children).
impl LeaderboardListener for Leaderboard {
    fn leaderboard_changed(&self, leaderboard: &str, change: &LeaderboardChange) {
        tracing::debug!(source = leaderboard, ?change, "dependency changed");
        self.race_data_changed();
    }
}

/// Bind `race` into the column's fleet slot; `Some(fleet)` when newly bound.
fn bind(
    s: &mut Structure,
    column: ColumnId,
    fleet: Option<&str>,
    race: Arc<dyn TrackedRace>,
) -> LeaderboardResult<Option<String>> {
    let target = s.column(column)?;
    let (fleet, add_fleet) = s.resolve_fleet(target, fleet)?;
    if !s.check_slot(target, &fleet, &race)? {
        return Ok(None);
    }
    if add_fleet {
        let series = target.series_index();
        s.series[series].add_fleet(Fleet::new(fleet.clone()));
    }
    tracing::info!(column = %column, fleet = %fleet, race = race.name(), "tracked race linked");
    s.column_mut(column)?.bind(&fleet, race);
    Ok(Some(fleet))
}

fn to_competitors(engine: &Engine<'_>, order: Vec<usize>) -> Vec<Competitor> {
    order
        .into_iter()
        .map(|index| engine.competitors()[index].clone())
        .collect()
}

/// Score correction operations of one leaderboard.
///
/// Every change goes through the leaderboard so that it bumps the version
/// and notifies listeners.
pub struct ScoreCorrectionHandle<'a> {
    leaderboard: &'a Leaderboard,
}

impl ScoreCorrectionHandle<'_> {
    fn apply(
        &self,
        competitor: &Competitor,
        column: ColumnId,
        update: impl FnOnce(&mut Structure, TimePoint),
    ) -> LeaderboardResult<()> {
        let now = TimePoint::now();
        self.leaderboard.mutate(|s| {
            let name = s.column(column)?.name().to_string();
            update(s, now);
            Ok((
                (),
                Some(LeaderboardChange::ScoreCorrected {
                    column: name,
                    competitor: competitor.id().to_string(),
                }),
            ))
        })
    }

    /// Override a competitor's net points in a column.
    pub fn correct_score(&self, competitor: &Competitor, column: ColumnId, points: f64) -> LeaderboardResult<()> {
        tracing::info!(competitor = competitor.id(), column = %column, points, "score corrected");
        self.apply(competitor, column, |s, now| {
            s.corrections.set_explicit_score(competitor, column, Some(points), now)
        })
    }

    /// Remove an explicit score override.
    pub fn uncorrect_score(&self, competitor: &Competitor, column: ColumnId) -> LeaderboardResult<()> {
        self.apply(competitor, column, |s, now| {
            s.corrections.set_explicit_score(competitor, column, None, now)
        })
    }

    /// Set or clear a max-points reason.
    pub fn set_max_points_reason(
        &self,
        competitor: &Competitor,
        column: ColumnId,
        reason: Option<crate::scoring::MaxPointsReason>,
    ) -> LeaderboardResult<()> {
        tracing::info!(competitor = competitor.id(), column = %column, ?reason, "max points reason set");
        self.apply(competitor, column, |s, now| {
            s.corrections.set_max_points_reason(competitor, column, reason, now)
        })
    }

    pub fn get(&self, competitor: &Competitor, column: ColumnId) -> Option<crate::scoring::CorrectionRecord> {
        self.leaderboard
            .state
            .read()
            .corrections
            .get(competitor.id(), column)
            .copied()
    }

    pub fn comment(&self) -> Option<String> {
        self.leaderboard.state.read().corrections.comment().map(str::to_string)
    }

    pub fn set_comment(&self, comment: Option<String>) {
        self.leaderboard.update(|s| {
            s.corrections.set_comment(comment);
            Some(LeaderboardChange::CorrectionCommentChanged)
        });
    }

    pub fn last_update(&self) -> Option<TimePoint> {
        self.leaderboard.state.read().corrections.last_update()
    }

    pub fn is_empty(&self) -> bool {
        self.leaderboard.state.read().corrections.is_empty()
    }

    /// Drop every correction.
    pub fn clear(&self) {
        tracing::info!("score corrections cleared");
        self.leaderboard.update(|s| {
            s.corrections.clear(TimePoint::now());
            Some(LeaderboardChange::CorrectionsCleared)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::FinishOrderRace;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn boats(n: usize) -> Vec<Competitor> {
        (1..=n).map(|i| Competitor::named(format!("B{i}"))).collect()
    }

    fn race(name: &str, start: i64, order: &[Competitor]) -> Arc<dyn TrackedRace> {
        Arc::new(FinishOrderRace::new(name, TimePoint::from_millis(start), order.to_vec()))
    }

    fn flexible() -> Leaderboard {
        Leaderboard::flexible(
            "Test",
            ScoringScheme::LowPoint,
            ThresholdDiscardingRule::none(),
            &LeaderboardConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_add_race_creates_column() {
        let board = flexible();
        let b = boats(3);
        let column = board.add_race(race("R1", 0, &b), "R1", false, None).unwrap();

        assert_eq!(board.race_columns().len(), 1);
        assert!(column.tracked_race("Default").is_some());
        assert_eq!(board.competitors(), b);
        let at = TimePoint::from_millis(10);
        assert_eq!(board.get_total_points(&b[1], at).unwrap(), Some(2.0));
    }

    #[test]
    fn test_mutation_bumps_version() {
        let board = flexible();
        let v0 = board.version();
        board.add_race(race("R1", 0, &boats(2)), "R1", false, None).unwrap();
        assert!(board.version() > v0);
    }

    #[test]
    fn test_failed_mutation_changes_nothing() {
        let board = flexible();
        let b = boats(2);
        let column = board.add_race(race("R1", 0, &b), "R1", false, None).unwrap();
        let version = board.version();

        let err = board
            .set_tracked_race(column.id(), None, race("Other", 0, &b))
            .unwrap_err();
        assert!(matches!(err, LeaderboardError::RaceAlreadyBound { .. }));
        assert_eq!(board.version(), version);
    }

    #[test]
    fn test_setters_publish_only_real_changes() {
        let board = flexible();
        let b = boats(2);
        board.add_race(race("R1", 0, &b), "R1", false, None).unwrap();
        let version = board.version();

        board.set_suppressed(&b[0], true);
        board.set_suppressed(&b[0], true);
        assert_eq!(board.version(), version + 1);

        board.set_carried_points(&b[1], 3.0);
        board.set_carried_points(&b[1], 3.0);
        assert_eq!(board.version(), version + 2);

        board.add_competitor(b[1].clone());
        board.score_correction().set_comment(Some("Provisional".to_string()));
        assert_eq!(board.version(), version + 3);
    }

    #[test]
    fn test_rebinding_same_race_is_noop() {
        let board = flexible();
        let r1 = race("R1", 0, &boats(2));
        let column = board.add_race(Arc::clone(&r1), "R1", false, None).unwrap();
        let version = board.version();

        board.set_tracked_race(column.id(), None, r1).unwrap();
        assert_eq!(board.version(), version);
    }

    #[test]
    fn test_flexible_creates_fleets() {
        let board = flexible();
        board.add_race(race("Y", 0, &boats(2)), "R1", false, Some("Yellow")).unwrap();
        let fleets: Vec<String> = board.series()[0]
            .fleets()
            .iter()
            .map(|fleet| fleet.name().to_string())
            .collect();
        assert_eq!(fleets, vec!["Default", "Yellow"]);
    }

    #[test]
    fn test_invalid_factor_rejected() {
        let board = flexible();
        let column = board.add_race(race("R1", 0, &boats(2)), "R1", false, None).unwrap();
        assert!(matches!(
            board.set_column_factor(column.id(), Some(0.0)),
            Err(LeaderboardError::InvalidFactor(_))
        ));
        board.set_column_factor(column.id(), Some(1.5)).unwrap();
        assert_eq!(board.column_factor(column.id()).unwrap(), 1.5);
    }

    #[test]
    fn test_release_returns_race() {
        let board = flexible();
        let column = board.add_race(race("R1", 0, &boats(2)), "R1", false, None).unwrap();
        let released = board.release_tracked_race(column.id(), None).unwrap();
        assert_eq!(released.unwrap().name(), "R1");
        assert!(board.release_tracked_race(column.id(), None).unwrap().is_none());
    }

    #[test]
    fn test_suppressed_competitor_leaves_ranking() {
        let board = flexible();
        let b = boats(3);
        board.add_race(race("R1", 0, &b), "R1", false, None).unwrap();
        board.set_suppressed(&b[0], true);

        let at = TimePoint::from_millis(10);
        assert_eq!(board.get_competitors_from_best_to_worst(at).unwrap(), vec![b[1].clone(), b[2].clone()]);
        assert_eq!(board.get_total_rank(&b[0], at).unwrap(), None);
        assert_eq!(board.get_total_rank(&b[2], at).unwrap(), Some(2));
    }

    #[test]
    fn test_unknown_competitor_queries_are_empty() {
        let board = flexible();
        let column = board.add_race(race("R1", 0, &boats(2)), "R1", false, None).unwrap();
        let stranger = Competitor::named("Stranger");
        let at = TimePoint::from_millis(10);

        assert_eq!(board.get_total_points(&stranger, at).unwrap(), None);
        assert_eq!(board.get_entry(&stranger, column.id(), at).unwrap(), LeaderboardEntry::default());
    }

    struct Counter(AtomicUsize);

    impl LeaderboardListener for Counter {
        fn leaderboard_changed(&self, _: &str, _: &LeaderboardChange) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_listeners_notified_and_pruned() {
        let board = flexible();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let weak: Weak<dyn LeaderboardListener> = Arc::downgrade(&counter) as Weak<dyn LeaderboardListener>;
        board.add_listener(weak);

        board.race_data_changed();
        board.set_display_name(Some("Kiel Week".to_string()));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        drop(counter);
        board.race_data_changed();
        assert!(board.listeners.lock().is_empty());
    }

    #[test]
    fn test_correction_handle_tracks_comment_and_update() {
        let board = flexible();
        let b = boats(2);
        let column = board.add_race(race("R1", 0, &b), "R1", false, None).unwrap();

        board.score_correction().correct_score(&b[0], column.id(), 5.0).unwrap();
        board.score_correction().set_comment(Some("Protest 4".to_string()));
        assert_eq!(board.score_correction().comment().as_deref(), Some("Protest 4"));
        assert!(board.score_correction().last_update().is_some());
        assert_eq!(board.score_correction().get(&b[0], column.id()).unwrap().explicit_score, Some(5.0));

        board.score_correction().uncorrect_score(&b[0], column.id()).unwrap();
        assert!(board.score_correction().is_empty());
    }
}
