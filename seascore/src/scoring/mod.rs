//! Scoring schemes, discard rules and score corrections.
//!
//! Everything in this module is a pure function of its inputs. The
//! leaderboard engine feeds in ranks, fleet sizes and column progress and
//! gets back point values, orderings and "does this count" answers.
//!
//! # Schemes
//!
//! | scheme | points for rank `r` in a fleet of `n` | better |
//! |---|---|---|
//! | `LowPoint` | `r` | lower |
//! | `HighPoint` | `n + 1 - r` | higher |
//! | `HighPointFirstGets10LastBreaksTie` | 10 down to 1, linear in `r` | higher |
//! | `HighPointExtremeSailingSeriesOverall` | `11 - r`, at least 1 | higher |
//! | `LowPointFirstToWinThreeRaces` | `r`; medal stages count wins | lower |

mod correction;
mod discard;

pub use correction::{
    effective_from, CorrectionKind, CorrectionRecord, EffectiveFrom, MaxPointsReason,
    ScoreCorrection,
};
pub use discard::ThresholdDiscardingRule;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default multiplier applied to medal race columns without an explicit factor.
pub const DEFAULT_MEDAL_RACE_FACTOR: f64 = 2.0;

/// Wins that close a medal stage under the win-count scheme.
pub const WINS_TO_CLOSE_MEDAL_STAGE: u32 = 3;

/// The closed set of supported scoring schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringScheme {
    /// Racing Rules Appendix A low-point system.
    #[default]
    LowPoint,
    HighPoint,
    /// Extreme Sailing Series event scoring: 10 for the winner, 1 for last.
    HighPointFirstGets10LastBreaksTie,
    /// Overall series table aggregating event results.
    HighPointExtremeSailingSeriesOverall,
    /// Low point opening series followed by medal stages decided by wins.
    LowPointFirstToWinThreeRaces,
}

/// How far along a column is, as far as total scores are concerned.
///
/// Built by the engine for one column at one time point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnProgress {
    /// The column's fleets race in parallel without a structural order.
    pub unordered_group: bool,
    /// Fleets whose race for this column has not started (or is not bound).
    pub fleets_pending: usize,
    /// Competitors outside the started races holding an effective correction.
    pub substituted_results: usize,
}

impl ScoringScheme {
    /// All schemes, in declaration order.
    pub const ALL: [ScoringScheme; 5] = [
        ScoringScheme::LowPoint,
        ScoringScheme::HighPoint,
        ScoringScheme::HighPointFirstGets10LastBreaksTie,
        ScoringScheme::HighPointExtremeSailingSeriesOverall,
        ScoringScheme::LowPointFirstToWinThreeRaces,
    ];

    /// Configuration name of the scheme.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringScheme::LowPoint => "low_point",
            ScoringScheme::HighPoint => "high_point",
            ScoringScheme::HighPointFirstGets10LastBreaksTie => {
                "high_point_first_gets10_last_breaks_tie"
            }
            ScoringScheme::HighPointExtremeSailingSeriesOverall => {
                "high_point_extreme_sailing_series_overall"
            }
            ScoringScheme::LowPointFirstToWinThreeRaces => "low_point_first_to_win_three_races",
        }
    }

    /// Whether a larger score is a better score.
    pub fn is_higher_better(self) -> bool {
        matches!(
            self,
            ScoringScheme::HighPoint
                | ScoringScheme::HighPointFirstGets10LastBreaksTie
                | ScoringScheme::HighPointExtremeSailingSeriesOverall
        )
    }

    /// Points for a 1-based `rank` in a fleet of `fleet_size`.
    ///
    /// With `is_medal_context` set, the win-count scheme returns what the
    /// result adds to the running win count (1 for a win, 0 otherwise); every
    /// other scheme scores medal races like any other race.
    ///
    /// Rank 0 means "not ranked" and must be filtered out by the caller.
    pub fn points_for_rank(self, rank: u32, fleet_size: u32, is_medal_context: bool) -> f64 {
        debug_assert!(rank > 0, "unranked competitors must not be scored");
        match self {
            ScoringScheme::LowPoint => rank as f64,
            ScoringScheme::LowPointFirstToWinThreeRaces => {
                if is_medal_context {
                    if rank == 1 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    rank as f64
                }
            }
            ScoringScheme::HighPoint => (fleet_size + 1).saturating_sub(rank) as f64,
            ScoringScheme::HighPointFirstGets10LastBreaksTie => {
                if fleet_size <= 1 {
                    return 10.0;
                }
                let behind = fleet_size.saturating_sub(rank) as f64;
                (1.0 + 9.0 * behind / (fleet_size - 1) as f64).max(1.0)
            }
            ScoringScheme::HighPointExtremeSailingSeriesOverall => {
                if rank <= 10 {
                    (11 - rank) as f64
                } else {
                    1.0
                }
            }
        }
    }

    /// Net points for a max-points outcome (DSQ, DNF, ...) in a fleet of `fleet_size`.
    pub fn penalty_points(self, fleet_size: u32) -> f64 {
        if self.is_higher_better() {
            0.0
        } else {
            (fleet_size + 1) as f64
        }
    }

    /// Compare two optional scores, better first.
    ///
    /// A missing score sorts after any present one unless
    /// `null_scores_are_better` is set.
    pub fn compare_scores(
        self,
        a: Option<f64>,
        b: Option<f64>,
        null_scores_are_better: bool,
    ) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => {
                if null_scores_are_better {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (Some(_), None) => {
                if null_scores_are_better {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (Some(a), Some(b)) => {
                if self.is_higher_better() {
                    b.total_cmp(&a)
                } else {
                    a.total_cmp(&b)
                }
            }
        }
    }

    /// A comparator over optional scores, better first.
    pub fn score_comparator(
        self,
        null_scores_are_better: bool,
    ) -> impl Fn(&Option<f64>, &Option<f64>) -> Ordering + Copy {
        move |a, b| self.compare_scores(*a, *b, null_scores_are_better)
    }

    /// Whether a column's results may enter total scores yet.
    ///
    /// Low and high point count an unordered fleet group only after every
    /// fleet has raced, or once corrections stand in for the missing fleets.
    /// The remaining schemes count every column as soon as it has results.
    pub fn is_valid_in_total_score(self, progress: &ColumnProgress) -> bool {
        match self {
            ScoringScheme::LowPoint | ScoringScheme::HighPoint => {
                !progress.unordered_group
                    || progress.fleets_pending == 0
                    || progress.substituted_results >= progress.fleets_pending
            }
            ScoringScheme::HighPointFirstGets10LastBreaksTie
            | ScoringScheme::HighPointExtremeSailingSeriesOverall
            | ScoringScheme::LowPointFirstToWinThreeRaces => true,
        }
    }

    /// Multiplier for a column.
    pub fn score_factor(self, explicit: Option<f64>, is_medal_race: bool, medal_factor: f64) -> f64 {
        match explicit {
            Some(factor) => factor,
            None if is_medal_race && !self.counts_wins() => medal_factor,
            None => 1.0,
        }
    }

    /// Whether a tie on total points goes to the competitor with more results
    /// in unordered-group columns that are still waiting for other fleets.
    pub fn compares_number_of_races(self) -> bool {
        matches!(self, ScoringScheme::LowPoint | ScoringScheme::HighPoint)
    }

    /// Whether ties go through the best-single-race comparison before the last race.
    pub fn uses_best_score_tie_break(self) -> bool {
        !matches!(self, ScoringScheme::HighPointFirstGets10LastBreaksTie)
    }

    /// Whether medal stages are decided by counting wins.
    pub fn counts_wins(self) -> bool {
        matches!(self, ScoringScheme::LowPointFirstToWinThreeRaces)
    }
}

impl fmt::Display for ScoringScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown scheme name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scoring scheme: {0}")]
pub struct UnknownSchemeError(pub String);

impl FromStr for ScoringScheme {
    type Err = UnknownSchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ScoringScheme::ALL
            .into_iter()
            .find(|scheme| scheme.as_str() == normalized)
            .ok_or_else(|| UnknownSchemeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_point_is_rank() {
        assert_eq!(ScoringScheme::LowPoint.points_for_rank(1, 10, false), 1.0);
        assert_eq!(ScoringScheme::LowPoint.points_for_rank(7, 10, false), 7.0);
    }

    #[test]
    fn test_high_point_counts_down_from_fleet_size() {
        assert_eq!(ScoringScheme::HighPoint.points_for_rank(1, 5, false), 5.0);
        assert_eq!(ScoringScheme::HighPoint.points_for_rank(5, 5, false), 1.0);
        assert_eq!(ScoringScheme::HighPoint.points_for_rank(9, 5, false), 0.0);
    }

    #[test]
    fn test_first_gets_10_scales_linearly() {
        let scheme = ScoringScheme::HighPointFirstGets10LastBreaksTie;
        assert_eq!(scheme.points_for_rank(1, 10, false), 10.0);
        assert_eq!(scheme.points_for_rank(10, 10, false), 1.0);
        assert_eq!(scheme.points_for_rank(4, 4, false), 1.0);
        assert_eq!(scheme.points_for_rank(1, 4, false), 10.0);
        assert_eq!(scheme.points_for_rank(2, 4, false), 7.0);
        assert_eq!(scheme.points_for_rank(1, 1, false), 10.0);
    }

    #[test]
    fn test_extreme_sailing_overall_floor_is_one() {
        let scheme = ScoringScheme::HighPointExtremeSailingSeriesOverall;
        assert_eq!(scheme.points_for_rank(1, 20, false), 10.0);
        assert_eq!(scheme.points_for_rank(10, 20, false), 1.0);
        assert_eq!(scheme.points_for_rank(15, 20, false), 1.0);
    }

    #[test]
    fn test_win_scheme_medal_context_counts_wins() {
        let scheme = ScoringScheme::LowPointFirstToWinThreeRaces;
        assert_eq!(scheme.points_for_rank(1, 4, true), 1.0);
        assert_eq!(scheme.points_for_rank(2, 4, true), 0.0);
        assert_eq!(scheme.points_for_rank(2, 4, false), 2.0);
    }

    #[test]
    fn test_penalty_points() {
        assert_eq!(ScoringScheme::LowPoint.penalty_points(20), 21.0);
        assert_eq!(ScoringScheme::HighPoint.penalty_points(20), 0.0);
    }

    #[test]
    fn test_comparator_places_nulls_last_by_default() {
        let low = ScoringScheme::LowPoint;
        assert_eq!(low.compare_scores(Some(1.0), None, false), Ordering::Less);
        assert_eq!(low.compare_scores(Some(1.0), None, true), Ordering::Greater);
        assert_eq!(low.compare_scores(Some(1.0), Some(2.0), false), Ordering::Less);

        let high = ScoringScheme::HighPoint;
        assert_eq!(high.compare_scores(Some(1.0), Some(2.0), false), Ordering::Greater);
    }

    #[test]
    fn test_score_comparator_sorts_best_first() {
        let mut scores = vec![Some(3.0), None, Some(1.0), Some(2.0)];
        scores.sort_by(ScoringScheme::LowPoint.score_comparator(false));
        assert_eq!(scores, vec![Some(1.0), Some(2.0), Some(3.0), None]);
    }

    #[test]
    fn test_unordered_group_validity() {
        let pending = ColumnProgress {
            unordered_group: true,
            fleets_pending: 1,
            substituted_results: 0,
        };
        assert!(!ScoringScheme::LowPoint.is_valid_in_total_score(&pending));
        assert!(ScoringScheme::HighPointFirstGets10LastBreaksTie.is_valid_in_total_score(&pending));

        let substituted = ColumnProgress {
            substituted_results: 1,
            ..pending
        };
        assert!(ScoringScheme::LowPoint.is_valid_in_total_score(&substituted));
        assert!(ScoringScheme::HighPoint.is_valid_in_total_score(&ColumnProgress::default()));
    }

    #[test]
    fn test_medal_factor_defaults() {
        let low = ScoringScheme::LowPoint;
        assert_eq!(low.score_factor(None, true, DEFAULT_MEDAL_RACE_FACTOR), 2.0);
        assert_eq!(low.score_factor(None, false, DEFAULT_MEDAL_RACE_FACTOR), 1.0);
        assert_eq!(low.score_factor(Some(1.5), true, DEFAULT_MEDAL_RACE_FACTOR), 1.5);
        assert_eq!(
            ScoringScheme::LowPointFirstToWinThreeRaces.score_factor(None, true, 2.0),
            1.0
        );
    }

    #[test]
    fn test_parse_scheme_names() {
        for scheme in ScoringScheme::ALL {
            assert_eq!(scheme.as_str().parse::<ScoringScheme>().unwrap(), scheme);
        }
        assert_eq!(
            "High-Point".parse::<ScoringScheme>().unwrap(),
            ScoringScheme::HighPoint
        );
        assert!("golf".parse::<ScoringScheme>().is_err());
    }

    #[test]
    fn test_serde_name_matches_config_name() {
        for scheme in ScoringScheme::ALL {
            let json = serde_json::to_string(&scheme).unwrap();
            assert_eq!(json, format!("\"{}\"", scheme.as_str()));
        }
    }
}
