//! Manual score corrections and the time at which they take effect.
//!
//! A correction never applies retroactively to the whole timeline. Asking
//! for standings as of a moment before the corrected race finished must show
//! the tracked result, so every correction carries an effective time derived
//! from the race it belongs to (see [`effective_from`]).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::competitor::Competitor;
use crate::model::ColumnId;
use crate::time::TimePoint;
use crate::tracking::TrackedRace;

/// Non-finish outcomes scored as "fleet size plus one".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaxPointsReason {
    /// Disqualified.
    Dsq,
    /// Did not finish.
    Dnf,
    /// Did not start.
    Dns,
    /// Did not come to the starting area.
    Dnc,
    /// Disqualification not excludable.
    Dnd,
}

impl MaxPointsReason {
    /// Whether the result may be dropped by the discard rule.
    pub fn is_discardable(self) -> bool {
        !matches!(self, MaxPointsReason::Dnd)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaxPointsReason::Dsq => "DSQ",
            MaxPointsReason::Dnf => "DNF",
            MaxPointsReason::Dns => "DNS",
            MaxPointsReason::Dnc => "DNC",
            MaxPointsReason::Dnd => "DND",
        }
    }
}

impl fmt::Display for MaxPointsReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown max-points reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown max points reason: {0}")]
pub struct UnknownReasonError(pub String);

impl FromStr for MaxPointsReason {
    type Err = UnknownReasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DSQ" => Ok(MaxPointsReason::Dsq),
            "DNF" => Ok(MaxPointsReason::Dnf),
            "DNS" => Ok(MaxPointsReason::Dns),
            "DNC" => Ok(MaxPointsReason::Dnc),
            "DND" => Ok(MaxPointsReason::Dnd),
            _ => Err(UnknownReasonError(s.to_string())),
        }
    }
}

/// What a correction changes; decides when it takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionKind {
    ExplicitScore,
    MaxPoints(MaxPointsReason),
}

/// The corrections held for one competitor in one column.
///
/// Both parts are independent; an explicit score wins over the reason when
/// both are in effect.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorrectionRecord {
    pub explicit_score: Option<f64>,
    pub max_points_reason: Option<MaxPointsReason>,
}

impl CorrectionRecord {
    fn is_empty(&self) -> bool {
        self.explicit_score.is_none() && self.max_points_reason.is_none()
    }
}

/// Moment from which a correction is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveFrom {
    Always,
    /// Visible at and after the time point.
    AtOrAfter(TimePoint),
    /// Visible strictly after the time point.
    After(TimePoint),
}

impl EffectiveFrom {
    pub fn is_effective(self, at: TimePoint) -> bool {
        match self {
            EffectiveFrom::Always => true,
            EffectiveFrom::AtOrAfter(from) => at >= from,
            EffectiveFrom::After(from) => at > from,
        }
    }
}

/// Effective time of a correction.
///
/// # Arguments
///
/// * `kind` - explicit score or max-points reason
/// * `is_carry_forward` - carry-forward columns are seeded results and always apply
/// * `own_race` - the race the competitor sails in this column, if bound
/// * `previous_race_end` - end (or start, when no end is known) of the closest
///   earlier column with a started race
/// * `at` - the query time point
pub fn effective_from(
    kind: CorrectionKind,
    is_carry_forward: bool,
    own_race: Option<&dyn TrackedRace>,
    previous_race_end: Option<TimePoint>,
    at: TimePoint,
) -> EffectiveFrom {
    if is_carry_forward {
        return EffectiveFrom::Always;
    }

    let started = own_race.filter(|race| race.has_started(at));
    if let Some(race) = started {
        let start = race.start_of_race();
        let from = match kind {
            CorrectionKind::MaxPoints(MaxPointsReason::Dns) => start,
            _ => race.end_of_race().or(start),
        };
        return from.map_or(EffectiveFrom::Always, EffectiveFrom::AtOrAfter);
    }

    previous_race_end.map_or(EffectiveFrom::Always, EffectiveFrom::After)
}

/// Corrections for a whole leaderboard, keyed by competitor and column.
#[derive(Debug, Clone, Default)]
pub struct ScoreCorrection {
    records: HashMap<(String, ColumnId), CorrectionRecord>,
    comment: Option<String>,
    last_update: Option<TimePoint>,
}

impl ScoreCorrection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or remove the explicit score override.
    pub fn set_explicit_score(
        &mut self,
        competitor: &Competitor,
        column: ColumnId,
        score: Option<f64>,
        updated_at: TimePoint,
    ) {
        self.update(competitor, column, updated_at, |record| {
            record.explicit_score = score;
        });
    }

    /// Set or remove the max-points reason.
    pub fn set_max_points_reason(
        &mut self,
        competitor: &Competitor,
        column: ColumnId,
        reason: Option<MaxPointsReason>,
        updated_at: TimePoint,
    ) {
        self.update(competitor, column, updated_at, |record| {
            record.max_points_reason = reason;
        });
    }

    fn update(
        &mut self,
        competitor: &Competitor,
        column: ColumnId,
        updated_at: TimePoint,
        apply: impl FnOnce(&mut CorrectionRecord),
    ) {
        let key = (competitor.id().to_string(), column);
        let record = self.records.entry(key.clone()).or_default();
        apply(record);
        if record.is_empty() {
            self.records.remove(&key);
        }
        self.last_update = Some(updated_at);
    }

    pub fn get(&self, competitor_id: &str, column: ColumnId) -> Option<&CorrectionRecord> {
        self.records.get(&(competitor_id.to_string(), column))
    }

    /// Competitor ids with a correction in `column`.
    pub fn corrected_in(&self, column: ColumnId) -> impl Iterator<Item = (&str, &CorrectionRecord)> {
        self.records
            .iter()
            .filter(move |((_, c), _)| *c == column)
            .map(|((id, _), record)| (id.as_str(), record))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Drop every correction and the comment.
    pub fn clear(&mut self, updated_at: TimePoint) {
        self.records.clear();
        self.comment = None;
        self.last_update = Some(updated_at);
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    /// When the corrections were last changed.
    pub fn last_update(&self) -> Option<TimePoint> {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::FinishOrderRace;

    fn column() -> ColumnId {
        ColumnId::new(1, 0)
    }

    fn race(start: i64, end: Option<i64>) -> FinishOrderRace {
        let race = FinishOrderRace::new(
            "R1",
            TimePoint::from_millis(start),
            vec![Competitor::named("A")],
        );
        match end {
            Some(end) => race.with_end(TimePoint::from_millis(end)),
            None => race,
        }
    }

    #[test]
    fn test_reason_parsing_and_discardability() {
        assert_eq!("dsq".parse::<MaxPointsReason>().unwrap(), MaxPointsReason::Dsq);
        assert!(MaxPointsReason::Dnc.is_discardable());
        assert!(!MaxPointsReason::Dnd.is_discardable());
        assert!("OCS".parse::<MaxPointsReason>().is_err());
    }

    #[test]
    fn test_dns_effective_at_start_dsq_at_end() {
        let race = race(100, Some(500));
        let at = TimePoint::from_millis(200);

        let dns = effective_from(
            CorrectionKind::MaxPoints(MaxPointsReason::Dns),
            false,
            Some(&race as &dyn TrackedRace),
            None,
            at,
        );
        assert_eq!(dns, EffectiveFrom::AtOrAfter(TimePoint::from_millis(100)));
        assert!(dns.is_effective(at));

        let dsq = effective_from(
            CorrectionKind::MaxPoints(MaxPointsReason::Dsq),
            false,
            Some(&race as &dyn TrackedRace),
            None,
            at,
        );
        assert!(!dsq.is_effective(at));
        assert!(dsq.is_effective(TimePoint::from_millis(500)));
    }

    #[test]
    fn test_explicit_score_falls_back_to_start_without_end() {
        let race = race(100, None);
        let from = effective_from(
            CorrectionKind::ExplicitScore,
            false,
            Some(&race as &dyn TrackedRace),
            None,
            TimePoint::from_millis(150),
        );
        assert_eq!(from, EffectiveFrom::AtOrAfter(TimePoint::from_millis(100)));
    }

    #[test]
    fn test_untracked_column_waits_for_previous_race() {
        let previous_end = TimePoint::from_millis(1_000);
        let from = effective_from(
            CorrectionKind::MaxPoints(MaxPointsReason::Dnf),
            false,
            None,
            Some(previous_end),
            TimePoint::from_millis(2_000),
        );
        assert!(!from.is_effective(previous_end));
        assert!(from.is_effective(previous_end.plus_millis(1)));
    }

    #[test]
    fn test_not_started_race_treated_as_untracked() {
        let race = race(5_000, None);
        let from = effective_from(
            CorrectionKind::ExplicitScore,
            false,
            Some(&race as &dyn TrackedRace),
            None,
            TimePoint::from_millis(1_000),
        );
        assert_eq!(from, EffectiveFrom::Always);
    }

    #[test]
    fn test_carry_forward_always_effective() {
        let race = race(100, Some(500));
        let from = effective_from(
            CorrectionKind::ExplicitScore,
            true,
            Some(&race as &dyn TrackedRace),
            Some(TimePoint::from_millis(10_000)),
            TimePoint::from_millis(0),
        );
        assert_eq!(from, EffectiveFrom::Always);
    }

    #[test]
    fn test_store_drops_empty_records() {
        let mut corrections = ScoreCorrection::new();
        let alpha = Competitor::named("A");
        let now = TimePoint::from_millis(1);

        corrections.set_explicit_score(&alpha, column(), Some(3.0), now);
        corrections.set_max_points_reason(&alpha, column(), Some(MaxPointsReason::Dsq), now);
        assert_eq!(corrections.len(), 1);
        assert_eq!(
            corrections.get("A", column()).unwrap().max_points_reason,
            Some(MaxPointsReason::Dsq)
        );

        corrections.set_explicit_score(&alpha, column(), None, now);
        corrections.set_max_points_reason(&alpha, column(), None, now);
        assert!(corrections.is_empty());
        assert_eq!(corrections.last_update(), Some(now));
    }
}
