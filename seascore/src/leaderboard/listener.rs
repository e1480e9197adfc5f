//! Change notification for dependent components.

/// A structural or scoring change applied to a leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub enum LeaderboardChange {
    RaceColumnAdded { column: String },
    TrackedRaceLinked { column: String, fleet: String },
    TrackedRaceUnlinked { column: String, fleet: String },
    ScoreCorrected { column: String, competitor: String },
    CorrectionsCleared,
    CorrectionCommentChanged,
    CarriedPointsChanged { competitor: String },
    FactorChanged { column: String },
    DiscardingRuleChanged,
    CompetitorAdded { competitor: String },
    CompetitorSuppressed { competitor: String, suppressed: bool },
    DisplayNameChanged,
    /// Results of a bound race (or a child leaderboard) moved on.
    RaceDataChanged,
}

/// Receives changes after they were applied.
///
/// Called without any leaderboard lock held, so implementations may query
/// or even mutate the leaderboard that notified them.
pub trait LeaderboardListener: Send + Sync {
    fn leaderboard_changed(&self, leaderboard: &str, change: &LeaderboardChange);
}
