use serde::Serialize;

use crate::scoring::MaxPointsReason;

/// A competitor's result in one race column at one time point.
///
/// Derived on demand; never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// Rank reported by the tracked race, 0 if not started or not ranked.
    pub tracked_rank: u32,
    /// Unscaled points; `None` while the result does not count yet.
    pub net_points: Option<f64>,
    /// The net points come from a correction rather than the tracked rank.
    pub is_net_points_corrected: bool,
    /// Points this column adds to the total: the column factor times the net
    /// points, or 0 when discarded.
    pub total_points: Option<f64>,
    pub max_points_reason: Option<MaxPointsReason>,
    pub is_discarded: bool,
    /// Fleet the competitor sailed in, when bound to a race of the column.
    pub fleet: Option<String>,
}
