//! Threshold-based result discarding.

use serde::{Deserialize, Serialize};

use crate::error::{LeaderboardError, LeaderboardResult};

/// Allows one more discarded result each time the number of counted races
/// reaches a threshold.
///
/// With thresholds `[3, 6]` a competitor keeps every result below three
/// races, drops the worst one from three races on and the worst two from six
/// races on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct ThresholdDiscardingRule {
    thresholds: Vec<u32>,
}

impl ThresholdDiscardingRule {
    /// Create a rule from positive, strictly increasing thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::InvalidDiscardThresholds`] for a zero
    /// threshold or thresholds that do not increase.
    pub fn new(thresholds: Vec<u32>) -> LeaderboardResult<Self> {
        let increasing = thresholds.windows(2).all(|pair| pair[0] < pair[1]);
        let positive = thresholds.first().map_or(true, |first| *first > 0);
        if !increasing || !positive {
            return Err(LeaderboardError::InvalidDiscardThresholds(thresholds));
        }
        Ok(Self { thresholds })
    }

    /// A rule that never discards.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    /// Number of results that may be discarded after `counted_races` races.
    pub fn number_of_discards(&self, counted_races: usize) -> usize {
        self.thresholds
            .iter()
            .take_while(|threshold| **threshold as usize <= counted_races)
            .count()
    }
}

impl TryFrom<Vec<u32>> for ThresholdDiscardingRule {
    type Error = LeaderboardError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ThresholdDiscardingRule> for Vec<u32> {
    fn from(rule: ThresholdDiscardingRule) -> Self {
        rule.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_three_and_six() {
        let rule = ThresholdDiscardingRule::new(vec![3, 6]).unwrap();
        let discards: Vec<usize> = (0..8).map(|n| rule.number_of_discards(n)).collect();
        assert_eq!(discards, vec![0, 0, 0, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_none_never_discards() {
        assert_eq!(ThresholdDiscardingRule::none().number_of_discards(100), 0);
    }

    #[test]
    fn test_rejects_non_increasing_thresholds() {
        assert!(matches!(
            ThresholdDiscardingRule::new(vec![3, 3]),
            Err(LeaderboardError::InvalidDiscardThresholds(_))
        ));
        assert!(ThresholdDiscardingRule::new(vec![6, 3]).is_err());
        assert!(ThresholdDiscardingRule::new(vec![0, 3]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let rule: ThresholdDiscardingRule = serde_json::from_str("[2, 5]").unwrap();
        assert_eq!(rule.thresholds(), &[2, 5]);
        assert!(serde_json::from_str::<ThresholdDiscardingRule>("[5, 2]").is_err());
    }

    proptest! {
        #[test]
        fn test_discards_are_monotonic(
            raw in proptest::collection::btree_set(1u32..40, 0..6),
            counted in 0usize..50
        ) {
            let rule = ThresholdDiscardingRule::new(raw.into_iter().collect())?;
            prop_assert!(rule.number_of_discards(counted) <= rule.number_of_discards(counted + 1));
            prop_assert!(rule.number_of_discards(counted) <= rule.thresholds().len());
        }
    }
}
