use crate::model::{ColumnId, Fleet};

/// Declaration of a series, used when building a [`Regatta`](crate::model::Regatta).
///
/// # Example
///
/// ```ignore
/// let qualification = SeriesDefinition::new("Qualification")
///     .fleets_run_in_parallel()
///     .with_fleet(Fleet::new("Yellow"))
///     .with_fleet(Fleet::new("Blue"))
///     .with_race_columns(["Q1", "Q2"]);
/// ```
#[derive(Debug, Clone)]
pub struct SeriesDefinition {
    pub(crate) name: String,
    pub(crate) is_medal: bool,
    pub(crate) fleets_run_in_parallel: bool,
    pub(crate) first_column_is_non_discardable_carry_forward: bool,
    pub(crate) starts_with_zero_score: bool,
    pub(crate) fleets: Vec<Fleet>,
    pub(crate) column_names: Vec<String>,
}

impl SeriesDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_medal: false,
            fleets_run_in_parallel: false,
            first_column_is_non_discardable_carry_forward: false,
            starts_with_zero_score: false,
            fleets: Vec::new(),
            column_names: Vec::new(),
        }
    }

    /// Mark every column of the series as a medal race.
    pub fn medal(mut self) -> Self {
        self.is_medal = true;
        self
    }

    pub fn fleets_run_in_parallel(mut self) -> Self {
        self.fleets_run_in_parallel = true;
        self
    }

    /// The first column seeds the series with results carried in from an
    /// earlier stage.
    pub fn first_column_is_carry_forward(mut self) -> Self {
        self.first_column_is_non_discardable_carry_forward = true;
        self
    }

    /// Totals restart from zero when the series begins.
    pub fn starts_with_zero_score(mut self) -> Self {
        self.starts_with_zero_score = true;
        self
    }

    pub fn with_fleet(mut self, fleet: Fleet) -> Self {
        self.fleets.push(fleet);
        self
    }

    pub fn with_race_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A series as held by a leaderboard.
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    is_medal: bool,
    fleets_run_in_parallel: bool,
    first_column_is_non_discardable_carry_forward: bool,
    starts_with_zero_score: bool,
    fleets: Vec<Fleet>,
    columns: Vec<ColumnId>,
}

impl Series {
    pub(crate) fn from_definition(definition: &SeriesDefinition) -> Self {
        let fleets = if definition.fleets.is_empty() {
            vec![Fleet::default_fleet()]
        } else {
            definition.fleets.clone()
        };
        Self {
            name: definition.name.clone(),
            is_medal: definition.is_medal,
            fleets_run_in_parallel: definition.fleets_run_in_parallel,
            first_column_is_non_discardable_carry_forward: definition
                .first_column_is_non_discardable_carry_forward,
            starts_with_zero_score: definition.starts_with_zero_score,
            fleets,
            columns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_medal(&self) -> bool {
        self.is_medal
    }

    pub fn fleets_run_in_parallel(&self) -> bool {
        self.fleets_run_in_parallel
    }

    pub fn first_column_is_non_discardable_carry_forward(&self) -> bool {
        self.first_column_is_non_discardable_carry_forward
    }

    pub fn starts_with_zero_score(&self) -> bool {
        self.starts_with_zero_score
    }

    pub fn fleets(&self) -> &[Fleet] {
        &self.fleets
    }

    pub fn fleet(&self, name: &str) -> Option<&Fleet> {
        self.fleets.iter().find(|fleet| fleet.name() == name)
    }

    /// Columns of this series in race order.
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    /// Parallel fleets without a structural order: their column results
    /// are not comparable rank for rank until every fleet has raced.
    pub fn is_unordered_group(&self) -> bool {
        self.fleets_run_in_parallel
            && self.fleets.len() > 1
            && !self.fleets.iter().all(Fleet::is_ordered)
    }

    pub(crate) fn push_column(&mut self, column: ColumnId) {
        self.columns.push(column);
    }

    pub(crate) fn add_fleet(&mut self, fleet: Fleet) {
        if self.fleet(fleet.name()).is_none() {
            self.fleets.push(fleet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fleet_when_none_declared() {
        let series = Series::from_definition(&SeriesDefinition::new("Opening"));
        assert_eq!(series.fleets().len(), 1);
        assert!(!series.is_unordered_group());
    }

    #[test]
    fn test_unordered_group_detection() {
        let qualification = Series::from_definition(
            &SeriesDefinition::new("Qualification")
                .fleets_run_in_parallel()
                .with_fleet(Fleet::new("Yellow"))
                .with_fleet(Fleet::new("Blue")),
        );
        assert!(qualification.is_unordered_group());

        let final_series = Series::from_definition(
            &SeriesDefinition::new("Final")
                .fleets_run_in_parallel()
                .with_fleet(Fleet::ordered("Gold", 1))
                .with_fleet(Fleet::ordered("Silver", 2)),
        );
        assert!(!final_series.is_unordered_group());
    }
}
