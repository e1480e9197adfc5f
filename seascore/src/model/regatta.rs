use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{LeaderboardError, LeaderboardResult};
use crate::model::SeriesDefinition;
use crate::scoring::{ScoringScheme, ThresholdDiscardingRule};

/// The class of boat sailed in a regatta.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoatClass {
    name: String,
}

impl BoatClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A regatta declaration: ordered series plus the scoring rules.
#[derive(Debug, Clone)]
pub struct Regatta {
    name: String,
    boat_class: Option<BoatClass>,
    series: Vec<SeriesDefinition>,
    scoring_scheme: ScoringScheme,
    discarding_rule: ThresholdDiscardingRule,
}

impl Regatta {
    pub fn builder(name: impl Into<String>) -> RegattaBuilder {
        RegattaBuilder {
            name: name.into(),
            boat_class: None,
            series: Vec::new(),
            scoring_scheme: ScoringScheme::default(),
            discarding_rule: ThresholdDiscardingRule::none(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boat_class(&self) -> Option<&BoatClass> {
        self.boat_class.as_ref()
    }

    pub fn series(&self) -> &[SeriesDefinition] {
        &self.series
    }

    pub fn scoring_scheme(&self) -> ScoringScheme {
        self.scoring_scheme
    }

    pub fn discarding_rule(&self) -> &ThresholdDiscardingRule {
        &self.discarding_rule
    }
}

/// Builder for [`Regatta`].
#[derive(Debug, Clone)]
pub struct RegattaBuilder {
    name: String,
    boat_class: Option<BoatClass>,
    series: Vec<SeriesDefinition>,
    scoring_scheme: ScoringScheme,
    discarding_rule: ThresholdDiscardingRule,
}

impl RegattaBuilder {
    pub fn boat_class(mut self, boat_class: BoatClass) -> Self {
        self.boat_class = Some(boat_class);
        self
    }

    pub fn scoring_scheme(mut self, scheme: ScoringScheme) -> Self {
        self.scoring_scheme = scheme;
        self
    }

    pub fn discarding_rule(mut self, rule: ThresholdDiscardingRule) -> Self {
        self.discarding_rule = rule;
        self
    }

    /// Append a series; series keep the order they are added in.
    pub fn series(mut self, series: SeriesDefinition) -> Self {
        self.series.push(series);
        self
    }

    /// Validate names and build the regatta.
    ///
    /// # Errors
    ///
    /// Series names and column names must be unique within the regatta.
    pub fn build(self) -> LeaderboardResult<Regatta> {
        let mut series_names = HashSet::new();
        let mut column_names = HashSet::new();
        for series in &self.series {
            if !series_names.insert(series.name.as_str()) {
                return Err(LeaderboardError::DuplicateSeries(series.name.clone()));
            }
            for column in &series.column_names {
                if !column_names.insert(column.as_str()) {
                    return Err(LeaderboardError::DuplicateRaceColumn(column.clone()));
                }
            }
        }

        Ok(Regatta {
            name: self.name,
            boat_class: self.boat_class,
            series: self.series,
            scoring_scheme: self.scoring_scheme,
            discarding_rule: self.discarding_rule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_keeps_series_order() {
        let regatta = Regatta::builder("Kieler Woche")
            .boat_class(BoatClass::new("49er"))
            .series(SeriesDefinition::new("Qualification").with_race_columns(["Q1"]))
            .series(SeriesDefinition::new("Final").with_race_columns(["F1"]))
            .build()
            .unwrap();

        let names: Vec<&str> = regatta.series().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Qualification", "Final"]);
        assert_eq!(regatta.boat_class().unwrap().name(), "49er");
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Regatta::builder("R")
            .series(SeriesDefinition::new("A").with_race_columns(["R1"]))
            .series(SeriesDefinition::new("B").with_race_columns(["R1"]))
            .build();
        assert!(matches!(result, Err(LeaderboardError::DuplicateRaceColumn(name)) if name == "R1"));
    }

    #[test]
    fn test_duplicate_series_rejected() {
        let result = Regatta::builder("R")
            .series(SeriesDefinition::new("A"))
            .series(SeriesDefinition::new("A"))
            .build();
        assert!(matches!(result, Err(LeaderboardError::DuplicateSeries(_))));
    }
}
