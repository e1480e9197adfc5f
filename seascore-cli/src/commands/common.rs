//! Regatta sheets and helpers shared across CLI commands.
//!
//! A regatta sheet is a JSON description of a regatta: its series, fleets
//! and race columns, the finish order of every race, and the jury's
//! corrections. Loading a sheet produces a ready-to-query [`Leaderboard`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use seascore::{
    BoatClass, Competitor, ConfigFile, FinishOrderRace, Fleet, Leaderboard, MaxPointsReason,
    Regatta, ScoringScheme, SeriesDefinition, ThresholdDiscardingRule, TimePoint,
};

use crate::error::CliError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegattaSheet {
    pub name: String,
    #[serde(default)]
    pub boat_class: Option<String>,
    /// Falls back to the configured scheme.
    #[serde(default)]
    pub scoring_scheme: Option<ScoringScheme>,
    /// Falls back to the configured thresholds.
    #[serde(default)]
    pub discard_thresholds: Option<Vec<u32>>,
    pub series: Vec<SeriesSheet>,
    #[serde(default)]
    pub competitors: Vec<CompetitorSheet>,
    #[serde(default)]
    pub races: Vec<RaceSheet>,
    #[serde(default)]
    pub corrections: Vec<CorrectionSheet>,
    #[serde(default)]
    pub carried_points: HashMap<String, f64>,
    #[serde(default)]
    pub column_factors: HashMap<String, f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesSheet {
    pub name: String,
    #[serde(default)]
    pub medal: bool,
    #[serde(default)]
    pub fleets_run_in_parallel: bool,
    #[serde(default)]
    pub first_column_is_carry_forward: bool,
    #[serde(default)]
    pub starts_with_zero_score: bool,
    #[serde(default)]
    pub fleets: Vec<Fleet>,
    pub columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompetitorSheet {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaceSheet {
    pub column: String,
    #[serde(default)]
    pub fleet: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// RFC 3339; races without a start never count.
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Competitor ids, winner first.
    #[serde(default)]
    pub finish_order: Vec<String>,
    /// Registered for the race but not in the finish order.
    #[serde(default)]
    pub non_finishers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorrectionSheet {
    pub competitor: String,
    pub column: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reason: Option<MaxPointsReason>,
}

impl RegattaSheet {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|e| CliError::Sheet(format!("{}: {}", path.display(), e)))
    }

    fn regatta(&self, config: &ConfigFile) -> Result<Regatta, CliError> {
        let rule = match &self.discard_thresholds {
            Some(thresholds) => ThresholdDiscardingRule::new(thresholds.clone())?,
            None => config.scoring.discarding_rule.clone(),
        };
        let mut builder = Regatta::builder(&self.name)
            .scoring_scheme(self.scoring_scheme.unwrap_or(config.scoring.scheme))
            .discarding_rule(rule);
        if let Some(class) = &self.boat_class {
            builder = builder.boat_class(BoatClass::new(class));
        }
        for series in &self.series {
            builder = builder.series(series.definition());
        }
        Ok(builder.build()?)
    }

    /// Build the leaderboard described by this sheet.
    pub fn build(&self, config: &ConfigFile) -> Result<Leaderboard, CliError> {
        let board = Leaderboard::for_regatta(&self.regatta(config)?, &config.leaderboard)?;
        let roster = Roster::new(&self.competitors);

        for competitor in &self.competitors {
            let resolved = roster.get(&competitor.id);
            board.add_competitor(resolved.clone());
            if competitor.display_name.is_some() {
                board.set_competitor_display_name(&resolved, competitor.display_name.clone());
            }
        }

        for race in &self.races {
            let tracked = race.to_race(&roster)?;
            board.add_race(Arc::new(tracked), &race.column, false, race.fleet.as_deref())?;
        }

        for (column, factor) in &self.column_factors {
            board.set_column_factor(column_id(&board, column)?, Some(*factor))?;
        }

        for (competitor, points) in &self.carried_points {
            board.set_carried_points(&roster.get(competitor), *points);
        }

        let corrections = board.score_correction();
        for correction in &self.corrections {
            let competitor = roster.get(&correction.competitor);
            let column = column_id(&board, &correction.column)?;
            if let Some(score) = correction.score {
                corrections.correct_score(&competitor, column, score)?;
            }
            if correction.reason.is_some() {
                corrections.set_max_points_reason(&competitor, column, correction.reason)?;
            }
        }
        if self.comment.is_some() {
            corrections.set_comment(self.comment.clone());
        }

        tracing::debug!(
            regatta = %self.name,
            races = self.races.len(),
            corrections = self.corrections.len(),
            "regatta sheet loaded"
        );
        Ok(board)
    }
}

impl SeriesSheet {
    fn definition(&self) -> SeriesDefinition {
        let mut definition = SeriesDefinition::new(&self.name).with_race_columns(self.columns.iter().cloned());
        if self.medal {
            definition = definition.medal();
        }
        if self.fleets_run_in_parallel {
            definition = definition.fleets_run_in_parallel();
        }
        if self.first_column_is_carry_forward {
            definition = definition.first_column_is_carry_forward();
        }
        if self.starts_with_zero_score {
            definition = definition.starts_with_zero_score();
        }
        for fleet in &self.fleets {
            definition = definition.with_fleet(fleet.clone());
        }
        definition
    }
}

impl RaceSheet {
    fn to_race(&self, roster: &Roster) -> Result<FinishOrderRace, CliError> {
        let name = self.name.clone().unwrap_or_else(|| match &self.fleet {
            Some(fleet) => format!("{} {}", self.column, fleet),
            None => self.column.clone(),
        });
        let finish_order: Vec<Competitor> = self.finish_order.iter().map(|id| roster.get(id)).collect();
        let non_finishers = self.non_finishers.iter().map(|id| roster.get(id));

        let race = match &self.start {
            Some(start) => {
                let race = FinishOrderRace::new(name, parse_time(start)?, finish_order);
                match &self.end {
                    Some(end) => race.with_end(parse_time(end)?),
                    None => race,
                }
            }
            None => FinishOrderRace::unscheduled(name, finish_order),
        };
        Ok(race.with_non_finishers(non_finishers))
    }
}

/// Competitors declared in the sheet; undeclared ids become bare competitors.
struct Roster {
    by_id: HashMap<String, Competitor>,
}

impl Roster {
    fn new(competitors: &[CompetitorSheet]) -> Self {
        let by_id = competitors
            .iter()
            .map(|c| {
                let name = c.name.clone().unwrap_or_else(|| c.id.clone());
                (c.id.clone(), Competitor::new(&c.id, name))
            })
            .collect();
        Self { by_id }
    }

    fn get(&self, id: &str) -> Competitor {
        self.by_id
            .get(id)
            .cloned()
            .unwrap_or_else(|| Competitor::named(id))
    }
}

fn column_id(board: &Leaderboard, name: &str) -> Result<seascore::ColumnId, CliError> {
    board
        .race_column_by_name(name)
        .map(|column| column.id())
        .ok_or_else(|| CliError::Sheet(format!("unknown race column '{}'", name)))
}

/// Parse an RFC 3339 timestamp.
pub fn parse_time(value: &str) -> Result<TimePoint, CliError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| TimePoint::from(dt.with_timezone(&Utc)))
        .map_err(|_| CliError::InvalidTime(value.to_string()))
}

/// Load the configuration from `path`, or the default location.
pub fn load_config(path: Option<&PathBuf>) -> Result<ConfigFile, CliError> {
    Ok(match path {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHEET: &str = r#"{
        "name": "Spring Cup",
        "boat_class": "ILCA 7",
        "discard_thresholds": [2],
        "series": [{ "name": "Opening", "columns": ["R1", "R2"] }],
        "competitors": [
            { "id": "GER 1", "name": "Anna" },
            { "id": "GER 2", "display_name": "Team Two" }
        ],
        "races": [
            { "column": "R1", "start": "2024-04-01T10:00:00Z", "end": "2024-04-01T11:00:00Z",
              "finish_order": ["GER 1", "GER 2", "GER 3"] },
            { "column": "R2", "start": "2024-04-01T12:00:00Z",
              "finish_order": ["GER 2", "GER 3"], "non_finishers": ["GER 1"] }
        ],
        "corrections": [{ "competitor": "GER 1", "column": "R2", "reason": "DNF" }],
        "comment": "Provisional"
    }"#;

    fn write_sheet(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_time() {
        let at = parse_time("2024-04-01T10:00:00Z").unwrap();
        assert_eq!(at.as_millis(), 1_711_965_600_000);
        assert!(matches!(parse_time("yesterday"), Err(CliError::InvalidTime(_))));
    }

    #[test]
    fn test_sheet_builds_leaderboard() {
        let file = write_sheet(SHEET);
        let sheet = RegattaSheet::load(file.path()).unwrap();
        let board = sheet.build(&ConfigFile::default()).unwrap();

        let at = parse_time("2024-04-01T13:00:00Z").unwrap();
        let anna = Competitor::named("GER 1");
        let r2 = board.race_column_by_name("R2").unwrap().id();
        assert_eq!(board.get_net_points(&anna, r2, at).unwrap(), Some(4.0));
        // Two races, one discard: the DNF goes.
        assert_eq!(board.get_total_points(&anna, at).unwrap(), Some(1.0));
        assert_eq!(
            board.competitor_display_name(&Competitor::named("GER 2")).as_deref(),
            Some("Team Two")
        );
        assert_eq!(board.score_correction().comment().as_deref(), Some("Provisional"));
    }

    #[test]
    fn test_demo_sheet_standings() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/spring-cup.json");
        let board = RegattaSheet::load(&path).unwrap().build(&ConfigFile::default()).unwrap();

        let at = parse_time("2024-04-04T00:00:00Z").unwrap();
        let ranking: Vec<String> = board
            .get_competitors_from_best_to_worst(at)
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(ranking, ["NED-7", "GER-1", "DEN-3", "FRA-9"]);
        assert_eq!(board.get_total_points(&Competitor::named("NED-7"), at).unwrap(), Some(5.0));
    }

    #[test]
    fn test_unknown_column_in_correction() {
        let sheet = SHEET.replace(r#""column": "R2", "reason""#, r#""column": "R9", "reason""#);
        let file = write_sheet(&sheet);
        let err = RegattaSheet::load(file.path())
            .unwrap()
            .build(&ConfigFile::default())
            .unwrap_err();
        assert!(matches!(err, CliError::Sheet(_)));
    }

    #[test]
    fn test_malformed_sheet() {
        let file = write_sheet("{ \"name\": 3 }");
        assert!(matches!(RegattaSheet::load(file.path()), Err(CliError::Sheet(_))));
    }
}
