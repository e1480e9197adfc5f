//! `seascore check`: validate a regatta sheet without printing standings.

use std::path::{Path, PathBuf};

use seascore::TimePoint;

use super::common::{load_config, RegattaSheet};
use crate::error::CliError;

pub fn run(sheet: &Path, config_path: Option<&PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let loaded = RegattaSheet::load(sheet)?;
    let board = loaded.build(&config)?;

    let columns = board.race_columns();
    let bound: usize = columns.iter().map(|column| column.tracked_races().count()).sum();
    let empty: Vec<&str> = columns
        .iter()
        .filter(|column| !column.has_tracked_races() && !column.is_carry_forward())
        .map(|column| column.name())
        .collect();

    // Ranking once surfaces errors from every bound race.
    board.get_competitors_from_best_to_worst(TimePoint::now())?;

    println!("{}: OK", sheet.display());
    println!("  Scheme:       {}", board.scoring_scheme());
    println!("  Series:       {}", board.series().len());
    println!("  Race columns: {} ({} races bound)", columns.len(), bound);
    println!("  Competitors:  {}", board.competitors().len());
    println!("  Corrections:  {}", loaded.corrections.len());
    if !empty.is_empty() {
        println!("  Without race: {}", empty.join(", "));
    }
    Ok(())
}
