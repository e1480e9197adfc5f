//! `seascore standings`: print the leaderboard of a regatta sheet.

use std::path::PathBuf;

use clap::Args;
use seascore::{LeaderboardEntry, LeaderboardSnapshot, SnapshotRequest, TimePoint};

use super::common::{load_config, parse_time, RegattaSheet};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct StandingsArgs {
    /// Regatta sheet (JSON)
    pub sheet: PathBuf,

    /// Evaluate as of this time (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<String>,

    /// Print the snapshot as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the overall ranking after each race column
    #[arg(long)]
    pub per_column: bool,

    /// Only show these race columns (comma separated); totals still use all
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
}

pub fn run(args: StandingsArgs, config_path: Option<&PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let board = RegattaSheet::load(&args.sheet)?.build(&config)?;
    let at = match &args.at {
        Some(value) => parse_time(value)?,
        None => TimePoint::now(),
    };
    let request = if args.columns.is_empty() {
        SnapshotRequest::all()
    } else {
        SnapshotRequest::columns(args.columns.iter().cloned())
    };

    let snapshot = board.get_leaderboard_snapshot(at, &request)?;
    if args.json {
        println!("{}", snapshot.to_json()?);
        return Ok(());
    }

    print!("{}", render_table(&snapshot));

    if args.per_column {
        println!();
        println!("Ranking after each race");
        println!("=======================");
        for (column, ranking) in board.get_ranked_competitors_from_best_to_worst_after_each_race_column(at)? {
            let name = board.race_column(column)?.name().to_string();
            let ids: Vec<&str> = ranking.iter().map(|c| c.id()).collect();
            println!("{:<8} {}", name, ids.join(", "));
        }
    }
    Ok(())
}

/// Fixed-width standings table.
pub fn render_table(snapshot: &LeaderboardSnapshot) -> String {
    let mut out = String::new();
    let title = snapshot.display_name.as_deref().unwrap_or(&snapshot.name);
    out.push_str(&format!("{} ({}) as of {}\n\n", title, snapshot.scoring_scheme, snapshot.time_point));

    out.push_str(&format!("{:>4}  {:<24}", "Rank", "Competitor"));
    for column in &snapshot.columns {
        let marker = if column.is_valid_in_total_score { "" } else { "*" };
        out.push_str(&format!(" {:>8}", format!("{}{}", column.name, marker)));
    }
    out.push_str(&format!(" {:>8}\n", "Total"));

    for row in &snapshot.rows {
        let name = row.display_name.as_deref().unwrap_or(row.competitor.name());
        out.push_str(&format!("{:>4}  {:<24}", row.rank, truncate(name, 24)));
        for entry in &row.entries {
            out.push_str(&format!(" {:>8}", cell(&entry.entry)));
        }
        out.push_str(&format!(" {:>8}\n", points(row.total_points)));
    }

    if snapshot.columns.iter().any(|column| !column.is_valid_in_total_score) {
        out.push_str("\n* not yet counted in totals\n");
    }
    if let Some(comment) = &snapshot.score_correction_comment {
        out.push_str(&format!("\nNote: {}\n", comment));
    }
    out
}

/// `3`, `(31)` when discarded, `DSQ 6` for penalties, `-` when unscored.
fn cell(entry: &LeaderboardEntry) -> String {
    let Some(net) = entry.net_points else {
        return "-".to_string();
    };
    let value = match entry.max_points_reason {
        Some(reason) => format!("{} {}", reason, format_points(net)),
        None => format_points(net),
    };
    if entry.is_discarded {
        format!("({})", value)
    } else {
        value
    }
}

fn points(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), format_points)
}

fn format_points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn truncate(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use seascore::MaxPointsReason;

    #[test]
    fn test_cell_formats() {
        let mut entry = LeaderboardEntry {
            net_points: Some(31.0),
            ..Default::default()
        };
        assert_eq!(cell(&entry), "31");

        entry.is_discarded = true;
        assert_eq!(cell(&entry), "(31)");

        entry.is_discarded = false;
        entry.max_points_reason = Some(MaxPointsReason::Dsq);
        entry.net_points = Some(6.0);
        assert_eq!(cell(&entry), "DSQ 6");

        assert_eq!(cell(&LeaderboardEntry::default()), "-");
    }

    #[test]
    fn test_points_format() {
        assert_eq!(points(Some(1.5)), "1.5");
        assert_eq!(points(Some(12.0)), "12");
        assert_eq!(points(None), "-");
    }

    #[test]
    fn test_empty_table_has_header() {
        let snapshot = LeaderboardSnapshot::empty("Empty", TimePoint::from_millis(0), 0);
        let table = render_table(&snapshot);
        assert!(table.starts_with("Empty (low_point)"));
        assert!(table.contains("Rank"));
    }
}
