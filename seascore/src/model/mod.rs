//! Regatta structure: fleets, series, race columns.
//!
//! A regatta is an ordered list of series. Each series owns an ordered list
//! of race columns and a set of fleets, and every column can have one
//! tracked race bound per fleet. The structure is declared once through
//! [`Regatta::builder`]; afterwards only race bindings and corrections change.

mod column;
mod fleet;
mod regatta;
mod series;

pub use column::{ColumnId, RaceColumn};
pub use fleet::{Fleet, DEFAULT_FLEET_NAME};
pub use regatta::{BoatClass, Regatta, RegattaBuilder};
pub use series::{Series, SeriesDefinition};
