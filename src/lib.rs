//! FARS - Accident Data Summaries & State Accident Maps
//!
//! Reads yearly NHTSA Fatality Analysis Reporting System accident files
//! (`accident_<year>.csv.bz2`), counts accidents per month across years and
//! plots the accidents of one state over a state-boundary base map.
//!
//! The two entry points read files from the current directory. Use
//! [`DataProcessor`] and [`StateMapper`] with a [`DataLoader`] to read from
//! somewhere else.

pub mod charts;
pub mod config;
pub mod data;

pub use charts::{BoundingBox, MapError, MapOptions, MapOutcome, StateMap, StateMapper};
pub use config::{Config, ConfigError};
pub use data::{
    make_filename, read_accidents, AccidentRecord, DataLoader, DataProcessor, IntegerLike,
    LoaderError, ProcessorError, SummaryTable, YearLoad,
};

use std::fmt::Display;

/// Monthly accident counts for each year, one column per year that could be loaded.
///
/// ```no_run
/// let summary = fars::summarize_years(&[2013, 2014, 2015])?;
/// println!("{}", summary);
/// # Ok::<(), fars::ProcessorError>(())
/// ```
pub fn summarize_years<Y>(years: &[Y]) -> Result<SummaryTable, ProcessorError>
where
    Y: IntegerLike + Display,
{
    DataProcessor::summarize_years(&DataLoader::default(), years)
}

/// Plot the accidents of `state` in `year` to `map.png`.
///
/// Only the accident points are drawn: no state-boundary base map is loaded.
/// For the boundary layer, set [`MapOptions::boundaries`] to a GeoJSON file
/// and use a [`StateMapper`].
///
/// ```no_run
/// use fars::MapOutcome;
///
/// match fars::map_state(6, "2014")? {
///     MapOutcome::Rendered(map) => println!("{} accidents plotted", map.points),
///     MapOutcome::NoAccidents => {}
/// }
/// # Ok::<(), fars::MapError>(())
/// ```
pub fn map_state<S, Y>(state: S, year: Y) -> Result<MapOutcome, MapError>
where
    S: IntegerLike,
    Y: IntegerLike,
{
    StateMapper::new(DataLoader::default(), MapOptions::default()).map_state(state, year)
}
