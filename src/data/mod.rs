//! Data module - accident file loading and monthly summaries

mod coerce;
#[cfg(test)]
pub(crate) mod fixtures;
mod loader;
mod processor;

pub use coerce::IntegerLike;
pub use loader::{
    make_filename, read_accidents, AccidentRecord, DataLoader, LoaderError, LATITUDE, LONGITUDE,
    MONTH, STATE, YEAR,
};
pub use processor::{DataProcessor, ProcessorError, SummaryRow, SummaryTable, YearLoad};
