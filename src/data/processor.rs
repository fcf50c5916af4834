//! Data Processor Module
//! Loads several years of accident data and summarizes monthly counts (pivot operation).

use super::coerce::IntegerLike;
use super::loader::{DataLoader, LoaderError, MONTH, YEAR};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Display};
use thiserror::Error;
use tracing::{debug, warn};

const COUNT: &str = "n";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Outcome of loading one requested year.
#[derive(Debug)]
pub enum YearLoad {
    /// MONTH and year columns of every accident in the year's file.
    Loaded { year: i64, frame: DataFrame },
    /// The year could not be loaded; `requested` is the value as given.
    Failed { requested: String, error: LoaderError },
}

impl YearLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, YearLoad::Loaded { .. })
    }
}

/// Monthly accident counts, one row per month and one column per year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryTable {
    years: Vec<i64>,
    rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub month: u32,
    /// Counts in the order of [`SummaryTable::years`]; `None` when the month has no accidents.
    pub counts: Vec<Option<u32>>,
}

impl SummaryTable {
    /// Materialize the wide table from (year, month) counts.
    fn from_counts(years: Vec<i64>, counts: &HashMap<(i64, i64), u32>) -> Self {
        let rows = (1..=12u32)
            .map(|month| SummaryRow {
                month,
                counts: years
                    .iter()
                    .map(|&year| counts.get(&(year, i64::from(month))).copied())
                    .collect(),
            })
            .collect();
        Self { years, rows }
    }

    /// Years with a column in the table, in request order.
    pub fn years(&self) -> &[i64] {
        &self.years
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    /// Count for a month (1-12) and year, if any accidents were recorded.
    pub fn get(&self, month: u32, year: i64) -> Option<u32> {
        let column = self.years.iter().position(|&y| y == year)?;
        self.rows
            .iter()
            .find(|row| row.month == month)
            .and_then(|row| row.counts[column])
    }

    /// Convert to a DataFrame with a MONTH column followed by one column per year.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let months: Vec<i64> = self.rows.iter().map(|row| i64::from(row.month)).collect();
        let mut columns = vec![Column::new(MONTH.into(), months)];

        for (i, year) in self.years.iter().enumerate() {
            let counts: Vec<Option<u32>> = self.rows.iter().map(|row| row.counts[i]).collect();
            columns.push(Column::new(year.to_string().into(), counts));
        }

        DataFrame::new(columns)
    }
}

impl Display for SummaryTable {
    /// Plain-text table, `NA` where a month has no accidents.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}", MONTH)?;
        for year in &self.years {
            write!(f, " {:>6}", year)?;
        }
        writeln!(f)?;

        for row in &self.rows {
            write!(f, "{:>5}", row.month)?;
            for count in &row.counts {
                match count {
                    Some(n) => write!(f, " {:>6}", n)?,
                    None => write!(f, " {:>6}", "NA")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Handles multi-year loading and aggregation.
pub struct DataProcessor;

impl DataProcessor {
    /// Load each requested year, reduced to its MONTH and year columns.
    ///
    /// A year that cannot be loaded is logged as a warning and reported as
    /// [`YearLoad::Failed`]; it never stops the remaining years from loading.
    /// The result has one entry per requested year, in the same order.
    pub fn read_years<Y>(loader: &DataLoader, years: &[Y]) -> Vec<YearLoad>
    where
        Y: IntegerLike + Display,
    {
        years
            .iter()
            .map(|requested| match Self::read_year(loader, requested) {
                Ok((year, frame)) => YearLoad::Loaded { year, frame },
                Err(error) => {
                    warn!(error = %error, "invalid year: {}", requested);
                    YearLoad::Failed {
                        requested: requested.to_string(),
                        error,
                    }
                }
            })
            .collect()
    }

    fn read_year<Y: IntegerLike>(loader: &DataLoader, year: &Y) -> Result<(i64, DataFrame), LoaderError> {
        let year = year.to_integer()?;
        let frame = loader
            .read_year(&year)?
            .lazy()
            .with_column(lit(year).cast(DataType::Int64).alias(YEAR))
            .select([col(MONTH), col(YEAR)])
            .collect()?;
        debug!("Loaded {} accidents for {}", frame.height(), year);
        Ok((year, frame))
    }

    /// Count accidents per month for each requested year.
    ///
    /// Years that fail to load are skipped with a warning; a year requested
    /// more than once is counted once.
    pub fn summarize_years<Y>(loader: &DataLoader, years: &[Y]) -> Result<SummaryTable, ProcessorError>
    where
        Y: IntegerLike + Display,
    {
        let mut valid_years = Vec::new();
        let mut frames = Vec::new();

        for load in Self::read_years(loader, years) {
            if let YearLoad::Loaded { year, frame } = load {
                if !valid_years.contains(&year) {
                    valid_years.push(year);
                    frames.push(frame.lazy());
                }
            }
        }

        let counts = if frames.is_empty() {
            HashMap::new()
        } else {
            Self::count_by_year_month(concat(frames, UnionArgs::default())?)?
        };

        Ok(SummaryTable::from_counts(valid_years, &counts))
    }

    /// Group the long table by (year, MONTH) and count rows per group.
    fn count_by_year_month(long: LazyFrame) -> Result<HashMap<(i64, i64), u32>, ProcessorError> {
        // Empty frames may carry narrower key types than Int64.
        let grouped = long
            .with_columns([
                col(YEAR).cast(DataType::Int64),
                col(MONTH).cast(DataType::Int64),
            ])
            .group_by([col(YEAR), col(MONTH)])
            .agg([len().alias(COUNT)])
            .collect()?;

        let years = grouped.column(YEAR)?.i64()?;
        let months = grouped.column(MONTH)?.i64()?;
        let counts = grouped.column(COUNT)?.cast(&DataType::UInt32)?;
        let counts = counts.u32()?;

        let mut by_year_month = HashMap::new();
        for ((year, month), count) in years.into_iter().zip(months).zip(counts) {
            if let (Some(year), Some(month), Some(count)) = (year, month, count) {
                by_year_month.insert((year, month), count);
            }
        }
        Ok(by_year_month)
    }
}
