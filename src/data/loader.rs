//! CSV Data Loader Module
//! Locates yearly FARS accident files and loads them into validated Polars DataFrames.

use super::coerce::IntegerLike;
use bzip2::read::MultiBzDecoder;
use polars::prelude::*;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const STATE: &str = "STATE";
pub const MONTH: &str = "MONTH";
pub const LATITUDE: &str = "LATITUDE";
pub const LONGITUDE: &str = "LONGITUD";
/// Column added to every row, holding the year its file was loaded for.
pub const YEAR: &str = "year";

/// Every bzip2 stream starts with these bytes.
const BZIP2_MAGIC: &[u8] = b"BZh";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("file '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),
    #[error("'{0}' is not an integer")]
    NotAnInteger(String),
    #[error("Failed to read '{}'", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to decompress '{}'", .0.display())]
    Decompress(PathBuf, #[source] std::io::Error),
    #[error("Failed to load CSV '{}'", .0.display())]
    Csv(PathBuf, #[source] PolarsError),
    #[error("Required column '{column}' not found in '{}'", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Column '{column}' in '{}' cannot be read as {expected}", .path.display())]
    InvalidColumn {
        path: PathBuf,
        column: &'static str,
        expected: &'static str,
        #[source]
        source: PolarsError,
    },
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Build the canonical file name for a year of accident data.
///
/// The year is truncated to an integer; no range check is made, so any
/// integer yields a well-formed name whether or not the file exists.
pub fn make_filename<Y: IntegerLike + ?Sized>(year: &Y) -> Result<String, LoaderError> {
    let year = year.to_integer()?;
    Ok(format!("accident_{}.csv.bz2", year))
}

/// Read an accident CSV file, decompressing it first when it is bzip2 data.
///
/// The returned DataFrame keeps every column of the file. The columns
/// STATE and MONTH are guaranteed to be Int64, LATITUDE and LONGITUD Float64.
pub fn read_accidents(path: impl AsRef<Path>) -> Result<DataFrame, LoaderError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoaderError::FileNotFound(path.to_path_buf()));
    }

    let raw = std::fs::read(path).map_err(|e| LoaderError::Io(path.to_path_buf(), e))?;
    let bytes = if raw.starts_with(BZIP2_MAGIC) {
        let mut decompressed = Vec::new();
        MultiBzDecoder::new(raw.as_slice())
            .read_to_end(&mut decompressed)
            .map_err(|e| LoaderError::Decompress(path.to_path_buf(), e))?;
        debug!(
            "Decompressed {} bytes to {} bytes from {:?}",
            raw.len(),
            decompressed.len(),
            path
        );
        decompressed
    } else {
        raw
    };

    // Scan the whole file for schema inference: coordinate columns can look
    // integral for thousands of rows before the first fractional value.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| LoaderError::Csv(path.to_path_buf(), e))?;

    debug!("Loaded {} rows x {} columns from {:?}", df.height(), df.width(), path);
    validate_schema(df, path)
}

/// Columns every accident file must carry, with the type they are read as.
fn required_columns() -> [(&'static str, DataType, &'static str); 4] {
    [
        (STATE, DataType::Int64, "integer"),
        (MONTH, DataType::Int64, "integer"),
        (LATITUDE, DataType::Float64, "float"),
        (LONGITUDE, DataType::Float64, "float"),
    ]
}

fn validate_schema(mut df: DataFrame, path: &Path) -> Result<DataFrame, LoaderError> {
    for (column, dtype, expected) in required_columns() {
        let typed = df
            .column(column)
            .map_err(|_| LoaderError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })?
            .strict_cast(&dtype)
            .map_err(|source| LoaderError::InvalidColumn {
                path: path.to_path_buf(),
                column,
                expected,
                source,
            })?;
        df.with_column(typed)?;
    }
    Ok(df)
}

/// One accident, reduced to the fields the summaries and maps use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccidentRecord {
    pub state: i64,
    pub month: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AccidentRecord {
    /// Collect typed records from a validated accident DataFrame.
    ///
    /// Rows with a missing STATE or MONTH are skipped.
    pub fn from_dataframe(df: &DataFrame) -> Result<Vec<AccidentRecord>, LoaderError> {
        let states = df.column(STATE)?.i64()?;
        let months = df.column(MONTH)?.i64()?;
        let latitudes = df.column(LATITUDE)?.f64()?;
        let longitudes = df.column(LONGITUDE)?.f64()?;

        let records = states
            .into_iter()
            .zip(months)
            .zip(latitudes)
            .zip(longitudes)
            .filter_map(|(((state, month), latitude), longitude)| {
                Some(AccidentRecord {
                    state: state?,
                    month: month?,
                    latitude,
                    longitude,
                })
            })
            .collect();
        Ok(records)
    }

    /// The (longitude, latitude) position, when both are known.
    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

/// Resolves accident files for a year inside a data directory.
#[derive(Debug, Clone)]
pub struct DataLoader {
    data_dir: PathBuf,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the accident file for a year.
    pub fn path_for_year<Y: IntegerLike + ?Sized>(&self, year: &Y) -> Result<PathBuf, LoaderError> {
        Ok(self.data_dir.join(make_filename(year)?))
    }

    /// Load the full accident table for a year.
    pub fn read_year<Y: IntegerLike + ?Sized>(&self, year: &Y) -> Result<DataFrame, LoaderError> {
        read_accidents(self.path_for_year(year)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{write_csv, write_plain_csv, SAMPLE_CSV};
    use tempfile::TempDir;

    #[test]
    fn filename_follows_the_year() {
        assert_eq!(make_filename(&2013).unwrap(), "accident_2013.csv.bz2");
        assert_eq!(make_filename("2014").unwrap(), "accident_2014.csv.bz2");
        assert_eq!(make_filename(&2015.8).unwrap(), "accident_2015.csv.bz2");
        assert_eq!(make_filename(&-3).unwrap(), "accident_-3.csv.bz2");
    }

    #[test]
    fn filename_is_deterministic() {
        for year in ["1999", "2013.2", "20130"] {
            let as_integer = year.to_integer().unwrap();
            assert_eq!(make_filename(year).unwrap(), make_filename(&as_integer).unwrap());
            assert_eq!(make_filename(year).unwrap(), make_filename(year).unwrap());
        }
    }

    #[test]
    fn filename_rejects_text() {
        assert!(matches!(
            make_filename("next year"),
            Err(LoaderError::NotAnInteger(_))
        ));
    }

    #[test]
    fn missing_file_reports_its_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accident_1900.csv.bz2");

        let err = read_accidents(&path).unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound(_)));
        assert!(err.to_string().contains("accident_1900.csv.bz2"));
    }

    #[test]
    fn reads_bzip2_compressed_csv() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write_csv(dir.path(), "accident_2013.csv.bz2", SAMPLE_CSV);

        let df = read_accidents(&path)?;
        assert_eq!(df.height(), 5);
        assert!(df.column("FATALS").is_ok());
        assert_eq!(df.column(STATE)?.dtype(), &DataType::Int64);
        assert_eq!(df.column(LATITUDE)?.dtype(), &DataType::Float64);
        Ok(())
    }

    #[test]
    fn reads_uncompressed_csv() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write_plain_csv(dir.path(), "accident_2013.csv", SAMPLE_CSV);

        let df = read_accidents(&path)?;
        assert_eq!(df.height(), 5);
        Ok(())
    }

    #[test]
    fn integral_coordinates_become_floats() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write_csv(
            dir.path(),
            "accident_2013.csv.bz2",
            "STATE,MONTH,LATITUDE,LONGITUD\n1,2,40,-75\n",
        );

        let df = read_accidents(&path)?;
        assert_eq!(df.column(LONGITUDE)?.dtype(), &DataType::Float64);
        assert_eq!(df.column(LONGITUDE)?.f64()?.get(0), Some(-75.0));
        Ok(())
    }

    #[test]
    fn missing_required_column_fails_fast() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "accident_2013.csv.bz2",
            "STATE,MONTH,LATITUDE\n1,2,40.0\n",
        );

        match read_accidents(&path) {
            Err(LoaderError::MissingColumn { column, .. }) => assert_eq!(column, LONGITUDE),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn mistyped_required_column_fails_fast() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "accident_2013.csv.bz2",
            "STATE,MONTH,LATITUDE,LONGITUD\nAL,2,40.0,-75.0\n",
        );

        match read_accidents(&path) {
            Err(LoaderError::InvalidColumn { column, .. }) => assert_eq!(column, STATE),
            other => panic!("expected InvalidColumn, got {:?}", other),
        }
    }

    #[test]
    fn records_keep_unknown_coordinates_as_given() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write_csv(dir.path(), "accident_2013.csv.bz2", SAMPLE_CSV);

        let records = AccidentRecord::from_dataframe(&read_accidents(&path)?)?;
        assert_eq!(records.len(), 5);
        assert_eq!(
            records[0],
            AccidentRecord {
                state: 1,
                month: 3,
                latitude: Some(40.0),
                longitude: Some(-75.0),
            }
        );
        assert_eq!(records[0].location(), Some((-75.0, 40.0)));
        Ok(())
    }

    #[test]
    fn loader_resolves_files_in_its_directory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        write_csv(dir.path(), "accident_2013.csv.bz2", SAMPLE_CSV);
        let loader = DataLoader::new(dir.path());

        assert_eq!(
            loader.path_for_year("2013")?,
            dir.path().join("accident_2013.csv.bz2")
        );
        assert_eq!(loader.read_year(&2013)?.height(), 5);
        assert!(matches!(
            loader.read_year(&2014),
            Err(LoaderError::FileNotFound(_))
        ));
        Ok(())
    }
}
