//! State Map Renderer
//! Plots the accidents of one state and year over the state-boundary base map.
//!
//! Pipeline:
//! 1. Load the year's accident file
//! 2. Check the state code against the STATE column, then filter to it
//! 3. Replace sentinel coordinates with missing values
//! 4. Size the view from the bounding box of the known coordinates
//! 5. Draw boundary rings, then one dot per located accident, to a PNG

use super::basemap::BaseMap;
use crate::data::{AccidentRecord, DataLoader, IntegerLike, LoaderError, LATITUDE, LONGITUDE, STATE};
use plotters::prelude::*;
use polars::prelude::{col, lit, when, DataFrame, DataType, IntoLazy, LazyFrame, PolarsError, NULL};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// LONGITUD values above this mark an unknown location.
pub const LONGITUDE_SENTINEL: f64 = 900.0;
/// LATITUDE values above this mark an unknown location.
pub const LATITUDE_SENTINEL: f64 = 90.0;

const POINT_COLOR: RGBColor = RGBColor(213, 62, 79);
const BOUNDARY_COLOR: RGBColor = RGBColor(90, 90, 90);
const POINT_RADIUS: i32 = 2;

#[derive(Error, Debug)]
pub enum MapError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("invalid STATE number: {0}")]
    InvalidState(i64),
    #[error("Failed to read state boundaries '{}'", .0.display())]
    BoundariesRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse state boundaries '{}'", .0.display())]
    BoundariesParse(PathBuf, #[source] serde_json::Error),
    #[error("Failed to render map: {0}")]
    Render(String),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Longitude/latitude extent of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Extent of (longitude, latitude) points; `None` for no points.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Self>, (lon, lat)| {
            Some(match acc {
                None => Self {
                    min_lon: lon,
                    max_lon: lon,
                    min_lat: lat,
                    max_lat: lat,
                },
                Some(b) => Self {
                    min_lon: b.min_lon.min(lon),
                    max_lon: b.max_lon.max(lon),
                    min_lat: b.min_lat.min(lat),
                    max_lat: b.max_lat.max(lat),
                },
            })
        })
    }

    /// Extent of the known coordinates of `records`.
    ///
    /// Longitude and latitude ranges are taken independently, each over the
    /// records where that coordinate is present.
    pub fn from_records(records: &[AccidentRecord]) -> Option<Self> {
        let (min_lon, max_lon) = min_max(records.iter().filter_map(|r| r.longitude))?;
        let (min_lat, max_lat) = min_max(records.iter().filter_map(|r| r.latitude))?;
        Some(Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        })
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    /// Grow each side by `fraction` of the span, at least `min_margin` degrees.
    pub fn padded(&self, fraction: f64, min_margin: f64) -> Self {
        let lon_margin = ((self.max_lon - self.min_lon) * fraction).max(min_margin);
        let lat_margin = ((self.max_lat - self.min_lat) * fraction).max(min_margin);
        Self {
            min_lon: self.min_lon - lon_margin,
            max_lon: self.max_lon + lon_margin,
            min_lat: self.min_lat - lat_margin,
            max_lat: self.max_lat + lat_margin,
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
    })
}

/// Replace sentinel coordinates with nulls.
pub fn scrub_sentinels(frame: LazyFrame) -> LazyFrame {
    frame.with_columns([
        when(col(LONGITUDE).gt(lit(LONGITUDE_SENTINEL)))
            .then(lit(NULL).cast(DataType::Float64))
            .otherwise(col(LONGITUDE))
            .alias(LONGITUDE),
        when(col(LATITUDE).gt(lit(LATITUDE_SENTINEL)))
            .then(lit(NULL).cast(DataType::Float64))
            .otherwise(col(LATITUDE))
            .alias(LATITUDE),
    ])
}

/// Output settings for rendered maps.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    /// PNG file to write.
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    /// GeoJSON file with state boundaries; without it only the points are drawn.
    pub boundaries: Option<PathBuf>,
    /// Draw the caption and labelled axes. Needs a system font.
    pub annotate: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from("map.png"),
            width: 800,
            height: 600,
            boundaries: None,
            annotate: true,
        }
    }
}

/// A map that was drawn to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateMap {
    pub state: i64,
    pub year: i64,
    pub bounds: BoundingBox,
    /// Accidents drawn, i.e. those with both coordinates known.
    pub points: usize,
    pub output: PathBuf,
}

/// Result of a map request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    Rendered(StateMap),
    /// Nothing to draw; no file was written.
    NoAccidents,
}

/// Draws per-state accident maps for single years.
pub struct StateMapper {
    loader: DataLoader,
    options: MapOptions,
}

impl StateMapper {
    pub fn new(loader: DataLoader, options: MapOptions) -> Self {
        Self { loader, options }
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Map the accidents of `state` in `year`.
    ///
    /// A missing file or a state code absent from the year's data is an
    /// error. A state with nothing to plot returns [`MapOutcome::NoAccidents`].
    pub fn map_state<S, Y>(&self, state: S, year: Y) -> Result<MapOutcome, MapError>
    where
        S: IntegerLike,
        Y: IntegerLike,
    {
        let year = year.to_integer()?;
        let df = self.loader.read_year(&year)?;

        let state = state.to_integer()?;
        Self::ensure_state_present(&df, state)?;

        let filtered = df.lazy().filter(col(STATE).eq(lit(state))).collect()?;
        if filtered.height() == 0 {
            info!(state, year, "no accidents to plot");
            return Ok(MapOutcome::NoAccidents);
        }

        let scrubbed = scrub_sentinels(filtered.lazy()).collect()?;
        let records = AccidentRecord::from_dataframe(&scrubbed)?;
        self.plot_accidents(state, year, &records)
    }

    fn ensure_state_present(df: &DataFrame, state: i64) -> Result<(), MapError> {
        let present = df
            .column(STATE)?
            .i64()?
            .into_iter()
            .any(|code| code == Some(state));
        if present {
            Ok(())
        } else {
            Err(MapError::InvalidState(state))
        }
    }

    /// Render records whose sentinel coordinates were already scrubbed.
    fn plot_accidents(
        &self,
        state: i64,
        year: i64,
        records: &[AccidentRecord],
    ) -> Result<MapOutcome, MapError> {
        let Some(bounds) = BoundingBox::from_records(records) else {
            info!(state, year, "no accidents to plot");
            return Ok(MapOutcome::NoAccidents);
        };

        let base_map = match &self.options.boundaries {
            Some(path) => BaseMap::from_geojson_file(path)?,
            None => BaseMap::default(),
        };

        let locations: Vec<(f64, f64)> = records.iter().filter_map(AccidentRecord::location).collect();
        let caption = format!("Accidents in state {} ({})", state, year);
        self.render(&caption, &bounds, &base_map, &locations)
            .map_err(|e| MapError::Render(e.to_string()))?;

        debug!(
            "Rendered {} of {} accidents for state {} in {} to {:?}",
            locations.len(),
            records.len(),
            state,
            year,
            self.options.output
        );

        Ok(MapOutcome::Rendered(StateMap {
            state,
            year,
            bounds,
            points: locations.len(),
            output: self.options.output.clone(),
        }))
    }

    fn render(
        &self,
        caption: &str,
        bounds: &BoundingBox,
        base_map: &BaseMap,
        locations: &[(f64, f64)],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let view = bounds.padded(0.05, 0.1);
        let root = BitMapBackend::new(&self.options.output, (self.options.width, self.options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if self.options.annotate {
            builder
                .caption(caption, ("sans-serif", 20))
                .x_label_area_size(30)
                .y_label_area_size(40);
        }
        let mut chart =
            builder.build_cartesian_2d(view.min_lon..view.max_lon, view.min_lat..view.max_lat)?;

        if self.options.annotate {
            chart
                .configure_mesh()
                .disable_mesh()
                .x_desc("Longitude")
                .y_desc("Latitude")
                .draw()?;
        }

        chart.draw_series(
            base_map
                .rings_within(&view)
                .map(|ring| PathElement::new(ring.to_vec(), BOUNDARY_COLOR.stroke_width(1))),
        )?;

        chart.draw_series(
            locations
                .iter()
                .map(|&point| Circle::new(point, POINT_RADIUS, POINT_COLOR.filled())),
        )?;

        root.present()?;
        Ok(())
    }
}
