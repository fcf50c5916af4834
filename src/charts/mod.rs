//! Charts module - State accident map rendering

mod basemap;
mod map;

pub use basemap::{BaseMap, StateBoundary};
pub use map::{
    scrub_sentinels, BoundingBox, MapError, MapOptions, MapOutcome, StateMap, StateMapper,
    LATITUDE_SENTINEL, LONGITUDE_SENTINEL,
};
