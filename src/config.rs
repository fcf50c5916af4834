//! Configuration Module
//! Settings shared by the summary and map commands, loadable from a JSON file.

use crate::charts::MapOptions;
use crate::data::DataLoader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}'", .0.display())]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}'", .0.display())]
    Parse(PathBuf, #[source] serde_json::Error),
}

/// Where accident files live and how maps are drawn.
///
/// Every field is optional in the JSON file; missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the `accident_<year>.csv.bz2` files.
    pub data_dir: PathBuf,
    /// GeoJSON state-boundary file for the base map.
    pub boundaries: Option<PathBuf>,
    /// PNG file that maps are written to.
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        let map = MapOptions::default();
        Self {
            data_dir: PathBuf::from("."),
            boundaries: map.boundaries,
            output: map.output,
            width: map.width,
            height: map.height,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub fn loader(&self) -> DataLoader {
        DataLoader::new(&self.data_dir)
    }

    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            output: self.output.clone(),
            width: self.width,
            height: self.height,
            boundaries: self.boundaries.clone(),
            annotate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("fars.json");
        std::fs::write(&path, r#"{ "data_dir": "/data/fars", "width": 1024 }"#)?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/data/fars"));
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, 600);
        assert_eq!(config.output, PathBuf::from("map.png"));
        assert_eq!(config.loader().data_dir(), Path::new("/data/fars"));
        Ok(())
    }

    #[test]
    fn map_options_follow_config() {
        let config = Config {
            boundaries: Some(PathBuf::from("states.geojson")),
            ..Config::default()
        };
        let options = config.map_options();
        assert_eq!(options.boundaries, Some(PathBuf::from("states.geojson")));
        assert_eq!(options.width, 800);
        assert!(options.annotate);
    }

    #[test]
    fn unreadable_or_invalid_files_fail() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::from_file(&dir.path().join("absent.json")),
            Err(ConfigError::Read(..))
        ));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ width: ").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(..))));
    }
}
