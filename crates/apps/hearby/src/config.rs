use std::path::{Path, PathBuf};

use layers::{MockSource, SourceError};
use location::{FallbackPolicy, PositionOptions};
use map_view::ViewConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid mock source {path}: {source}")]
    Source { path: PathBuf, source: SourceError },
}

/// Everything the demo shell can tune. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HearbyConfig {
    pub location: PositionOptions,
    pub fallback: FallbackPolicy,
    pub view: ViewConfig,
    /// JSON file of listener records; the built-in demo set when absent.
    pub source: Option<PathBuf>,
}

impl HearbyConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn mock_source(&self) -> Result<MockSource, ConfigError> {
        let Some(path) = &self.source else {
            return Ok(MockSource::demo());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        MockSource::from_json(&raw).map_err(|source| ConfigError::Source {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::Coordinate;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn empty_object_is_the_default() {
        let c = HearbyConfig::from_json("{}").unwrap();
        assert_eq!(c, HearbyConfig::default());
        assert_eq!(c.location.timeout, Duration::from_millis(8_000));
        assert_eq!(c.view.target_zoom, 15);
        assert_eq!(c.fallback, FallbackPolicy::Landmark);
    }

    #[test]
    fn nested_overrides() {
        let c = HearbyConfig::from_json(
            r#"{
                "location": {"timeout": 2500},
                "fallback": {"kind": "mock_user", "coordinate": {"latitude": 37.87, "longitude": -122.26}},
                "view": {"base_seed": 7, "min_listener_zoom": 13}
            }"#,
        )
        .unwrap();
        assert_eq!(c.location.timeout, Duration::from_millis(2_500));
        assert!(c.location.high_accuracy);
        assert_eq!(
            c.fallback,
            FallbackPolicy::MockUser(Coordinate::new(37.87, -122.26).unwrap())
        );
        assert_eq!((c.view.base_seed, c.view.min_listener_zoom), (7, 13));
        assert_eq!(c.view.fly_duration_ms, 1_200);
    }

    #[test]
    fn demo_source_when_unset() {
        assert_eq!(HearbyConfig::default().mock_source().unwrap().len(), 6);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = HearbyConfig::load(Path::new("/nonexistent/hearby.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/hearby.json"));
    }
}
