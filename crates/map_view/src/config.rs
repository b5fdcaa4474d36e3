use foundation::Coordinate;
use layers::{HeatmapConfig, MarkerConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ZOOM: u8 = 15;
/// Listener markers are hidden below this zoom to avoid clutter.
pub const DEFAULT_MIN_LISTENER_ZOOM: u8 = 14;
pub const DEFAULT_FLY_DURATION_MS: u32 = 1_200;
pub const MIN_ZOOM: u8 = 2;
pub const MAX_ZOOM: u8 = 19;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Center shown before any location resolves.
    pub initial_center: Coordinate,
    pub initial_zoom: u8,
    /// Zoom used by recenter animations.
    pub target_zoom: u8,
    pub min_listener_zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub fly_duration_ms: u32,
    /// Seed of the first derivation; later ones advance from it.
    pub base_seed: u64,
    pub markers: MarkerConfig,
    pub heatmap: HeatmapConfig,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            initial_center: Coordinate::landmark(),
            initial_zoom: DEFAULT_ZOOM,
            target_zoom: DEFAULT_ZOOM,
            min_listener_zoom: DEFAULT_MIN_LISTENER_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            fly_duration_ms: DEFAULT_FLY_DURATION_MS,
            base_seed: 0,
            markers: MarkerConfig::default(),
            heatmap: HeatmapConfig::default(),
        }
    }
}

impl ViewConfig {
    pub fn clamp_zoom(&self, zoom: u8) -> u8 {
        let (lo, hi) = if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            (self.max_zoom, self.min_zoom)
        };
        zoom.clamp(lo, hi)
    }
}
