use foundation::Coordinate;
use serde::{Deserialize, Serialize};

use crate::jitter::{Jitter, seeded_rng};

const HEAT_STREAM: u64 = 2;

/// Points drawn per cluster at most.
pub const MAX_CLUSTER_POINTS: usize = 10_000;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub intensity: f32,
}

/// A group of activity points scattered around the center.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatCluster {
    pub count: usize,
    pub spread_deg: f64,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapConfig {
    pub clusters: Vec<HeatCluster>,
    pub radius_px: u32,
    pub blur_px: u32,
    /// Zoom at which points reach full intensity.
    pub max_zoom: u8,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            clusters: vec![
                // Album hotspot.
                HeatCluster { count: 20, spread_deg: 0.0005, intensity: 0.9 },
                // Mixed listening.
                HeatCluster { count: 25, spread_deg: 0.001, intensity: 0.6 },
                // Background users.
                HeatCluster { count: 15, spread_deg: 0.0015, intensity: 0.3 },
            ],
            radius_px: 25,
            blur_px: 20,
            max_zoom: 17,
        }
    }
}

impl HeatmapConfig {
    /// Points [`derive_heatmap`] will produce.
    pub fn point_count(&self) -> usize {
        self.clusters
            .iter()
            .fold(0usize, |n, c| n.saturating_add(c.count.min(MAX_CLUSTER_POINTS)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub points: Vec<HeatPoint>,
    pub radius_px: u32,
    pub blur_px: u32,
    pub max_zoom: u8,
}

pub fn derive_heatmap(center: &Coordinate, config: &HeatmapConfig, seed: u64) -> Heatmap {
    let mut rng = seeded_rng(seed, HEAT_STREAM);
    let mut points = Vec::with_capacity(config.point_count());
    for cluster in &config.clusters {
        let jitter = Jitter::new(cluster.spread_deg);
        let intensity = cluster.intensity.clamp(0.0, 1.0);
        for _ in 0..cluster.count.min(MAX_CLUSTER_POINTS) {
            let p = jitter.apply(center, &mut rng);
            points.push(HeatPoint {
                latitude: p.latitude(),
                longitude: p.longitude(),
                intensity,
            });
        }
    }
    Heatmap {
        points,
        radius_px: config.radius_px,
        blur_px: config.blur_px,
        max_zoom: config.max_zoom,
    }
}
