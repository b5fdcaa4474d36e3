use foundation::Coordinate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Largest radius kept; anything wider is clamped to it.
pub const MAX_JITTER_DEG: f64 = 90.0;

/// Bounded uniform positional noise.
///
/// Each axis gets an independent offset drawn uniformly from
/// `[-max_offset_deg, max_offset_deg]`. Deserialized values go through
/// [`Jitter::new`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawJitter")]
pub struct Jitter {
    max_offset_deg: f64,
}

#[derive(Deserialize)]
struct RawJitter {
    max_offset_deg: f64,
}

impl From<RawJitter> for Jitter {
    fn from(raw: RawJitter) -> Self {
        Self::new(raw.max_offset_deg)
    }
}

impl Jitter {
    /// Non-finite or negative radii disable jitter; wide ones are capped
    /// at [`MAX_JITTER_DEG`].
    pub fn new(max_offset_deg: f64) -> Self {
        let max_offset_deg = if max_offset_deg.is_finite() {
            max_offset_deg.clamp(0.0, MAX_JITTER_DEG)
        } else {
            0.0
        };
        Self { max_offset_deg }
    }

    pub fn max_offset_deg(&self) -> f64 {
        self.max_offset_deg
    }

    pub fn none() -> Self {
        Self::new(0.0)
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> (f64, f64) {
        let m = self.max_offset_deg;
        if m <= 0.0 || !m.is_finite() {
            return (0.0, 0.0);
        }
        (rng.gen_range(-m..=m), rng.gen_range(-m..=m))
    }

    pub fn apply<R: Rng>(&self, origin: &Coordinate, rng: &mut R) -> Coordinate {
        let (d_lat, d_lng) = self.sample(rng);
        origin.offset(d_lat, d_lng)
    }
}

/// Deterministic generator for one recomputation.
///
/// `stream` separates independent consumers (markers, heatmap) sharing a seed.
pub fn seeded_rng(seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
