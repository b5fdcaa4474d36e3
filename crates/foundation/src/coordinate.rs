use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest valid latitude magnitude (degrees).
pub const MAX_LATITUDE_DEG: f64 = 90.0;
/// Largest valid longitude magnitude (degrees).
pub const MAX_LONGITUDE_DEG: f64 = 180.0;

/// Latitude of the static landmark used when no position is known (Berkeley, CA).
pub const LANDMARK_LATITUDE_DEG: f64 = 37.8715;
/// Longitude of the static landmark used when no position is known.
pub const LANDMARK_LONGITUDE_DEG: f64 = -122.2730;
pub const LANDMARK_LABEL: &str = "Berkeley";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is not a finite value in [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is not a finite value in [-180, 180]")]
    Longitude(f64),
}

/// A resolved WGS84 position in decimal degrees.
///
/// Values are immutable once built: every "change" (offsetting, relabeling)
/// produces a new `Coordinate`. Construction validates that both components
/// are finite and in range, so a `Coordinate` in hand is always drawable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    label: Option<String>,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        let coord = Coordinate::new(raw.latitude, raw.longitude)?;
        Ok(match raw.label {
            Some(label) => coord.with_label(label),
            None => coord,
        })
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || latitude.abs() > MAX_LATITUDE_DEG {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || longitude.abs() > MAX_LONGITUDE_DEG {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            label: None,
        })
    }

    pub fn labeled(
        latitude: f64,
        longitude: f64,
        label: impl Into<String>,
    ) -> Result<Self, CoordinateError> {
        Ok(Self::new(latitude, longitude)?.with_label(label))
    }

    /// The hard-coded landmark shown before (or instead of) a real fix.
    pub fn landmark() -> Self {
        Self {
            latitude: LANDMARK_LATITUDE_DEG,
            longitude: LANDMARK_LONGITUDE_DEG,
            label: Some(LANDMARK_LABEL.to_string()),
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..self
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// `[lat, lng]` pair in the order map libraries expect.
    pub fn lat_lng(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }

    /// Shift by a degree offset. The label is not carried over.
    ///
    /// Latitude is clamped to the poles and longitude wraps across the
    /// antimeridian, so the result is always valid.
    pub fn offset(&self, d_lat: f64, d_lng: f64) -> Self {
        let latitude = (self.latitude + d_lat).clamp(-MAX_LATITUDE_DEG, MAX_LATITUDE_DEG);
        Self {
            latitude,
            longitude: wrap_longitude(self.longitude + d_lng),
            label: None,
        }
    }

    /// Per-axis degree delta from `origin` to `self`.
    pub fn delta_from(&self, origin: &Coordinate) -> (f64, f64) {
        let d_lat = self.latitude - origin.latitude;
        let d_lng = wrap_longitude(self.longitude - origin.longitude);
        (d_lat, d_lng)
    }

    /// Same position, ignoring labels.
    pub fn same_position(&self, other: &Coordinate) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::landmark()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)?;
        if let Some(label) = &self.label {
            write!(f, " {label}")?;
        }
        Ok(())
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-MAX_LONGITUDE_DEG..=MAX_LONGITUDE_DEG).contains(&lng) {
        return lng;
    }
    (lng + MAX_LONGITUDE_DEG).rem_euclid(2.0 * MAX_LONGITUDE_DEG) - MAX_LONGITUDE_DEG
}

#[cfg(test)]
mod tests {
    use super::{Coordinate, CoordinateError, LANDMARK_LATITUDE_DEG, LANDMARK_LONGITUDE_DEG};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn rejects_non_finite_and_out_of_range() {
        assert!(matches!(
            Coordinate::new(f64::NAN, 0.0),
            Err(CoordinateError::Latitude(_))
        ));
        assert!(matches!(
            Coordinate::new(91.0, 0.0),
            Err(CoordinateError::Latitude(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, -180.5),
            Err(CoordinateError::Longitude(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, f64::INFINITY),
            Err(CoordinateError::Longitude(_))
        ));
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn landmark_is_berkeley() {
        let c = Coordinate::landmark();
        assert_eq!(c.latitude(), LANDMARK_LATITUDE_DEG);
        assert_eq!(c.longitude(), LANDMARK_LONGITUDE_DEG);
        assert_eq!(c.label(), Some("Berkeley"));
        assert_eq!(Coordinate::default(), c);
    }

    #[test]
    fn offset_produces_new_value_and_drops_label() {
        let base = Coordinate::labeled(10.0, 20.0, "home").unwrap();
        let moved = base.offset(0.5, -0.25);
        assert_close(moved.latitude(), 10.5, 1e-12);
        assert_close(moved.longitude(), 19.75, 1e-12);
        assert_eq!(moved.label(), None);
        assert_eq!(base.label(), Some("home"));
    }

    #[test]
    fn offset_clamps_latitude_and_wraps_longitude() {
        let c = Coordinate::new(89.9, 179.9).unwrap();
        let moved = c.offset(1.0, 0.2);
        assert_eq!(moved.latitude(), 90.0);
        assert_close(moved.longitude(), -179.9, 1e-9);
    }

    #[test]
    fn delta_from_crosses_antimeridian_short_way() {
        let a = Coordinate::new(0.0, 179.9).unwrap();
        let b = Coordinate::new(0.0, -179.9).unwrap();
        let (d_lat, d_lng) = b.delta_from(&a);
        assert_close(d_lat, 0.0, 1e-12);
        assert_close(d_lng, 0.2, 1e-9);
    }

    #[test]
    fn deserialize_validates() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 1.5, "longitude": 2.5, "label": "x"}"#).unwrap();
        assert_eq!(ok.lat_lng(), [1.5, 2.5]);
        assert_eq!(ok.label(), Some("x"));

        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude": 100.0, "longitude": 0.0}"#);
        assert!(bad.is_err());
    }
}
