use thiserror::Error;

/// Why a platform position request did not produce a usable fix.
///
/// None of these ever reach callers of
/// [`LocationProvider::request_location`](crate::LocationProvider::request_location);
/// they are only observable through logs and
/// [`LocationProvider::last_failure`](crate::LocationProvider::last_failure).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The environment has no geolocation support at all.
    #[error("geolocation not supported")]
    CapabilityUnavailable,
    #[error("geolocation permission denied")]
    PermissionDenied,
    /// The platform tried but could not determine a position.
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("geolocation request timed out")]
    Timeout,
    /// The platform reported coordinates that are not a valid position.
    #[error("invalid fix: {0}")]
    InvalidFix(String),
}

impl LocationError {
    /// Map a W3C `GeolocationPositionError.code`.
    pub fn from_platform_code(code: u16) -> Self {
        match code {
            1 => LocationError::PermissionDenied,
            3 => LocationError::Timeout,
            _ => LocationError::PositionUnavailable,
        }
    }

    /// Map a `code` read off a platform error object, which may be missing
    /// or not an integer at all.
    pub fn from_reported_code(code: Option<f64>) -> Self {
        match code {
            Some(c) if c.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&c) => {
                Self::from_platform_code(c as u16)
            }
            _ => LocationError::PositionUnavailable,
        }
    }
}
