use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default upper bound on a single position request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8_000);

/// Options passed to the platform for every request and watch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Oldest cached fix the platform may return. Zero means a fresh fix only.
    #[serde(with = "millis")]
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }
}

impl PositionOptions {
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn timeout_ms(&self) -> u32 {
        u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX)
    }

    pub fn maximum_age_ms(&self) -> u32 {
        u32::try_from(self.maximum_age.as_millis()).unwrap_or(u32::MAX)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
