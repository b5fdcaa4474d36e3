//! Best-effort user positioning.
//!
//! [`LocationProvider`] wraps a platform [`GeolocationCapability`] and always
//! resolves to a [`Coordinate`]: any platform failure is logged, recorded as
//! a diagnostic, and replaced by the configured fallback.

pub mod capability;
pub mod error;
pub mod options;
pub mod provider;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use capability::*;
pub use error::*;
pub use options::*;
pub use provider::*;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserGeolocation;

pub use foundation::Coordinate;
