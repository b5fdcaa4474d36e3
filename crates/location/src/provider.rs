use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use foundation::Coordinate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capability::{Fix, GeolocationCapability, WatchCallback, WatchId};
use crate::error::LocationError;
use crate::options::PositionOptions;

/// Which coordinate stands in when the platform cannot deliver one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "coordinate")]
pub enum FallbackPolicy {
    /// The static landmark, see [`Coordinate::landmark`].
    #[default]
    Landmark,
    /// A configured mock-user position.
    MockUser(Coordinate),
}

impl FallbackPolicy {
    pub fn coordinate(&self) -> Coordinate {
        match self {
            FallbackPolicy::Landmark => Coordinate::landmark(),
            FallbackPolicy::MockUser(c) => c.clone(),
        }
    }
}

type Diagnostics = Rc<RefCell<Option<LocationError>>>;

/// Resolves the user's position, degrading to a fallback instead of failing.
pub struct LocationProvider<C> {
    capability: Rc<C>,
    options: PositionOptions,
    fallback: Coordinate,
    last_failure: Diagnostics,
}

impl<C: GeolocationCapability> LocationProvider<C> {
    pub fn new(capability: C) -> Self {
        Self {
            capability: Rc::new(capability),
            options: PositionOptions::default(),
            fallback: Coordinate::landmark(),
            last_failure: Rc::new(RefCell::new(None)),
        }
    }

    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy.coordinate();
        self
    }

    pub fn capability(&self) -> &C {
        &self.capability
    }

    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    pub fn fallback(&self) -> &Coordinate {
        &self.fallback
    }

    /// The most recent failure, cleared by the next successful fix.
    pub fn last_failure(&self) -> Option<LocationError> {
        self.last_failure.borrow().clone()
    }

    /// One timeout-bounded attempt at a fresh fix.
    ///
    /// Never fails: on any platform error the configured fallback is returned
    /// as-is. Concurrent calls are independent of each other.
    pub async fn request_location(&self) -> Coordinate {
        let attempt = self.capability.current_position(&self.options);
        let result = bounded(self.options, attempt)
            .await
            .and_then(Fix::into_coordinate);

        match result {
            Ok(coord) => {
                debug!(lat = coord.latitude(), lng = coord.longitude(), "location resolved");
                self.last_failure.borrow_mut().take();
                coord
            }
            Err(err) => {
                record_failure(&self.last_failure, &err);
                warn!(error = %err, fallback = %self.fallback, "location unavailable; using fallback");
                self.fallback.clone()
            }
        }
    }

    /// Continuous positioning.
    ///
    /// `on_update` is guaranteed at least one call: when the platform cannot
    /// watch, it receives the fallback before this returns, and a watch that
    /// errors before its first fix also delivers the fallback once. Errors
    /// after a real fix are only logged, the last good position stands.
    pub fn start_watching(
        &self,
        on_update: impl FnMut(Coordinate) + 'static,
    ) -> WatchSubscription<C> {
        let sink: Rc<RefCell<dyn FnMut(Coordinate)>> = Rc::new(RefCell::new(on_update));

        let callback: WatchCallback = {
            let sink = Rc::clone(&sink);
            let failures = Rc::clone(&self.last_failure);
            let fallback = self.fallback.clone();
            let mut delivered = false;
            Box::new(move |report: Result<Fix, LocationError>| {
                match report.and_then(Fix::into_coordinate) {
                    Ok(coord) => {
                        delivered = true;
                        failures.borrow_mut().take();
                        (&mut *sink.borrow_mut())(coord);
                    }
                    Err(err) => {
                        record_failure(&failures, &err);
                        if delivered {
                            warn!(error = %err, "watch error; keeping last position");
                        } else {
                            delivered = true;
                            warn!(error = %err, "watch error before first fix; using fallback");
                            (&mut *sink.borrow_mut())(fallback.clone());
                        }
                    }
                }
            })
        };

        match self.capability.watch_position(&self.options, callback) {
            Ok(id) => {
                debug!(watch = id.0, "location watch started");
                WatchSubscription {
                    capability: Rc::clone(&self.capability),
                    id: Some(id),
                }
            }
            Err(err) => {
                record_failure(&self.last_failure, &err);
                warn!(error = %err, "location watch unavailable; delivering fallback once");
                (&mut *sink.borrow_mut())(self.fallback.clone());
                WatchSubscription {
                    capability: Rc::clone(&self.capability),
                    id: None,
                }
            }
        }
    }

    /// Same as [`WatchSubscription::stop`].
    pub fn stop_watching(&self, subscription: &mut WatchSubscription<C>) -> bool {
        subscription.stop()
    }
}

impl<C> std::fmt::Debug for LocationProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationProvider")
            .field("options", &self.options)
            .field("fallback", &self.fallback)
            .field("last_failure", &self.last_failure.borrow())
            .finish()
    }
}

/// Handle to a running (or never started) position watch.
///
/// Dropping the subscription releases the platform watch.
pub struct WatchSubscription<C: GeolocationCapability> {
    capability: Rc<C>,
    id: Option<WatchId>,
}

impl<C: GeolocationCapability> WatchSubscription<C> {
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    /// Release the platform watch. Returns `false` when nothing was active.
    pub fn stop(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        self.capability.clear_watch(id);
        debug!(watch = id.0, "location watch stopped");
        true
    }
}

impl<C: GeolocationCapability> Drop for WatchSubscription<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<C: GeolocationCapability> std::fmt::Debug for WatchSubscription<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription").field("id", &self.id).finish()
    }
}

fn record_failure(slot: &Diagnostics, err: &LocationError) {
    *slot.borrow_mut() = Some(err.clone());
}

// The browser enforces `options.timeout` itself; natively the provider does.
#[cfg(not(target_arch = "wasm32"))]
async fn bounded<F>(options: PositionOptions, attempt: F) -> Result<Fix, LocationError>
where
    F: Future<Output = Result<Fix, LocationError>>,
{
    let limit: Duration = options.timeout;
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_elapsed) => Err(LocationError::Timeout),
    }
}

#[cfg(target_arch = "wasm32")]
async fn bounded<F>(_options: PositionOptions, attempt: F) -> Result<Fix, LocationError>
where
    F: Future<Output = Result<Fix, LocationError>>,
{
    attempt.await
}
