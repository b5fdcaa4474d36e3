use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use foundation::Coordinate;

use crate::error::LocationError;
use crate::options::PositionOptions;

/// A raw position report from the platform, before validation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, when reported.
    pub accuracy_m: Option<f64>,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
        }
    }

    /// Build a fix from the fields a platform report carried.
    ///
    /// Both axes are required; an accuracy that is not a finite,
    /// non-negative radius is dropped.
    pub fn from_reported(
        latitude: Option<f64>,
        longitude: Option<f64>,
        accuracy_m: Option<f64>,
    ) -> Result<Self, LocationError> {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(LocationError::InvalidFix("missing latitude/longitude".to_string()));
        };
        Ok(Self {
            latitude,
            longitude,
            accuracy_m: accuracy_m.filter(|a| a.is_finite() && *a >= 0.0),
        })
    }

    pub fn into_coordinate(self) -> Result<Coordinate, LocationError> {
        Coordinate::new(self.latitude, self.longitude)
            .map_err(|e| LocationError::InvalidFix(e.to_string()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub i64);

pub type WatchCallback = Box<dyn FnMut(Result<Fix, LocationError>)>;

/// The platform's location capability.
///
/// Implementations make a single attempt per `current_position` call and do
/// not retry. Watch callbacks are invoked on the calling thread.
pub trait GeolocationCapability {
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<Fix, LocationError>>;

    fn watch_position(
        &self,
        options: &PositionOptions,
        callback: WatchCallback,
    ) -> Result<WatchId, LocationError>;

    /// Clearing an unknown or already-cleared id is a no-op.
    fn clear_watch(&self, id: WatchId);
}

/// An environment without geolocation (headless, unsupported browser).
#[derive(Debug, Default, Copy, Clone)]
pub struct UnavailableCapability;

impl GeolocationCapability for UnavailableCapability {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Fix, LocationError> {
        Err(LocationError::CapabilityUnavailable)
    }

    fn watch_position(
        &self,
        _options: &PositionOptions,
        _callback: WatchCallback,
    ) -> Result<WatchId, LocationError> {
        Err(LocationError::CapabilityUnavailable)
    }

    fn clear_watch(&self, _id: WatchId) {}
}

/// What a [`SimulatedCapability`] answers to position requests.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedOutcome {
    Fix(Fix),
    Fail(LocationError),
    /// Never answers; only the request timeout ends the attempt.
    Hang,
}

/// Scriptable platform used by the demo binary and in tests.
///
/// Watches are registered like on a real platform; [`SimulatedCapability::push`]
/// delivers a report to every active watch.
#[derive(Default)]
pub struct SimulatedCapability {
    outcome: RefCell<Option<SimulatedOutcome>>,
    watch_supported: bool,
    watches: RefCell<BTreeMap<WatchId, WatchCallback>>,
    /// Watches cleared while their callback was out of `watches`.
    cleared: RefCell<BTreeSet<WatchId>>,
    next_watch: Cell<i64>,
    requests: Cell<usize>,
    last_options: Cell<Option<PositionOptions>>,
}

impl SimulatedCapability {
    pub fn new(outcome: SimulatedOutcome) -> Self {
        Self {
            outcome: RefCell::new(Some(outcome)),
            watch_supported: true,
            ..Self::default()
        }
    }

    pub fn answering(latitude: f64, longitude: f64) -> Self {
        Self::new(SimulatedOutcome::Fix(Fix::new(latitude, longitude)))
    }

    pub fn failing(err: LocationError) -> Self {
        Self::new(SimulatedOutcome::Fail(err))
    }

    pub fn hanging() -> Self {
        Self::new(SimulatedOutcome::Hang)
    }

    pub fn without_watch(mut self) -> Self {
        self.watch_supported = false;
        self
    }

    pub fn set_outcome(&self, outcome: SimulatedOutcome) {
        *self.outcome.borrow_mut() = Some(outcome);
    }

    /// Deliver a report to every active watch.
    pub fn push(&self, report: Result<Fix, LocationError>) {
        // The map is not borrowed while a callback runs.
        let ids: Vec<WatchId> = self.watches.borrow().keys().copied().collect();
        for id in ids {
            let Some(mut cb) = self.watches.borrow_mut().remove(&id) else {
                continue;
            };
            cb(report.clone());
            if !self.cleared.borrow_mut().remove(&id) {
                self.watches.borrow_mut().insert(id, cb);
            }
        }
        self.cleared.borrow_mut().clear();
    }

    pub fn active_watches(&self) -> usize {
        self.watches.borrow().len()
    }

    pub fn request_count(&self) -> usize {
        self.requests.get()
    }

    pub fn last_options(&self) -> Option<PositionOptions> {
        self.last_options.get()
    }
}

impl GeolocationCapability for SimulatedCapability {
    async fn current_position(&self, options: &PositionOptions) -> Result<Fix, LocationError> {
        self.requests.set(self.requests.get() + 1);
        self.last_options.set(Some(*options));
        let outcome = self.outcome.borrow().clone();
        match outcome {
            Some(SimulatedOutcome::Fix(fix)) => Ok(fix),
            Some(SimulatedOutcome::Fail(err)) => Err(err),
            Some(SimulatedOutcome::Hang) => std::future::pending().await,
            None => Err(LocationError::CapabilityUnavailable),
        }
    }

    fn watch_position(
        &self,
        options: &PositionOptions,
        callback: WatchCallback,
    ) -> Result<WatchId, LocationError> {
        if !self.watch_supported {
            return Err(LocationError::CapabilityUnavailable);
        }
        self.last_options.set(Some(*options));
        let id = WatchId(self.next_watch.get());
        self.next_watch.set(id.0 + 1);
        self.watches.borrow_mut().insert(id, callback);
        Ok(id)
    }

    fn clear_watch(&self, id: WatchId) {
        let removed = self.watches.borrow_mut().remove(&id).is_some();
        if !removed && id.0 < self.next_watch.get() {
            // Possibly running inside `push`; keep it from being put back.
            self.cleared.borrow_mut().insert(id);
        }
    }
}

impl std::fmt::Debug for SimulatedCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedCapability")
            .field("outcome", &self.outcome.borrow())
            .field("watch_supported", &self.watch_supported)
            .field("active_watches", &self.watches.borrow().len())
            .field("requests", &self.requests.get())
            .finish()
    }
}
