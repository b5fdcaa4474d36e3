//! Glue between a controller shared with the UI shell and the async
//! location provider.
//!
//! The shell owns the only strong reference. Everything that can fire later
//! (a location request, a watch update, a zoom gesture) holds a `Weak` and
//! gives up quietly once the view is gone.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use location::{GeolocationCapability, LocationProvider, WatchSubscription};
use tracing::{debug, warn};

use crate::controller::{ControllerError, LocationTicket, MapViewController};
use crate::renderer::MapHandle;

pub type SharedController<H> = Rc<RefCell<MapViewController<H>>>;

pub fn share<H: MapHandle>(controller: MapViewController<H>) -> SharedController<H> {
    Rc::new(RefCell::new(controller))
}

/// Resolve one location and apply it under `ticket`.
///
/// Returns `false` when the view was dropped, torn down, or busy by the time
/// the result arrived.
pub async fn locate<H, C>(
    controller: Weak<RefCell<MapViewController<H>>>,
    ticket: LocationTicket,
    provider: &LocationProvider<C>,
) -> bool
where
    H: MapHandle,
    C: GeolocationCapability,
{
    let coordinate = provider.request_location().await;
    if ticket.is_stale() {
        debug!("location resolved after teardown; discarded");
        return false;
    }
    let Some(controller) = controller.upgrade() else {
        debug!("location resolved after the view was dropped; discarded");
        return false;
    };
    let Ok(mut view) = controller.try_borrow_mut() else {
        warn!("map view busy; location result dropped");
        return false;
    };
    view.apply_location(&ticket, coordinate)
}

/// Mount the view and drive its single location request to completion.
pub async fn mount_and_locate<H, C>(
    controller: &SharedController<H>,
    provider: &LocationProvider<C>,
) -> Result<bool, ControllerError>
where
    H: MapHandle,
    C: GeolocationCapability,
{
    let ticket = controller.borrow_mut().mount()?;
    Ok(locate(Rc::downgrade(controller), ticket, provider).await)
}

/// Keep the view centered on continuous position updates.
///
/// Dropping the returned subscription stops the watch.
pub fn follow_location<H, C>(
    controller: &SharedController<H>,
    provider: &LocationProvider<C>,
) -> WatchSubscription<C>
where
    H: MapHandle + 'static,
    C: GeolocationCapability,
{
    let weak = Rc::downgrade(controller);
    provider.start_watching(move |coordinate| {
        let Some(controller) = weak.upgrade() else {
            return;
        };
        match controller.try_borrow_mut() {
            Ok(mut view) => {
                view.update_location(coordinate);
            }
            Err(_) => warn!("map view busy; location update dropped"),
        }
    })
}

/// Route the renderer's zoom-end notifications into the controller.
///
/// Returns `false` when no renderer is attached yet.
pub fn bind_zoom_events<H>(controller: &SharedController<H>) -> bool
where
    H: MapHandle + 'static,
{
    let weak = Rc::downgrade(controller);
    controller
        .borrow_mut()
        .listen_for_zoom(Box::new(move |zoom| {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            match controller.try_borrow_mut() {
                Ok(mut view) => {
                    view.on_zoom_changed(zoom);
                }
                Err(_) => warn!(zoom, "map view busy; zoom event dropped"),
            }
        }))
}
