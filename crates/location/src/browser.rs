use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Reflect;
use tokio::sync::oneshot;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::capability::{Fix, GeolocationCapability, WatchCallback, WatchId};
use crate::error::LocationError;
use crate::options::PositionOptions;

type JsCallback = Closure<dyn FnMut(JsValue)>;

/// `navigator.geolocation` as a [`GeolocationCapability`].
///
/// Watch closures are owned here until the watch is cleared, since the
/// browser only keeps a borrowed function reference.
#[derive(Default)]
pub struct BrowserGeolocation {
    watches: RefCell<HashMap<i32, (JsCallback, JsCallback)>>,
}

impl BrowserGeolocation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeolocationCapability for BrowserGeolocation {
    async fn current_position(&self, options: &PositionOptions) -> Result<Fix, LocationError> {
        let geo = navigator_geolocation()?;
        let (tx, rx) = oneshot::channel::<Result<Fix, LocationError>>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let on_fix: JsCallback = {
            let tx = Rc::clone(&tx);
            Closure::new(move |pos: JsValue| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(fix_from_js(&pos));
                }
            })
        };
        let on_error: JsCallback = {
            let tx = Rc::clone(&tx);
            Closure::new(move |err: JsValue| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(Err(error_from_js(&err)));
                }
            })
        };

        geo.get_current_position_with_error_callback_and_options(
            on_fix.as_ref().unchecked_ref(),
            Some(on_error.as_ref().unchecked_ref()),
            &js_options(options),
        )
        .map_err(|_| LocationError::CapabilityUnavailable)?;

        // Closures stay alive until the browser has answered.
        let result = rx.await.unwrap_or(Err(LocationError::PositionUnavailable));
        drop((on_fix, on_error));
        result
    }

    fn watch_position(
        &self,
        options: &PositionOptions,
        callback: WatchCallback,
    ) -> Result<WatchId, LocationError> {
        let geo = navigator_geolocation()?;
        let shared = Rc::new(RefCell::new(callback));

        let on_fix: JsCallback = {
            let cb = Rc::clone(&shared);
            Closure::new(move |pos: JsValue| (&mut *cb.borrow_mut())(fix_from_js(&pos)))
        };
        let on_error: JsCallback = {
            let cb = Rc::clone(&shared);
            Closure::new(move |err: JsValue| (&mut *cb.borrow_mut())(Err(error_from_js(&err))))
        };

        let id = geo
            .watch_position_with_error_callback_and_options(
                on_fix.as_ref().unchecked_ref(),
                Some(on_error.as_ref().unchecked_ref()),
                &js_options(options),
            )
            .map_err(|_| LocationError::CapabilityUnavailable)?;

        self.watches.borrow_mut().insert(id, (on_fix, on_error));
        Ok(WatchId(i64::from(id)))
    }

    fn clear_watch(&self, id: WatchId) {
        let Ok(raw) = i32::try_from(id.0) else {
            return;
        };
        if self.watches.borrow_mut().remove(&raw).is_none() {
            return;
        }
        if let Ok(geo) = navigator_geolocation() {
            geo.clear_watch(raw);
        }
    }
}

fn navigator_geolocation() -> Result<web_sys::Geolocation, LocationError> {
    let win = web_sys::window().ok_or(LocationError::CapabilityUnavailable)?;
    win.navigator()
        .geolocation()
        .map_err(|_| LocationError::CapabilityUnavailable)
}

fn js_options(options: &PositionOptions) -> web_sys::PositionOptions {
    let js = web_sys::PositionOptions::new();
    js.set_enable_high_accuracy(options.high_accuracy);
    js.set_timeout(options.timeout_ms());
    js.set_maximum_age(options.maximum_age_ms());
    js
}

fn number(obj: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_f64())
}

fn fix_from_js(pos: &JsValue) -> Result<Fix, LocationError> {
    let coords = Reflect::get(pos, &JsValue::from_str("coords"))
        .map_err(|_| LocationError::InvalidFix("missing coords".to_string()))?;
    Fix::from_reported(
        number(&coords, "latitude"),
        number(&coords, "longitude"),
        number(&coords, "accuracy"),
    )
}

fn error_from_js(err: &JsValue) -> LocationError {
    LocationError::from_reported_code(number(err, "code"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use js_sys::Object;
    use wasm_bindgen_test::wasm_bindgen_test;

    fn object(fields: &[(&str, JsValue)]) -> JsValue {
        let obj = Object::new();
        for (key, value) in fields {
            Reflect::set(&obj, &JsValue::from_str(key), value).unwrap();
        }
        obj.into()
    }

    #[wasm_bindgen_test]
    fn position_object_becomes_a_fix() {
        let coords = object(&[
            ("latitude", JsValue::from_f64(51.5)),
            ("longitude", JsValue::from_f64(-0.12)),
            ("accuracy", JsValue::from_f64(20.0)),
        ]);
        let pos = object(&[("coords", coords)]);
        assert_eq!(
            fix_from_js(&pos),
            Ok(Fix { latitude: 51.5, longitude: -0.12, accuracy_m: Some(20.0) })
        );
    }

    #[wasm_bindgen_test]
    fn position_without_coords_is_invalid() {
        let pos = object(&[("timestamp", JsValue::from_f64(0.0))]);
        assert!(matches!(fix_from_js(&pos), Err(LocationError::InvalidFix(_))));
        let coords = object(&[("latitude", JsValue::from_str("51.5"))]);
        let pos = object(&[("coords", coords)]);
        assert!(matches!(fix_from_js(&pos), Err(LocationError::InvalidFix(_))));
    }

    #[wasm_bindgen_test]
    fn error_object_code_is_mapped() {
        let denied = object(&[("code", JsValue::from_f64(1.0))]);
        assert_eq!(error_from_js(&denied), LocationError::PermissionDenied);
        let timeout = object(&[("code", JsValue::from_f64(3.0))]);
        assert_eq!(error_from_js(&timeout), LocationError::Timeout);
        assert_eq!(error_from_js(&JsValue::NULL), LocationError::PositionUnavailable);
    }
}
