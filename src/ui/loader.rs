//! Background loading of the star catalog and the observer location.
//!
//! This module starts the async work an overlay session needs and routes the
//! results back: the catalog goes straight into the shared cache (so a load
//! that outlives its session still benefits the next one), and geolocation
//! answers go through the overlay's channel tagged with the session id.

use super::state::GeolocationResult;
use crate::catalog::{Catalog, CatalogCache, CatalogSource};
use crate::error::SkyError;
use eframe::egui;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::sync::Arc;

#[cfg(target_arch = "wasm32")]
use crate::types::Observer;
#[cfg(target_arch = "wasm32")]
use std::sync::atomic::Ordering;

/// Loads the catalog for a fetch claimed from the cache.
///
/// Bundled and inline sources complete immediately. Path sources are read on
/// the async runtime natively, or fetched relative to the page on the web.
///
/// # Arguments
///
/// * `source` - Where to load from
/// * `cache` - Cache that receives the result
/// * `ctx` - The egui context for requesting a repaint once loaded
pub fn fetch_catalog(source: CatalogSource, cache: CatalogCache, ctx: &egui::Context) {
    match source {
        CatalogSource::Bundled => cache.complete(Catalog::bundled()),
        CatalogSource::Inline(json) => cache.complete(Catalog::from_json(&json)),
        CatalogSource::Path(path) => {
            let ctx = ctx.clone();

            #[cfg(not(target_arch = "wasm32"))]
            {
                let task = async move {
                    cache.complete(read_catalog_file(&path));
                    ctx.request_repaint();
                };
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(task);
                    }
                    Err(_) => {
                        log::debug!("No async runtime; reading catalog on the UI thread");
                        futures::executor::block_on(task);
                    }
                }
            }

            #[cfg(target_arch = "wasm32")]
            {
                wasm_bindgen_futures::spawn_local(async move {
                    let result = match fetch_text(&path).await {
                        Ok(json) => Catalog::from_json(&json),
                        Err(e) => Err(e),
                    };
                    cache.complete(result);
                    ctx.request_repaint();
                });
            }
        }
    }
}

/// Reads and parses a catalog file.
#[cfg(not(target_arch = "wasm32"))]
fn read_catalog_file(path: &str) -> Result<Catalog, SkyError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| SkyError::CatalogLoad(format!("{path}: {e}")))?;
    Catalog::from_json(&json)
}

/// Fetches a text asset relative to the page (WASM only).
#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str) -> Result<String, SkyError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let load_error = |e: wasm_bindgen::JsValue| SkyError::CatalogLoad(format!("{url}: {e:?}"));

    let window =
        web_sys::window().ok_or_else(|| SkyError::CatalogLoad("No window found".to_string()))?;

    let init = web_sys::RequestInit::new();
    init.set_method("GET");
    init.set_mode(web_sys::RequestMode::SameOrigin);
    let request = web_sys::Request::new_with_str_and_init(url, &init).map_err(load_error)?;

    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(load_error)?
        .dyn_into::<web_sys::Response>()
        .map_err(load_error)?;
    if !response.ok() {
        return Err(SkyError::CatalogLoad(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }

    let text = JsFuture::from(response.text().map_err(load_error)?)
        .await
        .map_err(load_error)?;
    text.as_string()
        .ok_or_else(|| SkyError::CatalogLoad(format!("{url}: response is not text")))
}

/// Asks the device for its location on behalf of a session.
///
/// The answer is sent through `sender` unless the session was cancelled in
/// the meantime. Native builds have no location API and answer immediately
/// with `SkyError::GeolocationUnavailable`.
pub fn request_geolocation(
    session: u64,
    cancelled: Arc<AtomicBool>,
    sender: Sender<GeolocationResult>,
    ctx: &egui::Context,
) {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (cancelled, ctx);
        let _ = sender.send(GeolocationResult {
            session,
            result: Err(SkyError::GeolocationUnavailable(
                "no location API on this platform".to_string(),
            )),
        });
    }

    #[cfg(target_arch = "wasm32")]
    {
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = current_position().await;
            if cancelled.load(Ordering::Relaxed) {
                log::debug!("Dropping location for closed session {session}");
                return;
            }
            let _ = sender.send(GeolocationResult { session, result });
            ctx.request_repaint();
        });
    }
}

/// Resolves the browser's current position (WASM only).
///
/// Bounded by [`crate::constants::GEOLOCATION_TIMEOUT_MS`].
#[cfg(target_arch = "wasm32")]
async fn current_position() -> Result<Observer, SkyError> {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;

    let unavailable = |reason: &str| SkyError::GeolocationUnavailable(reason.to_string());

    let window = web_sys::window().ok_or_else(|| unavailable("no window"))?;
    let geolocation = window
        .navigator()
        .geolocation()
        .map_err(|_| unavailable("geolocation API absent"))?;

    let (sender, receiver) = futures::channel::oneshot::channel::<Result<Observer, SkyError>>();
    let sender = Rc::new(RefCell::new(Some(sender)));

    let on_success = {
        let sender = Rc::clone(&sender);
        Closure::once(move |position: web_sys::GeolocationPosition| {
            let coords = position.coords();
            if let Some(tx) = sender.borrow_mut().take() {
                let _ = tx.send(Ok(Observer::new(coords.latitude(), coords.longitude())));
            }
        })
    };
    let on_error = {
        let sender = Rc::clone(&sender);
        Closure::once(move |error: web_sys::GeolocationPositionError| {
            if let Some(tx) = sender.borrow_mut().take() {
                let _ = tx.send(Err(SkyError::GeolocationUnavailable(error.message())));
            }
        })
    };

    let options = web_sys::PositionOptions::new();
    options.set_timeout(crate::constants::GEOLOCATION_TIMEOUT_MS);
    options.set_maximum_age(10 * 60 * 1000);
    options.set_enable_high_accuracy(false);

    geolocation
        .get_current_position_with_error_callback_and_options(
            on_success.as_ref().unchecked_ref(),
            Some(on_error.as_ref().unchecked_ref()),
            &options,
        )
        .map_err(|_| unavailable("location request rejected"))?;

    // The callbacks must stay alive until one of them has fired.
    let result = receiver.await.map_err(|_| unavailable("location request dropped"));
    drop((on_success, on_error));
    result?
}
