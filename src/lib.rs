//! # Sky Overlay
//!
//! A full-viewport night-sky mode for egui apps. Real stars from a small
//! catalog are projected for the observer's location and the current time,
//! then animated into an interactive field.
//!
//! ## Features
//! - Equatorial → horizontal projection using the linear GMST approximation
//! - Click a star to link it to its nearest neighbours; click empty sky to leave
//! - Stars lean toward the pointer and drift in colour when left idle
//! - Flow-field backdrop, faint dust and canonical constellation figures
//! - Shared single-flight catalog cache and optional geolocation (web)

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod constants;
pub mod error;
pub mod field;
pub mod flow;
pub mod projection;
mod types;
mod ui;

// Re-export public types and functions
pub use catalog::{Catalog, CatalogCache, CatalogSource};
pub use error::{ProjectionError, SkyError};
pub use field::{ClickOutcome, FieldState, Link};
pub use projection::{horizontal, project, to_screen, Horizontal};
pub use types::*;
pub use ui::{
    GeolocationResult, OverlayPhase, SkyApp, SkyConfig, SkyOverlay, SkySession, CONFIG_KEY,
};

/// Runs the host application with the sky overlay.
///
/// A multi-threaded tokio runtime is entered for the lifetime of the window so
/// the overlay can load its catalog in the background.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// use sky_overlay::run_app;
///
/// fn main() -> Result<(), eframe::Error> {
///     run_app()
/// }
/// ```
#[cfg(not(target_arch = "wasm32"))]
pub fn run_app() -> Result<(), eframe::Error> {
    let runtime =
        tokio::runtime::Runtime::new().map_err(|e| eframe::Error::AppCreation(Box::new(e)))?;
    let _guard = runtime.enter();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Sky Overlay"),
        ..Default::default()
    };
    eframe::run_native(
        "Sky Overlay",
        options,
        Box::new(|cc| Ok(Box::new(SkyApp::new(cc)))),
    )
}
