//! Overlay state management structures.
//!
//! This module contains the persisted configuration, the overlay state
//! machine, the per-session simulation state and the host application struct.

use crate::catalog::{Catalog, CatalogCache, CatalogSource};
use crate::error::SkyError;
use crate::field::FieldState;
use crate::flow::FlowField;
use crate::types::{Observer, ObserverState};
use chrono::{DateTime, Utc};
use eframe::egui;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Storage key under which [`SkyConfig`] is persisted.
pub const CONFIG_KEY: &str = "sky_config";

/// User-facing configuration, persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Where to load the star catalog from
    pub catalog_source: CatalogSource,
    /// Fixed observer location; skips geolocation when set
    pub observer_override: Option<Observer>,
    /// Whether to ask the device for its location once per session
    pub request_geolocation: bool,
    /// Freeze the sky at this instant instead of following the clock
    pub fixed_time: Option<DateTime<Utc>>,
    /// Draw the canonical constellation figures
    pub show_figures: bool,
    /// Draw the flow layer behind the stars
    pub show_flow_field: bool,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            catalog_source: CatalogSource::default(),
            observer_override: None,
            request_geolocation: true,
            fixed_time: None,
            show_figures: true,
            show_flow_field: true,
        }
    }
}

impl SkyConfig {
    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Instant used for projection this frame.
    pub fn sky_time(&self) -> DateTime<Utc> {
        self.fixed_time.unwrap_or_else(Utc::now)
    }
}

/// Lifecycle of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    /// Not shown; nothing scheduled
    Closed,
    /// Shown, waiting for the catalog
    Loading,
    /// Shown and animating
    Active,
}

/// Geolocation answer sent back from an async request.
#[derive(Debug)]
pub struct GeolocationResult {
    /// Session that asked
    pub session: u64,
    /// Location, or why there is none
    pub result: Result<Observer, SkyError>,
}

/// State owned by one open-to-close lifetime of the overlay.
#[derive(Debug)]
pub struct SkySession {
    /// Identifier used to match async results to this session
    pub id: u64,
    /// Set when the session ends so late async work can bail out
    pub cancelled: Arc<AtomicBool>,
    /// Stars, pointer, idle timer and links
    pub field: FieldState,
    /// Flow layer, rebuilt on resize
    pub flow: Option<FlowField>,
    /// Catalog once loaded (empty if loading failed)
    pub catalog: Option<Arc<Catalog>>,
    /// Observer location for this session
    pub observer: ObserverState,
    /// Faint background dust, normalized to the canvas
    pub dust: Vec<egui::Pos2>,
    /// Time the session opened, in seconds
    pub opened_at: f64,
}

impl SkySession {
    /// Creates a fresh session with no catalog yet.
    pub fn new(id: u64, now: f64, initial_observer: Observer) -> Self {
        let mut rng = rand::rng();
        let dust = (0..crate::constants::DUST_COUNT)
            .map(|_| egui::pos2(rng.random_range(0.0..1.0), rng.random_range(0.0..1.0)))
            .collect();

        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
            field: FieldState::new(now),
            flow: None,
            catalog: None,
            observer: ObserverState::new(initial_observer),
            dust,
            opened_at: now,
        }
    }

    /// Marks the session as finished for any async work still holding its token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the session has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// The sky overlay: configuration, state machine and the current session.
///
/// The host calls [`SkyOverlay::show`] every frame with its `open` flag and
/// an exit callback.
pub struct SkyOverlay {
    /// Persisted configuration
    pub config: SkyConfig,
    /// Current lifecycle phase
    pub phase: OverlayPhase,
    /// Session state while open
    pub session: Option<SkySession>,
    /// Shared catalog cache
    pub(crate) cache: CatalogCache,
    /// Counter for session identifiers
    pub(crate) next_session_id: u64,
    /// Channel for geolocation answers from async contexts
    pub(crate) geolocation_sender: Sender<GeolocationResult>,
    pub(crate) geolocation_receiver: Receiver<GeolocationResult>,
}

impl Default for SkyOverlay {
    fn default() -> Self {
        Self::new(SkyConfig::default(), CatalogCache::new())
    }
}

impl SkyOverlay {
    /// Creates a closed overlay using the given configuration and catalog cache.
    pub fn new(config: SkyConfig, cache: CatalogCache) -> Self {
        let (sender, receiver) = channel();
        Self {
            config,
            phase: OverlayPhase::Closed,
            session: None,
            cache,
            next_session_id: 1,
            geolocation_sender: sender,
            geolocation_receiver: receiver,
        }
    }

    /// The catalog cache this overlay reads from.
    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// Whether the overlay currently covers the viewport.
    pub fn is_open(&self) -> bool {
        self.phase != OverlayPhase::Closed
    }
}

/// The host application: a home panel with a trigger, and the sky overlay.
///
/// This struct implements the `eframe::App` trait.
pub struct SkyApp {
    /// The overlay and its configuration
    pub overlay: SkyOverlay,
    /// Whether the sky mode is the active one
    pub sky_open: bool,
}

impl Default for SkyApp {
    fn default() -> Self {
        Self {
            overlay: SkyOverlay::default(),
            sky_open: false,
        }
    }
}

impl SkyApp {
    /// Creates the app, restoring the configuration from storage when present.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = cc
            .storage
            .and_then(|storage| storage.get_string(CONFIG_KEY))
            .and_then(|json| match SkyConfig::from_json(&json) {
                Ok(config) => Some(config),
                Err(err) => {
                    log::warn!("Ignoring stored configuration: {err}");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            overlay: SkyOverlay::new(config, CatalogCache::new()),
            sky_open: false,
        }
    }
}
