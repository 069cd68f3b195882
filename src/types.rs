//! Core data types for the sky overlay.
//!
//! This module defines the catalog structures loaded from JSON (stars and
//! constellations), the observer location, and the per-frame screen points
//! produced by the projector.

use crate::constants::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE};
use serde::{Deserialize, Serialize};

/// Stable identifier of a catalog star.
pub type StarId = u32;

/// A single catalog star.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Star {
    /// Catalog identifier, unique across the whole catalog
    pub id: StarId,
    /// Right ascension in hours, `[0, 24)`
    pub ra: f64,
    /// Declination in degrees, `[-90, 90]`
    pub dec: f64,
    /// Apparent magnitude (smaller is brighter)
    pub mag: f64,
}

impl Star {
    /// Creates a star from its catalog fields.
    pub fn new(id: StarId, ra: f64, dec: f64, mag: f64) -> Self {
        Self { id, ra, dec, mag }
    }

    /// Whether the coordinates and magnitude are inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        (0.0..24.0).contains(&self.ra) && (-90.0..=90.0).contains(&self.dec) && self.mag.is_finite()
    }
}

/// A named constellation with its member stars and traditional figure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constellation {
    /// Display name
    pub name: String,
    /// Member stars
    pub stars: Vec<Star>,
    /// Figure segments as pairs of indices into `stars`
    #[serde(default)]
    pub lines: Vec<[usize; 2]>,
}

/// Observer location on Earth, in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Observer {
    /// Geodetic latitude, north positive
    pub latitude: f64,
    /// Geodetic longitude, east positive
    pub longitude: f64,
}

impl Observer {
    /// Creates an observer at the given latitude and longitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE)
    }
}

/// Observer location for one overlay session.
///
/// Starts at a default (or configured) location and may be overwritten by a
/// geolocation result exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverState {
    observer: Observer,
    resolved: bool,
}

impl ObserverState {
    /// Creates an unresolved state at the given starting location.
    pub fn new(initial: Observer) -> Self {
        Self {
            observer: initial,
            resolved: false,
        }
    }

    /// The location currently used for projection.
    pub fn observer(&self) -> Observer {
        self.observer
    }

    /// Whether a resolved location has already been applied.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Applies a resolved location.
    ///
    /// # Returns
    ///
    /// `true` if the location was applied, `false` if the state was already
    /// resolved and the value was ignored.
    pub fn resolve(&mut self, observer: Observer) -> bool {
        if self.resolved {
            return false;
        }
        self.observer = observer;
        self.resolved = true;
        true
    }
}

impl Default for ObserverState {
    fn default() -> Self {
        Self::new(Observer::default())
    }
}

/// Projected position of a star for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    /// Horizontal position in canvas pixels
    pub x: f32,
    /// Vertical position in canvas pixels
    pub y: f32,
    /// False when the star is below the horizon or could not be projected
    pub visible: bool,
}

impl ScreenPoint {
    /// A point that must not be drawn or linked.
    pub const HIDDEN: ScreenPoint = ScreenPoint {
        x: 0.0,
        y: 0.0,
        visible: false,
    };

    /// Creates a visible point.
    pub fn visible(x: f32, y: f32) -> Self {
        Self { x, y, visible: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_validity_ranges() {
        assert!(Star::new(1, 0.0, -90.0, 1.0).is_valid());
        assert!(Star::new(1, 23.99, 90.0, -1.4).is_valid());
        assert!(!Star::new(1, 24.0, 0.0, 1.0).is_valid());
        assert!(!Star::new(1, -0.1, 0.0, 1.0).is_valid());
        assert!(!Star::new(1, 5.0, 90.5, 1.0).is_valid());
        assert!(!Star::new(1, 5.0, 10.0, f64::NAN).is_valid());
    }

    #[test]
    fn observer_state_resolves_once() {
        let mut state = ObserverState::default();
        assert!(!state.is_resolved());
        assert_eq!(state.observer(), Observer::default());

        assert!(state.resolve(Observer::new(51.5, -0.1)));
        assert!(state.is_resolved());
        assert!(!state.resolve(Observer::new(-33.9, 151.2)));
        assert_eq!(state.observer(), Observer::new(51.5, -0.1));
    }

    #[test]
    fn constellation_lines_default_to_empty() {
        let json = r#"{"name": "Lone", "stars": [{"id": 7, "ra": 1.0, "dec": 2.0, "mag": 3.0}]}"#;
        let constellation: Constellation = serde_json::from_str(json).unwrap();
        assert!(constellation.lines.is_empty());
        assert_eq!(constellation.stars[0].id, 7);
    }
}
