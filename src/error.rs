//! Error types for catalog loading, geolocation and projection.
//!
//! None of these reach the user: callers degrade to an empty sky, the default
//! observer, or a hidden star, and log what happened.

use crate::types::StarId;
use thiserror::Error;

/// Failures while preparing a sky session.
#[derive(Debug, Error)]
pub enum SkyError {
    /// The catalog could not be read or fetched
    #[error("failed to load star catalog: {0}")]
    CatalogLoad(String),
    /// The catalog was not valid JSON for the expected structure
    #[error("failed to parse star catalog: {0}")]
    CatalogParse(#[from] serde_json::Error),
    /// A star has coordinates or magnitude outside the valid ranges
    #[error("star {id} in {constellation} is out of range (ra {ra}h, dec {dec}°, mag {mag})")]
    InvalidStar {
        /// Constellation containing the star
        constellation: String,
        /// Offending star
        id: StarId,
        /// Right ascension as read, in hours
        ra: f64,
        /// Declination as read, in degrees
        dec: f64,
        /// Magnitude as read
        mag: f64,
    },
    /// A figure segment refers to a star index the constellation does not have
    #[error("figure line {from}-{to} in {constellation} refers to a missing star")]
    InvalidLine {
        /// Constellation containing the segment
        constellation: String,
        /// First index
        from: usize,
        /// Second index
        to: usize,
    },
    /// No location could be obtained from the device
    #[error("geolocation unavailable: {0}")]
    GeolocationUnavailable(String),
}

/// Reasons a star has no screen position this frame.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionError {
    /// Altitude is zero or negative
    #[error("star is below the horizon")]
    BelowHorizon,
    /// Altitude or azimuth came out non-finite
    #[error("projection is numerically degenerate")]
    Degenerate,
}
