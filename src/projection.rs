//! Celestial projection from equatorial coordinates to screen space.
//!
//! Stars are converted to altitude/azimuth for an observer at a given instant
//! (using a linear GMST approximation referenced to J2000.0) and then mapped
//! linearly onto the canvas: azimuth spans the width, altitude spans the
//! height with the zenith at the top and the horizon at the bottom.
//!
//! Everything here is pure and cheap enough to run for every star on every
//! frame, which is required because the sky rotates continuously.

use crate::constants::*;
use crate::error::ProjectionError;
use crate::types::{Observer, ScreenPoint, Star};
use chrono::{DateTime, Utc};
use eframe::egui;
use std::f64::consts::{FRAC_PI_2, TAU};

/// Observer-local coordinates of a star, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizontal {
    /// Height above the horizon, `(0, π/2]` for projected stars
    pub altitude: f64,
    /// Compass direction, `[0, 2π)`
    pub azimuth: f64,
}

/// Julian Date of the given instant, including the fractional day.
pub fn julian_date(time: DateTime<Utc>) -> f64 {
    UNIX_EPOCH_JULIAN_DATE + time.timestamp_millis() as f64 / MILLIS_PER_DAY
}

/// Greenwich Mean Sidereal Time in radians, `[0, 2π)`.
pub fn gmst_radians(time: DateTime<Utc>) -> f64 {
    let days = julian_date(time) - J2000_JULIAN_DATE;
    let degrees = (GMST_AT_J2000_DEG + GMST_DEG_PER_DAY * days).rem_euclid(360.0);
    degrees.to_radians()
}

/// Local sidereal time in radians for an observer longitude in degrees.
pub fn local_sidereal_time(time: DateTime<Utc>, longitude: f64) -> f64 {
    (gmst_radians(time) + longitude.to_radians()).rem_euclid(TAU)
}

/// Computes altitude and azimuth of a star.
///
/// # Arguments
///
/// * `star` - Catalog star (ra in hours, dec in degrees)
/// * `time` - Instant of observation
/// * `observer` - Observer location
///
/// # Returns
///
/// The horizontal coordinates, `ProjectionError::BelowHorizon` when the star
/// has not risen, or `ProjectionError::Degenerate` when the math produced a
/// non-finite value (polar observers, corrupt input).
pub fn horizontal(
    star: &Star,
    time: DateTime<Utc>,
    observer: &Observer,
) -> Result<Horizontal, ProjectionError> {
    let ra = (star.ra * 15.0).to_radians();
    let dec = star.dec.to_radians();
    let lat = observer.latitude.to_radians();

    let hour_angle = local_sidereal_time(time, observer.longitude) - ra;

    let sin_alt = dec.sin() * lat.sin() + dec.cos() * lat.cos() * hour_angle.cos();
    let altitude = sin_alt.clamp(-1.0, 1.0).asin();
    if !altitude.is_finite() {
        return Err(ProjectionError::Degenerate);
    }
    if altitude <= 0.0 {
        return Err(ProjectionError::BelowHorizon);
    }

    let cos_az = (dec.sin() - altitude.sin() * lat.sin()) / (altitude.cos() * lat.cos());
    if !cos_az.is_finite() {
        return Err(ProjectionError::Degenerate);
    }
    let mut azimuth = cos_az.clamp(-1.0, 1.0).acos();
    if hour_angle.sin() > 0.0 {
        azimuth = TAU - azimuth;
    }

    Ok(Horizontal {
        altitude,
        azimuth: azimuth.rem_euclid(TAU),
    })
}

/// Maps horizontal coordinates onto a canvas of the given size.
///
/// x wraps into `[0, width)`; y lies in `[0, height]` with the zenith at 0.
pub fn to_screen(coords: Horizontal, viewport: egui::Vec2) -> ScreenPoint {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return ScreenPoint::HIDDEN;
    }

    let mut x = (coords.azimuth / TAU * viewport.x as f64) as f32;
    if x >= viewport.x || x < 0.0 {
        // 2π rounding back onto the right edge belongs to the left one
        x = 0.0;
    }
    let alt = coords.altitude.clamp(0.0, FRAC_PI_2);
    let y = ((1.0 - alt / FRAC_PI_2) * viewport.y as f64) as f32;

    ScreenPoint::visible(x, y.clamp(0.0, viewport.y))
}

/// Projects a catalog star onto the canvas for an observer at an instant.
///
/// Stars below the horizon and degenerate projections come back with
/// `visible = false`.
pub fn project(
    star: &Star,
    time: DateTime<Utc>,
    observer: &Observer,
    viewport: egui::Vec2,
) -> ScreenPoint {
    match horizontal(star, time, observer) {
        Ok(coords) => to_screen(coords, viewport),
        Err(_) => ScreenPoint::HIDDEN,
    }
}
