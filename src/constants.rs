//! Shared application-wide constants.
//! Centralizes tweakable values used across projection, the field simulation and rendering.

// Observer
/// Latitude used until (or unless) geolocation resolves, in degrees.
pub const DEFAULT_LATITUDE: f64 = 41.0082;
/// Longitude used until (or unless) geolocation resolves, in degrees.
pub const DEFAULT_LONGITUDE: f64 = 28.9784;
/// Upper bound on the wait for a geolocation fix, in milliseconds.
pub const GEOLOCATION_TIMEOUT_MS: u32 = 2500;

// Sidereal time
/// Julian Date of the J2000.0 epoch.
pub const J2000_JULIAN_DATE: f64 = 2_451_545.0;
/// Julian Date of the Unix epoch (1970-01-01T00:00:00Z).
pub const UNIX_EPOCH_JULIAN_DATE: f64 = 2_440_587.5;
/// GMST at the J2000.0 epoch, in degrees.
pub const GMST_AT_J2000_DEG: f64 = 280.460_618_37;
/// GMST advance per day, in degrees.
pub const GMST_DEG_PER_DAY: f64 = 360.985_647_366_29;
/// Milliseconds in a day.
pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

// Interaction
/// Maximum distance (pixels) between a click and a star for the click to pick it.
pub const PICK_RADIUS: f32 = 22.0;
/// Radius (pixels) around the picked star in which link partners are gathered.
pub const LINK_RADIUS: f32 = 140.0;
/// Maximum number of links created by one click.
pub const MAX_LINKS: usize = 6;
/// Seconds without interaction after which the idle fraction saturates at 1.
pub const IDLE_RAMP_SECS: f64 = 20.0;
/// Strength of the pointer pull (pixels × pixels); the pull is this divided by distance.
pub const POINTER_GRAVITY: f32 = 900.0;
/// Cap on the pointer pull, in pixels.
pub const POINTER_MAX_PULL: f32 = 7.0;

// Star drawing
/// Magnitude at or above which stars are drawn at the base radius.
pub const FAINT_MAGNITUDE: f64 = 5.0;
/// Base star radius in pixels.
pub const STAR_BASE_RADIUS: f32 = 0.9;
/// Extra radius per magnitude brighter than `FAINT_MAGNITUDE`.
pub const STAR_RADIUS_PER_MAG: f32 = 0.55;
/// Relative amplitude of the star pulse.
pub const STAR_PULSE_AMPLITUDE: f32 = 0.18;
/// Number of faint background dust points.
pub const DUST_COUNT: usize = 140;

// Flow layer
/// Simulated milliseconds the flow layer advances per frame.
pub const FLOW_FRAME_MS: f64 = 16.0;
/// Smallest mosaic cell size in pixels.
pub const FLOW_MIN_CELL: f32 = 16.0;
/// Viewport area (square pixels) per light-flow particle.
pub const FLOW_AREA_PER_PARTICLE: f32 = 15_000.0;
/// Off-screen margin before particles wrap around.
pub const FLOW_WRAP_MARGIN: f32 = 20.0;
/// Speed of light-flow particles in pixels per frame.
pub const FLOW_PARTICLE_SPEED: f32 = 1.4;
