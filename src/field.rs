//! Interaction state of the animated star field.
//!
//! Each frame the field is rebuilt from the projector output: the visible
//! stars are kept in catalog order and their drawn positions are pulled a few
//! pixels toward the pointer. The field also tracks idle time and the links
//! the user creates by clicking stars.
//!
//! Links are keyed by star id rather than by position in the visible list,
//! since that list shifts whenever a star rises or sets.

use crate::catalog::Catalog;
use crate::constants::*;
use crate::projection::project;
use crate::types::{Observer, StarId};
use chrono::{DateTime, Utc};
use eframe::egui;

/// A star above the horizon in the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleStar {
    /// Catalog identifier
    pub id: StarId,
    /// Apparent magnitude
    pub mag: f64,
    /// Projected position before pointer distortion
    pub anchor: egui::Pos2,
    /// Position actually drawn and used for picking
    pub pos: egui::Pos2,
}

/// A user-drawn edge between two stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    /// Star that was clicked
    pub from: StarId,
    /// Nearby star it was joined to
    pub to: StarId,
}

/// What a click on the field did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click missed every star; the overlay should close
    Close,
    /// Existing links were removed
    LinksCleared,
    /// This many links were created from the picked star
    LinksCreated(usize),
}

/// Per-session field state.
#[derive(Debug, Clone, Default)]
pub struct FieldState {
    /// Canvas size in pixels
    viewport: egui::Vec2,
    /// Pointer position normalized to the canvas, `[0,1]²`
    pointer: Option<egui::Pos2>,
    /// Time of the last pointer move or click, in seconds
    last_interaction: f64,
    /// User-created links
    links: Vec<Link>,
    /// Stars above the horizon this frame, in catalog order
    visible: Vec<VisibleStar>,
}

impl FieldState {
    /// Creates an empty field whose idle timer starts at `now` (seconds).
    pub fn new(now: f64) -> Self {
        Self {
            last_interaction: now,
            ..Default::default()
        }
    }

    /// Current canvas size.
    pub fn viewport(&self) -> egui::Vec2 {
        self.viewport
    }

    /// Records the canvas size.
    ///
    /// # Returns
    ///
    /// `true` if the size differs from the previous frame.
    pub fn set_viewport(&mut self, viewport: egui::Vec2) -> bool {
        if self.viewport == viewport {
            return false;
        }
        self.viewport = viewport;
        true
    }

    /// Pointer position normalized to the canvas, if the pointer is over it.
    pub fn pointer(&self) -> Option<egui::Pos2> {
        self.pointer
    }

    /// Pointer position in canvas pixels.
    pub fn pointer_px(&self) -> Option<egui::Pos2> {
        self.pointer
            .map(|p| egui::pos2(p.x * self.viewport.x, p.y * self.viewport.y))
    }

    /// Handles pointer movement to a canvas-local pixel position.
    pub fn pointer_moved(&mut self, local: egui::Pos2, now: f64) {
        if self.viewport.x > 0.0 && self.viewport.y > 0.0 {
            self.pointer = Some(egui::pos2(
                (local.x / self.viewport.x).clamp(0.0, 1.0),
                (local.y / self.viewport.y).clamp(0.0, 1.0),
            ));
        }
        self.last_interaction = now;
    }

    /// Handles the pointer leaving the canvas. Not counted as interaction.
    pub fn pointer_left(&mut self) {
        self.pointer = None;
    }

    /// Fraction of the idle ramp elapsed since the last interaction, `[0,1]`.
    pub fn idle_fraction(&self, now: f64) -> f32 {
        let elapsed = (now - self.last_interaction).max(0.0);
        (elapsed / IDLE_RAMP_SECS).clamp(0.0, 1.0) as f32
    }

    /// Re-projects every catalog star for this instant and rebuilds the visible list.
    pub fn rebuild(&mut self, catalog: &Catalog, time: DateTime<Utc>, observer: &Observer) {
        let viewport = self.viewport;
        let projected = catalog.stars().iter().filter_map(|star| {
            let point = project(star, time, observer, viewport);
            point
                .visible
                .then(|| (star.id, star.mag, egui::pos2(point.x, point.y)))
        });
        self.place(projected);
    }

    /// Replaces the visible list with already projected stars and applies the pointer pull.
    pub fn place(&mut self, projected: impl IntoIterator<Item = (StarId, f64, egui::Pos2)>) {
        let pointer = self.pointer_px();
        self.visible.clear();
        self.visible
            .extend(projected.into_iter().map(|(id, mag, anchor)| VisibleStar {
                id,
                mag,
                anchor,
                pos: pointer.map_or(anchor, |p| pull_toward(anchor, p)),
            }));
    }

    /// Stars above the horizon this frame.
    pub fn visible_stars(&self) -> &[VisibleStar] {
        &self.visible
    }

    /// Drawn position of a star if it is visible this frame.
    pub fn position_of(&self, id: StarId) -> Option<egui::Pos2> {
        self.visible.iter().find(|s| s.id == id).map(|s| s.pos)
    }

    /// Current links.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Links resolved to this frame's positions; links touching a set star are skipped.
    pub fn link_segments(&self) -> Vec<(egui::Pos2, egui::Pos2)> {
        self.links
            .iter()
            .filter_map(|link| Some((self.position_of(link.from)?, self.position_of(link.to)?)))
            .collect()
    }

    /// Index of the visible star closest to `pos`, if one lies within `max_distance`.
    pub fn nearest_star(&self, pos: egui::Pos2, max_distance: f32) -> Option<usize> {
        self.visible
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.pos.distance(pos)))
            .filter(|(_, d)| *d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Handles a click at a canvas-local pixel position.
    ///
    /// Missing every star closes the overlay. Clicking a star while links exist
    /// clears them all; otherwise the picked star is joined to its nearest
    /// visible neighbours within [`LINK_RADIUS`], at most [`MAX_LINKS`] of them.
    pub fn click(&mut self, pos: egui::Pos2, now: f64) -> ClickOutcome {
        self.last_interaction = now;

        let Some(picked) = self.nearest_star(pos, PICK_RADIUS) else {
            return ClickOutcome::Close;
        };

        if !self.links.is_empty() {
            self.links.clear();
            return ClickOutcome::LinksCleared;
        }

        let origin = self.visible[picked];
        let mut neighbours: Vec<(f32, StarId)> = self
            .visible
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != picked)
            .map(|(_, s)| (s.pos.distance(origin.pos), s.id))
            .filter(|(d, id)| *d <= LINK_RADIUS && *id != origin.id)
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));

        self.links.extend(
            neighbours
                .into_iter()
                .take(MAX_LINKS)
                .map(|(_, to)| Link { from: origin.id, to }),
        );
        ClickOutcome::LinksCreated(self.links.len())
    }
}

/// Moves `anchor` toward `pointer` by an amount that falls off with distance.
///
/// The pull is `POINTER_GRAVITY / distance`, capped at `POINTER_MAX_PULL` and
/// never past the pointer itself.
pub fn pull_toward(anchor: egui::Pos2, pointer: egui::Pos2) -> egui::Pos2 {
    let delta = pointer - anchor;
    let distance = delta.length();
    if distance <= f32::EPSILON {
        return anchor;
    }
    let pull = (POINTER_GRAVITY / distance)
        .min(POINTER_MAX_PULL)
        .min(distance);
    anchor + delta / distance * pull
}

/// Drawn radius of a star: brighter stars are larger, and every star pulses slowly.
///
/// # Arguments
///
/// * `mag` - Apparent magnitude
/// * `id` - Star id, used to desynchronize the pulse between stars
/// * `time` - Animation time in seconds
pub fn star_radius(mag: f64, id: StarId, time: f64) -> f32 {
    let brightness = (FAINT_MAGNITUDE - mag).max(0.0) as f32;
    let base = STAR_BASE_RADIUS + brightness * STAR_RADIUS_PER_MAG;
    let phase = (id % 97) as f64 * 0.61;
    let pulse = (time * 1.7 + phase).sin() as f32;
    base * (1.0 + STAR_PULSE_AMPLITUDE * pulse)
}
