//! Flow layer drawn behind the stars.
//!
//! A mosaic of short strokes follows a slowly changing angle field, and a
//! set of light-flow particles streams along the same field. Both bend toward
//! the pointer. The layer is rebuilt whenever the canvas size changes because
//! cell size and particle count depend on it.

use crate::constants::*;
use eframe::egui;
use rand::Rng;
use std::f32::consts::TAU;

/// One mosaic tile: a stroke anchored at the cell centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Cell centre in canvas pixels
    pub center: egui::Pos2,
    /// Random phase of the stroke length oscillation
    pub phase: f32,
}

/// A light-flow particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowParticle {
    /// Position in canvas pixels
    pub pos: egui::Pos2,
    /// Velocity in pixels per frame
    pub vel: egui::Vec2,
    /// Hue offset in degrees
    pub hue_offset: f32,
}

/// A stroke ready to paint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    /// Start point
    pub from: egui::Pos2,
    /// End point
    pub to: egui::Pos2,
    /// Palette band, 0..3
    pub band: usize,
}

/// Mosaic cells and particles for one canvas size.
#[derive(Debug, Clone)]
pub struct FlowField {
    size: egui::Vec2,
    cells: Vec<Cell>,
    particles: Vec<FlowParticle>,
    /// Simulated time in milliseconds
    time_ms: f64,
}

impl FlowField {
    /// Builds a field for the given canvas size using the thread RNG.
    pub fn new(size: egui::Vec2) -> Self {
        Self::with_rng(size, &mut rand::rng())
    }

    /// Builds a field for the given canvas size.
    ///
    /// Cell size is `max(16, min(w, h) / 32)`; one particle is spawned per
    /// 15 000 square pixels.
    pub fn with_rng<R: Rng>(size: egui::Vec2, rng: &mut R) -> Self {
        let cell_size = cell_size(size);
        let cols = (size.x / cell_size).ceil().max(0.0) as usize;
        let rows = (size.y / cell_size).ceil().max(0.0) as usize;

        let mut cells = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell {
                    center: egui::pos2(
                        col as f32 * cell_size + cell_size / 2.0,
                        row as f32 * cell_size + cell_size / 2.0,
                    ),
                    phase: rng.random_range(0.0..TAU),
                });
            }
        }

        let count = particle_count(size);
        let particles = (0..count)
            .map(|_| FlowParticle {
                pos: egui::pos2(rng.random_range(0.0..=size.x), rng.random_range(0.0..=size.y)),
                vel: egui::Vec2::ZERO,
                hue_offset: rng.random_range(0.0..360.0),
            })
            .collect();

        Self {
            size,
            cells,
            particles,
            time_ms: 0.0,
        }
    }

    /// Canvas size the field was built for.
    pub fn size(&self) -> egui::Vec2 {
        self.size
    }

    /// Mosaic cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Light-flow particles.
    pub fn particles(&self) -> &[FlowParticle] {
        &self.particles
    }

    /// Simulated time in milliseconds.
    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    /// Base hue of the palette, rotating slowly with time.
    pub fn base_hue(&self) -> f32 {
        ((self.time_ms * 0.004) % 360.0) as f32
    }

    /// Advances the field by one frame.
    ///
    /// # Arguments
    ///
    /// * `pointer` - Pointer position in canvas pixels, if any
    pub fn step(&mut self, pointer: Option<egui::Pos2>) {
        self.time_ms += FLOW_FRAME_MS;
        let t = self.time_ms;
        let size = self.size;
        let reach = size.x.min(size.y) * 0.4;

        for p in &mut self.particles {
            let angle = field_angle(p.pos, t) * 1.4;
            p.vel = egui::vec2(angle.cos(), angle.sin()) * FLOW_PARTICLE_SPEED;

            if let Some(pointer) = pointer {
                let delta = pointer - p.pos;
                let dist = delta.length().max(1.0);
                if dist < reach {
                    let influence = (reach - dist) / reach;
                    p.vel += delta / dist * influence * 1.2;
                }
            }

            p.pos += p.vel;
            p.pos = wrap(p.pos, size);
        }
    }

    /// Mosaic strokes for the current time, bent toward the pointer.
    pub fn strokes(&self, pointer: Option<egui::Pos2>) -> Vec<Stroke> {
        let t = self.time_ms;
        let reach = self.size.x.min(self.size.y) * 0.35;

        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let angle = field_angle(cell.center, t);
                let length = 10.0 + 18.0 * (cell.phase + (t * 0.0007) as f32).sin();
                let mut to = cell.center + egui::vec2(angle.cos(), angle.sin()) * length;

                if let Some(pointer) = pointer {
                    let delta = pointer - cell.center;
                    let dist = delta.length().max(1.0);
                    if dist < reach {
                        to += delta * 0.18 * ((reach - dist) / reach);
                    }
                }

                Stroke {
                    from: cell.center,
                    to,
                    band: i % 3,
                }
            })
            .collect()
    }
}

/// Mosaic cell size for a canvas.
pub fn cell_size(size: egui::Vec2) -> f32 {
    FLOW_MIN_CELL.max(size.x.min(size.y) / 32.0)
}

/// Number of light-flow particles for a canvas.
pub fn particle_count(size: egui::Vec2) -> usize {
    ((size.x * size.y).max(0.0) / FLOW_AREA_PER_PARTICLE).floor() as usize
}

/// Smooth angle field, in radians, at a point and time (ms).
pub fn field_angle(pos: egui::Pos2, t: f64) -> f32 {
    let nx = pos.x as f64 * 0.0012;
    let ny = pos.y as f64 * 0.0012;
    let angle = (nx * 1.7 + t * 0.0006).sin()
        + (ny * 2.1 - t * 0.0004).cos()
        + ((nx + ny) * 1.3 + t * 0.0003).sin();
    (angle * 0.6) as f32
}

fn wrap(mut pos: egui::Pos2, size: egui::Vec2) -> egui::Pos2 {
    let m = FLOW_WRAP_MARGIN;
    if pos.x < -m {
        pos.x = size.x + m;
    }
    if pos.x > size.x + m {
        pos.x = -m;
    }
    if pos.y < -m {
        pos.y = size.y + m;
    }
    if pos.y > size.y + m {
        pos.y = -m;
    }
    pos
}
