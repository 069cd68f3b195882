//! Sky rendering: background, flow layer, figures, stars, links and captions.
//!
//! Layers are drawn back to front. Field positions are canvas-local and are
//! offset by the canvas origin here.

use super::state::{OverlayPhase, SkyOverlay, SkySession};
use crate::field::star_radius;
use crate::flow::FlowField;
use eframe::egui;
use eframe::egui::ecolor::Hsva;

/// Top of the background gradient.
const SKY_TOP: egui::Color32 = egui::Color32::from_rgb(4, 6, 20);
/// Bottom of the background gradient.
const SKY_BOTTOM: egui::Color32 = egui::Color32::from_rgb(18, 16, 48);

impl SkyOverlay {
    /// Paints the whole overlay for this frame.
    ///
    /// # Arguments
    ///
    /// * `painter` - Painter clipped to the canvas
    /// * `rect` - Screen rectangle of the canvas
    /// * `now` - Animation time in seconds
    pub fn render_sky(&self, painter: &egui::Painter, rect: egui::Rect, now: f64) {
        draw_background(painter, rect);

        let Some(session) = &self.session else {
            return;
        };
        let idle = session.field.idle_fraction(now);

        draw_dust(painter, rect, session, now);
        if let Some(flow) = session.flow.as_ref().filter(|_| self.config.show_flow_field) {
            draw_flow(painter, rect, flow, session.field.pointer_px(), idle);
        }
        if self.config.show_figures {
            draw_figures(painter, rect, session);
        }
        draw_links(painter, rect, session, idle);
        draw_stars(painter, rect, session, now, idle);
        draw_captions(painter, rect, self.phase);
    }
}

fn draw_background(painter: &egui::Painter, rect: egui::Rect) {
    let mut mesh = egui::Mesh::default();
    mesh.colored_vertex(rect.left_top(), SKY_TOP);
    mesh.colored_vertex(rect.right_top(), SKY_TOP);
    mesh.colored_vertex(rect.right_bottom(), SKY_BOTTOM);
    mesh.colored_vertex(rect.left_bottom(), SKY_BOTTOM);
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    painter.add(egui::Shape::mesh(mesh));
}

fn draw_dust(painter: &egui::Painter, rect: egui::Rect, session: &SkySession, now: f64) {
    for (i, dot) in session.dust.iter().enumerate() {
        let twinkle = 0.5 + 0.5 * (now * 0.8 + i as f64 * 1.37).sin() as f32;
        let alpha = (20.0 + 50.0 * twinkle) as u8;
        let pos = rect.min + egui::vec2(dot.x * rect.width(), dot.y * rect.height());
        painter.circle_filled(pos, 0.7, egui::Color32::from_white_alpha(alpha));
    }
}

/// Palette band colour: hue offsets of 25°, 180° and 300° from the base hue.
fn band_color(base_hue: f32, band: usize, alpha: f32) -> egui::Color32 {
    let offset = [25.0, 180.0, 300.0][band % 3];
    let hue = ((base_hue + offset) % 360.0) / 360.0;
    Hsva::new(hue, 0.7, 0.8, alpha.clamp(0.0, 1.0)).into()
}

fn draw_flow(
    painter: &egui::Painter,
    rect: egui::Rect,
    flow: &FlowField,
    pointer: Option<egui::Pos2>,
    idle: f32,
) {
    let base_hue = flow.base_hue();
    let alpha = 0.06 + 0.14 * idle;
    let offset = rect.min.to_vec2();

    for stroke in flow.strokes(pointer) {
        painter.line_segment(
            [stroke.from + offset, stroke.to + offset],
            egui::Stroke::new(1.0, band_color(base_hue, stroke.band, alpha)),
        );
    }

    for particle in flow.particles() {
        let hue = ((base_hue + particle.hue_offset) % 360.0) / 360.0;
        let color: egui::Color32 = Hsva::new(hue, 0.6, 0.95, 0.25 + 0.35 * idle).into();
        let head = particle.pos + offset;
        painter.line_segment([head - particle.vel * 3.0, head], egui::Stroke::new(1.4, color));
    }
}

fn draw_figures(painter: &egui::Painter, rect: egui::Rect, session: &SkySession) {
    let Some(catalog) = &session.catalog else {
        return;
    };
    let offset = rect.min.to_vec2();
    let stroke = egui::Stroke::new(0.8, egui::Color32::from_rgba_unmultiplied(150, 170, 230, 40));

    for (from, to) in catalog.figure_segments() {
        if let (Some(a), Some(b)) = (
            session.field.position_of(*from),
            session.field.position_of(*to),
        ) {
            painter.line_segment([a + offset, b + offset], stroke);
        }
    }
}

fn draw_links(painter: &egui::Painter, rect: egui::Rect, session: &SkySession, idle: f32) {
    let offset = rect.min.to_vec2();
    // Links fade as the field drifts into its idle state.
    let alpha = (0.85 - 0.55 * idle).clamp(0.0, 1.0);
    let color: egui::Color32 = Hsva::new(0.55, 0.35, 1.0, alpha).into();

    for (a, b) in session.field.link_segments() {
        painter.line_segment([a + offset, b + offset], egui::Stroke::new(1.3, color));
    }
}

/// Star colour drifts from cool white toward a warm hue as idle grows.
fn star_color(idle: f32, twinkle: f32) -> egui::Color32 {
    let hue = 0.6 + (0.11 - 0.6) * idle;
    let saturation = 0.1 + 0.35 * idle;
    let value = (0.75 + 0.25 * twinkle) * (1.0 - 0.2 * idle);
    Hsva::new(hue, saturation, value, 1.0).into()
}

fn draw_stars(painter: &egui::Painter, rect: egui::Rect, session: &SkySession, now: f64, idle: f32) {
    let offset = rect.min.to_vec2();
    for star in session.field.visible_stars() {
        let radius = star_radius(star.mag, star.id, now);
        let twinkle = 0.5 + 0.5 * (now * 2.3 + star.id as f64 * 0.37).sin() as f32;
        let center = star.pos + offset;

        painter.circle_filled(
            center,
            radius * 2.6,
            egui::Color32::from_white_alpha((12.0 + 18.0 * twinkle) as u8),
        );
        painter.circle_filled(center, radius, star_color(idle, twinkle));
    }
}

fn draw_captions(painter: &egui::Painter, rect: egui::Rect, phase: OverlayPhase) {
    let dim = egui::Color32::from_rgba_unmultiplied(200, 210, 240, 150);

    let title = match phase {
        OverlayPhase::Loading => "Loading the sky…",
        _ => "The sky above you",
    };
    painter.text(
        rect.center_top() + egui::vec2(0.0, 24.0),
        egui::Align2::CENTER_TOP,
        title,
        egui::FontId::proportional(18.0),
        dim,
    );
    painter.text(
        rect.center_bottom() - egui::vec2(0.0, 20.0),
        egui::Align2::CENTER_BOTTOM,
        "Click a star to connect its neighbours · click empty sky or press Esc to return",
        egui::FontId::proportional(13.0),
        dim,
    );
}
