//! User interface: the sky overlay and a minimal host application.
//!
//! # Module Organization
//!
//! - `state` - Configuration, overlay state machine, sessions and the host app
//! - `loader` - Catalog and geolocation loading for native and WASM
//! - `canvas` - Session lifecycle and pointer interaction
//! - `rendering` - Drawing the sky layers

mod canvas;
mod loader;
mod rendering;
mod state;

pub use state::{
    GeolocationResult, OverlayPhase, SkyApp, SkyConfig, SkyOverlay, SkySession, CONFIG_KEY,
};

use eframe::egui;

impl SkyOverlay {
    /// Shows the overlay for one frame.
    ///
    /// The host owns the `open` flag. Passing `true` opens a session if none is
    /// running; passing `false` ends any running session. `on_close` is called
    /// exactly once when the overlay closes itself (Escape or a click on empty
    /// sky), and the host is expected to clear its flag in response.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context
    /// * `open` - Whether the host wants the overlay shown
    /// * `on_close` - Exit callback
    pub fn show(&mut self, ctx: &egui::Context, open: bool, on_close: &mut dyn FnMut()) {
        if !open {
            if self.is_open() {
                self.close();
            }
            return;
        }

        let now = ctx.input(|i| i.time);
        self.open(ctx, now);
        self.poll_loads();

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.close();
            on_close();
            ctx.request_repaint();
            return;
        }

        let close_requested = egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_sky(ui, now))
            .inner;

        if close_requested {
            self.close();
            on_close();
        }
        // Keep animating while open; one more frame lets the host redraw after a close.
        ctx.request_repaint();
    }
}

impl eframe::App for SkyApp {
    /// Persist the configuration between restarts.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.overlay.config.to_json() {
            Ok(json) => storage.set_string(CONFIG_KEY, json),
            Err(err) => log::error!("Failed to serialize configuration: {err}"),
        }
    }

    /// Main update function called by egui for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);
    }
}

impl SkyApp {
    /// Draws one frame of the host: the home panel while the sky is closed,
    /// and the overlay on top of everything while it is open.
    pub fn ui(&mut self, ctx: &egui::Context) {
        ctx.set_visuals(egui::Visuals::dark());

        // Read once so home and overlay never share a frame.
        let open = self.sky_open;
        if !open {
            egui::CentralPanel::default().show(ctx, |ui| self.draw_home(ui));
            if self.sky_open {
                ctx.request_repaint();
            }
        }

        let mut closed = false;
        self.overlay.show(ctx, open, &mut || closed = true);
        if closed {
            self.sky_open = false;
        }
    }

    fn draw_home(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.35);
            ui.heading("Night sky");
            ui.label("The stars above your location, right now.");
            ui.add_space(12.0);
            if ui.button("Play").clicked() {
                self.sky_open = true;
            }

            ui.add_space(24.0);
            let config = &mut self.overlay.config;
            ui.checkbox(&mut config.show_figures, "Constellation figures");
            ui.checkbox(&mut config.show_flow_field, "Flow field");
            ui.checkbox(&mut config.request_geolocation, "Use my location");
        });
    }
}

#[cfg(test)]
mod tests;
