//! Overlay lifecycle and canvas interaction.
//!
//! This module opens and closes overlay sessions, routes async load results to
//! the live session, and turns pointer input on the canvas into field updates.

use super::loader;
use super::state::{OverlayPhase, SkyOverlay, SkySession};
use crate::catalog::{CacheRequest, CacheStatus, Catalog};
use crate::field::{ClickOutcome, FieldState};
use crate::flow::FlowField;
use crate::types::Observer;
use eframe::egui;
use std::sync::Arc;

impl SkyOverlay {
    /// Starts a new session: Closed → Loading (or straight to Active when the
    /// catalog is already cached).
    ///
    /// Does nothing if a session is already open.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context, handed to async loads for repaint requests
    /// * `now` - Current egui time in seconds
    pub fn open(&mut self, ctx: &egui::Context, now: f64) {
        if self.phase != OverlayPhase::Closed {
            return;
        }

        let id = self.next_session_id;
        self.next_session_id += 1;

        let initial_observer = self.config.observer_override.unwrap_or_default();
        let mut session = SkySession::new(id, now, initial_observer);
        if self.config.observer_override.is_some() {
            session.observer.resolve(initial_observer);
        }

        self.phase = OverlayPhase::Loading;
        match self.cache.begin() {
            CacheRequest::Cached(catalog) => {
                session.catalog = Some(catalog);
                self.phase = OverlayPhase::Active;
            }
            CacheRequest::StartFetch => {
                log::debug!("Session {id}: fetching star catalog");
                loader::fetch_catalog(self.config.catalog_source.clone(), self.cache.clone(), ctx);
            }
            CacheRequest::InFlight => {
                log::debug!("Session {id}: waiting for catalog fetch already in flight");
            }
        }

        if !session.observer.is_resolved() && self.config.request_geolocation {
            loader::request_geolocation(
                id,
                Arc::clone(&session.cancelled),
                self.geolocation_sender.clone(),
                ctx,
            );
        }

        log::info!("Sky overlay opened (session {id})");
        self.session = Some(session);
    }

    /// Ends the current session: cancels pending async work and drops all
    /// per-session state. Safe to call when already closed.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
            log::info!("Sky overlay closed (session {})", session.id);
        }
        self.phase = OverlayPhase::Closed;
    }

    /// Applies results that arrived since the last frame.
    ///
    /// Geolocation answers for other sessions are discarded; a location is
    /// applied at most once per session. While loading, the cache is polled and
    /// a failed fetch degrades to an empty field.
    pub(crate) fn poll_loads(&mut self) {
        while let Ok(answer) = self.geolocation_receiver.try_recv() {
            let live = self
                .session
                .as_mut()
                .filter(|s| s.id == answer.session && !s.is_cancelled());
            match (live, answer.result) {
                (Some(session), Ok(observer)) => {
                    if session.observer.resolve(observer) {
                        log::info!(
                            "Observer located at {:.3}, {:.3}",
                            observer.latitude,
                            observer.longitude
                        );
                    }
                }
                (Some(_), Err(e)) => log::info!("{e}; using default observer"),
                (None, _) => log::debug!("Ignoring location for stale session {}", answer.session),
            }
        }

        if self.phase != OverlayPhase::Loading {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.cache.status() {
            CacheStatus::Ready(catalog) => {
                session.catalog = Some(catalog);
                self.phase = OverlayPhase::Active;
            }
            CacheStatus::Failed => {
                session.catalog = Some(Arc::new(Catalog::empty()));
                self.phase = OverlayPhase::Active;
            }
            CacheStatus::Pending => {}
        }
    }

    /// Draws one frame of the overlay into `ui` and handles its input.
    ///
    /// # Returns
    ///
    /// `true` if a click on empty sky asked to close the overlay.
    pub(crate) fn draw_sky(&mut self, ui: &mut egui::Ui, now: f64) -> bool {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click());
        let rect = response.rect;

        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let resized = session.field.set_viewport(rect.size());
        if self.config.show_flow_field && (resized || session.flow.is_none()) {
            session.flow = Some(FlowField::new(rect.size()));
        }

        handle_pointer(&mut session.field, ui, rect, now);

        if let Some(catalog) = &session.catalog {
            let observer: Observer = session.observer.observer();
            session
                .field
                .rebuild(catalog, self.config.sky_time(), &observer);
        }

        if let Some(flow) = session.flow.as_mut() {
            flow.step(session.field.pointer_px());
        }

        let mut close_requested = false;
        if response.clicked() && self.phase == OverlayPhase::Active {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = pos - rect.min.to_vec2();
                match session.field.click(local, now) {
                    ClickOutcome::Close => close_requested = true,
                    ClickOutcome::LinksCleared => log::debug!("Links cleared"),
                    ClickOutcome::LinksCreated(count) => log::debug!("Created {count} links"),
                }
            }
        }

        self.render_sky(&painter, rect, now);
        close_requested
    }
}

/// Tracks the pointer over the canvas from this frame's input events.
fn handle_pointer(field: &mut FieldState, ui: &egui::Ui, rect: egui::Rect, now: f64) {
    ui.input(|i| {
        for event in &i.events {
            match event {
                egui::Event::PointerMoved(pos) if rect.contains(*pos) => {
                    field.pointer_moved(*pos - rect.min.to_vec2(), now);
                }
                egui::Event::PointerMoved(_) | egui::Event::PointerGone => field.pointer_left(),
                _ => {}
            }
        }
    });
}
