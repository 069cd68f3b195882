use super::*;
use crate::catalog::{Catalog, CacheRequest, CatalogCache, CatalogSource};
use crate::types::Observer;
use chrono::{TimeZone, Utc};
use eframe::egui;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A tight cluster due south at 45° altitude for an equatorial observer at
/// J2000 noon, plus one star (id 5) below the horizon.
const CLUSTER: &str = r#"{"constellations": [{
    "name": "Cluster",
    "stars": [
        {"id": 1, "ra": 18.70, "dec": -45.0, "mag": 1.0},
        {"id": 2, "ra": 18.72, "dec": -46.0, "mag": 2.5},
        {"id": 3, "ra": 18.68, "dec": -44.0, "mag": 3.0},
        {"id": 4, "ra": 18.75, "dec": -40.0, "mag": 2.0},
        {"id": 5, "ra": 6.70, "dec": -45.0, "mag": 1.5}
    ],
    "lines": [[0, 1], [1, 2], [0, 4]]
}]}"#;

fn test_config() -> SkyConfig {
    SkyConfig {
        catalog_source: CatalogSource::Inline(CLUSTER.to_string()),
        observer_override: Some(Observer::new(0.0, 0.0)),
        request_geolocation: false,
        fixed_time: Some(Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap()),
        show_figures: true,
        show_flow_field: true,
    }
}

fn test_overlay() -> SkyOverlay {
    SkyOverlay::new(test_config(), CatalogCache::new())
}

fn raw_input(events: Vec<egui::Event>) -> egui::RawInput {
    let mut raw = egui::RawInput::default();
    raw.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::ZERO,
        egui::vec2(1200.0, 800.0),
    ));
    raw.events = events;
    raw
}

/// Runs one frame of the overlay on a shared context and returns how many
/// times the exit callback fired, plus the frame output.
fn run_overlay(
    ctx: &egui::Context,
    overlay: &mut SkyOverlay,
    open: bool,
    events: Vec<egui::Event>,
) -> (usize, egui::FullOutput) {
    let mut closes = 0;
    let output = ctx.run(raw_input(events), |ctx| {
        ctx.set_visuals(egui::Visuals::dark());
        overlay.show(ctx, open, &mut || closes += 1);
    });
    (closes, output)
}

fn escape() -> egui::Event {
    egui::Event::Key {
        key: egui::Key::Escape,
        physical_key: None,
        pressed: true,
        repeat: false,
        modifiers: egui::Modifiers::NONE,
    }
}

fn press(pos: egui::Pos2) -> Vec<egui::Event> {
    vec![
        egui::Event::PointerMoved(pos),
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed: true,
            modifiers: egui::Modifiers::NONE,
        },
    ]
}

fn release(pos: egui::Pos2) -> Vec<egui::Event> {
    vec![egui::Event::PointerButton {
        pos,
        button: egui::PointerButton::Primary,
        pressed: false,
        modifiers: egui::Modifiers::NONE,
    }]
}

/// Clicks at `pos` over two frames and returns the number of exit callbacks.
fn click(ctx: &egui::Context, overlay: &mut SkyOverlay, pos: egui::Pos2) -> usize {
    let (a, _) = run_overlay(ctx, overlay, true, press(pos));
    let (b, _) = run_overlay(ctx, overlay, true, release(pos));
    a + b
}

#[test]
fn opening_with_inline_catalog_becomes_active() {
    let ctx = egui::Context::default();
    let mut overlay = test_overlay();

    let (closes, output) = run_overlay(&ctx, &mut overlay, true, vec![]);
    assert_eq!(closes, 0);
    assert_eq!(overlay.phase, OverlayPhase::Active);

    let session = overlay.session.as_ref().expect("session should be open");
    assert_eq!(session.catalog.as_ref().map(|c| c.star_count()), Some(5));
    assert!(session.observer.is_resolved());
    assert_eq!(session.field.viewport(), egui::vec2(1200.0, 800.0));

    let ids: Vec<_> = session.field.visible_stars().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    for star in session.field.visible_stars() {
        assert!((0.0..1200.0).contains(&star.pos.x));
        assert!((0.0..=800.0).contains(&star.pos.y));
    }
    // Roughly due south, halfway up the sky.
    let first = session.field.visible_stars()[0];
    assert!((first.pos.x - 600.0).abs() < 20.0);
    assert!((first.pos.y - 400.0).abs() < 20.0);

    let flow = session.flow.as_ref().expect("flow layer should be built");
    assert_eq!(flow.size(), egui::vec2(1200.0, 800.0));

    // Animation keeps asking for frames while open.
    let repaint = output
        .viewport_output
        .get(&egui::ViewportId::ROOT)
        .map(|v| v.repaint_delay);
    assert_eq!(repaint, Some(std::time::Duration::ZERO));
}

#[test]
fn escape_closes_and_fires_callback_once() {
    let ctx = egui::Context::default();
    let mut overlay = test_overlay();
    run_overlay(&ctx, &mut overlay, true, vec![]);

    let (closes, _) = run_overlay(&ctx, &mut overlay, true, vec![escape()]);
    assert_eq!(closes, 1);
    assert_eq!(overlay.phase, OverlayPhase::Closed);
    assert!(overlay.session.is_none());

    // The host clears its flag; nothing fires again.
    let (closes, _) = run_overlay(&ctx, &mut overlay, false, vec![escape()]);
    assert_eq!(closes, 0);
    assert_eq!(overlay.phase, OverlayPhase::Closed);
}

#[test]
fn clicking_empty_sky_closes_once() {
    let ctx = egui::Context::default();
    let mut overlay = test_overlay();
    run_overlay(&ctx, &mut overlay, true, vec![]);

    let closes = click(&ctx, &mut overlay, egui::pos2(100.0, 100.0));
    assert_eq!(closes, 1);
    assert_eq!(overlay.phase, OverlayPhase::Closed);

    let (closes, _) = run_overlay(&ctx, &mut overlay, false, vec![]);
    assert_eq!(closes, 0);
}

#[test]
fn clicking_a_star_links_its_neighbours() {
    let ctx = egui::Context::default();
    let mut overlay = test_overlay();
    run_overlay(&ctx, &mut overlay, true, vec![]);

    let target = overlay
        .session
        .as_ref()
        .and_then(|s| s.field.position_of(1))
        .expect("star 1 should be visible");

    let closes = click(&ctx, &mut overlay, target);
    assert_eq!(closes, 0);
    assert_eq!(overlay.phase, OverlayPhase::Active);

    let field = &overlay.session.as_ref().unwrap().field;
    assert_eq!(field.links().len(), 3);
    assert!(field.links().iter().all(|l| l.from == 1 && l.to != 1));
    assert_eq!(field.link_segments().len(), 3);

    // A second click on a star clears them.
    let closes = click(&ctx, &mut overlay, target);
    assert_eq!(closes, 0);
    assert!(overlay.session.as_ref().unwrap().field.links().is_empty());
}

#[test]
fn host_closing_ends_session_and_cancels_work() {
    let ctx = egui::Context::default();
    let mut overlay = test_overlay();
    run_overlay(&ctx, &mut overlay, true, vec![]);

    let token = Arc::clone(&overlay.session.as_ref().unwrap().cancelled);
    assert!(!token.load(Ordering::Relaxed));

    let (closes, _) = run_overlay(&ctx, &mut overlay, false, vec![]);
    assert_eq!(closes, 0, "host-initiated close does not call back");
    assert_eq!(overlay.phase, OverlayPhase::Closed);
    assert!(overlay.session.is_none());
    assert!(token.load(Ordering::Relaxed));
}

#[test]
fn reopening_starts_a_fresh_session() {
    let ctx = egui::Context::default();
    let mut overlay = test_overlay();
    run_overlay(&ctx, &mut overlay, true, vec![]);

    let first_id = {
        let session = overlay.session.as_mut().unwrap();
        let target = session.field.position_of(1).unwrap();
        session.field.click(target, 0.0);
        assert!(!session.field.links().is_empty());
        session.id
    };

    run_overlay(&ctx, &mut overlay, false, vec![]);
    let (_, _) = run_overlay(&ctx, &mut overlay, true, vec![]);

    // The catalog is cached, so the new session is active immediately.
    assert_eq!(overlay.phase, OverlayPhase::Active);
    let session = overlay.session.as_ref().unwrap();
    assert_ne!(session.id, first_id);
    assert!(session.field.links().is_empty());
    assert!(session.field.pointer().is_none());
    assert_eq!(session.field.idle_fraction(session.opened_at), 0.0);
}

#[test]
fn stale_geolocation_results_are_ignored() {
    let ctx = egui::Context::default();
    let mut config = test_config();
    config.observer_override = None;
    config.request_geolocation = true;
    let mut overlay = SkyOverlay::new(config, CatalogCache::new());

    run_overlay(&ctx, &mut overlay, true, vec![]);
    let stale_id = overlay.session.as_ref().unwrap().id;
    run_overlay(&ctx, &mut overlay, false, vec![]);
    run_overlay(&ctx, &mut overlay, true, vec![]);
    let live_id = overlay.session.as_ref().unwrap().id;

    // The native request already answered "unavailable": default observer.
    let session = overlay.session.as_ref().unwrap();
    assert!(!session.observer.is_resolved());
    assert_eq!(session.observer.observer(), Observer::default());

    let sender = overlay.geolocation_sender.clone();
    sender
        .send(GeolocationResult {
            session: stale_id,
            result: Ok(Observer::new(10.0, 10.0)),
        })
        .unwrap();
    run_overlay(&ctx, &mut overlay, true, vec![]);
    assert!(!overlay.session.as_ref().unwrap().observer.is_resolved());

    let cape_town = Observer::new(-33.9, 18.4);
    sender
        .send(GeolocationResult {
            session: live_id,
            result: Ok(cape_town),
        })
        .unwrap();
    run_overlay(&ctx, &mut overlay, true, vec![]);
    let observer = overlay.session.as_ref().unwrap().observer;
    assert!(observer.is_resolved());
    assert_eq!(observer.observer(), cape_town);

    // Applied at most once per session.
    sender
        .send(GeolocationResult {
            session: live_id,
            result: Ok(Observer::new(60.0, 0.0)),
        })
        .unwrap();
    run_overlay(&ctx, &mut overlay, true, vec![]);
    assert_eq!(
        overlay.session.as_ref().unwrap().observer.observer(),
        cape_town
    );
}

#[test]
fn broken_catalog_degrades_to_empty_sky() {
    let ctx = egui::Context::default();
    let mut config = test_config();
    config.catalog_source = CatalogSource::Inline("{ not json".to_string());
    let mut overlay = SkyOverlay::new(config, CatalogCache::new());

    run_overlay(&ctx, &mut overlay, true, vec![]);
    assert_eq!(overlay.phase, OverlayPhase::Active);
    let session = overlay.session.as_ref().unwrap();
    assert!(session.catalog.as_ref().is_some_and(|c| c.is_empty()));
    assert!(session.field.visible_stars().is_empty());

    // Any click is on empty sky.
    let closes = click(&ctx, &mut overlay, egui::pos2(600.0, 400.0));
    assert_eq!(closes, 1);
    assert_eq!(overlay.phase, OverlayPhase::Closed);
}

#[test]
fn waits_in_loading_while_another_fetch_is_in_flight() {
    let ctx = egui::Context::default();
    let cache = CatalogCache::new();
    assert!(matches!(cache.begin(), CacheRequest::StartFetch));

    let mut overlay = SkyOverlay::new(test_config(), cache.clone());
    run_overlay(&ctx, &mut overlay, true, vec![]);
    assert_eq!(overlay.phase, OverlayPhase::Loading);
    assert!(overlay
        .session
        .as_ref()
        .unwrap()
        .field
        .visible_stars()
        .is_empty());

    cache.complete(Catalog::from_json(CLUSTER));
    run_overlay(&ctx, &mut overlay, true, vec![]);
    assert_eq!(overlay.phase, OverlayPhase::Active);
    assert_eq!(
        overlay.session.as_ref().unwrap().field.visible_stars().len(),
        4
    );
}

#[test]
fn escape_while_loading_closes() {
    let ctx = egui::Context::default();
    let cache = CatalogCache::new();
    cache.begin();

    let mut overlay = SkyOverlay::new(test_config(), cache);
    run_overlay(&ctx, &mut overlay, true, vec![]);
    assert_eq!(overlay.phase, OverlayPhase::Loading);

    let (closes, _) = run_overlay(&ctx, &mut overlay, true, vec![escape()]);
    assert_eq!(closes, 1);
    assert_eq!(overlay.phase, OverlayPhase::Closed);
}

#[test]
fn overlays_share_one_catalog_load() {
    let ctx = egui::Context::default();
    let cache = CatalogCache::new();
    let mut first = SkyOverlay::new(test_config(), cache.clone());
    let mut second = SkyOverlay::new(test_config(), cache.clone());

    run_overlay(&ctx, &mut first, true, vec![]);
    run_overlay(&ctx, &mut first, false, vec![]);
    run_overlay(&ctx, &mut second, true, vec![]);

    let loaded = cache.get().expect("catalog should be cached");
    let catalog = second.session.as_ref().unwrap().catalog.clone().unwrap();
    assert!(Arc::ptr_eq(&loaded, &catalog));
}

#[test]
fn host_app_closes_sky_on_escape() {
    let ctx = egui::Context::default();
    let mut app = SkyApp {
        overlay: test_overlay(),
        sky_open: true,
    };

    let _ = ctx.run(raw_input(vec![]), |ctx| app.ui(ctx));
    assert!(app.overlay.is_open());

    let _ = ctx.run(raw_input(vec![escape()]), |ctx| app.ui(ctx));
    assert!(!app.sky_open);
    assert!(!app.overlay.is_open());

    // The home panel is back and the overlay stays closed.
    let _ = ctx.run(raw_input(vec![]), |ctx| app.ui(ctx));
    assert!(!app.sky_open);
    assert_eq!(app.overlay.phase, OverlayPhase::Closed);
}

#[test]
fn config_fills_missing_fields_with_defaults() {
    let config = SkyConfig::from_json(
        r#"{"show_figures": false, "fixed_time": "2024-06-21T22:00:00Z", "catalog_source": "Bundled"}"#,
    )
    .unwrap();
    assert!(!config.show_figures);
    assert!(config.show_flow_field);
    assert!(config.request_geolocation);
    assert_eq!(config.catalog_source, CatalogSource::Bundled);
    assert_eq!(
        config.sky_time(),
        Utc.with_ymd_and_hms(2024, 6, 21, 22, 0, 0).unwrap()
    );

    let restored = SkyConfig::from_json(&test_config().to_json().unwrap()).unwrap();
    assert_eq!(restored, test_config());
}
