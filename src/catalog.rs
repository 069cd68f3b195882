//! Star catalog loading, validation and the shared catalog cache.
//!
//! A catalog is parsed once, validated constellation by constellation, and
//! then shared read-only between overlay sessions through [`CatalogCache`].

use crate::error::SkyError;
use crate::types::{Constellation, Star, StarId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Sample catalog compiled into the binary.
pub const BUNDLED_CATALOG: &str = include_str!("../assets/constellations.json");

/// Where the star catalog comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogSource {
    /// File path on native builds, URL relative to the page on the web
    Path(String),
    /// The sample catalog compiled into the binary
    Bundled,
    /// Catalog JSON supplied directly
    Inline(String),
}

impl Default for CatalogSource {
    fn default() -> Self {
        CatalogSource::Path("assets/constellations.json".to_string())
    }
}

/// On-disk shape of a catalog file.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    constellations: Vec<Constellation>,
}

/// Validated, read-only star catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    constellations: Vec<Constellation>,
    /// Every star once, in catalog order
    stars: Vec<Star>,
    /// Figure segments resolved to star identities
    figures: Vec<(StarId, StarId)>,
}

impl Catalog {
    /// Builds a catalog, skipping constellations that fail validation.
    ///
    /// Stars shared between constellations are flattened once (first
    /// occurrence wins), so the flattened order is stable for the whole
    /// lifetime of the catalog.
    pub fn new(constellations: Vec<Constellation>) -> Self {
        let mut kept = Vec::with_capacity(constellations.len());
        for constellation in constellations {
            match validate_constellation(&constellation) {
                Ok(()) => kept.push(constellation),
                Err(e) => log::warn!("Skipping constellation: {e}"),
            }
        }

        let mut seen = HashSet::new();
        let mut stars = Vec::new();
        let mut figures = Vec::new();
        for constellation in &kept {
            for star in &constellation.stars {
                if seen.insert(star.id) {
                    stars.push(*star);
                }
            }
            for [from, to] in &constellation.lines {
                figures.push((constellation.stars[*from].id, constellation.stars[*to].id));
            }
        }

        Self {
            constellations: kept,
            stars,
            figures,
        }
    }

    /// A catalog with no stars, used when loading fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses and validates catalog JSON.
    ///
    /// # Returns
    ///
    /// The catalog, or `SkyError::CatalogParse` if the JSON does not have the
    /// expected structure. Individual invalid constellations are dropped rather
    /// than failing the whole load.
    pub fn from_json(json: &str) -> Result<Self, SkyError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::new(file.constellations))
    }

    /// Loads the catalog compiled into the binary.
    pub fn bundled() -> Result<Self, SkyError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Constellations that passed validation.
    pub fn constellations(&self) -> &[Constellation] {
        &self.constellations
    }

    /// All stars, de-duplicated by id, in catalog order.
    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    /// Canonical figure segments as pairs of star ids.
    pub fn figure_segments(&self) -> &[(StarId, StarId)] {
        &self.figures
    }

    /// Number of distinct stars.
    pub fn star_count(&self) -> usize {
        self.stars.len()
    }

    /// Whether the catalog has no stars.
    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

/// Checks star ranges and figure indices of one constellation.
pub fn validate_constellation(constellation: &Constellation) -> Result<(), SkyError> {
    if let Some(star) = constellation.stars.iter().find(|s| !s.is_valid()) {
        return Err(SkyError::InvalidStar {
            constellation: constellation.name.clone(),
            id: star.id,
            ra: star.ra,
            dec: star.dec,
            mag: star.mag,
        });
    }

    let len = constellation.stars.len();
    if let Some([from, to]) = constellation
        .lines
        .iter()
        .find(|[from, to]| *from >= len || *to >= len)
    {
        return Err(SkyError::InvalidLine {
            constellation: constellation.name.clone(),
            from: *from,
            to: *to,
        });
    }

    Ok(())
}

/// Outcome of asking the cache for a catalog.
#[derive(Debug, Clone)]
pub enum CacheRequest {
    /// The catalog is already loaded
    Cached(Arc<Catalog>),
    /// The caller is responsible for fetching and must call [`CatalogCache::complete`]
    StartFetch,
    /// Another caller is already fetching
    InFlight,
}

/// What a waiting session sees when polling the cache.
#[derive(Debug, Clone)]
pub enum CacheStatus {
    /// Loaded
    Ready(Arc<Catalog>),
    /// Still being fetched
    Pending,
    /// The last fetch failed (or none was started)
    Failed,
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    InFlight,
    Ready(Arc<Catalog>),
    Failed,
}

/// Process-wide catalog cache with single-flight loading.
///
/// Cloning the handle shares the same slot. At most one fetch is in flight at
/// a time; a failed fetch leaves the cache empty so the next session retries.
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    slot: Arc<Mutex<Slot>>,
}

impl CatalogCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the fetch if nobody holds it, or returns the cached catalog.
    pub fn begin(&self) -> CacheRequest {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Ready(catalog) => CacheRequest::Cached(Arc::clone(catalog)),
            Slot::InFlight => CacheRequest::InFlight,
            Slot::Empty | Slot::Failed => {
                *slot = Slot::InFlight;
                CacheRequest::StartFetch
            }
        }
    }

    /// Stores the result of a fetch claimed with [`CatalogCache::begin`].
    pub fn complete(&self, result: Result<Catalog, SkyError>) {
        let mut slot = self.slot.lock();
        match result {
            Ok(catalog) => {
                log::info!(
                    "Star catalog loaded: {} constellations, {} stars",
                    catalog.constellations().len(),
                    catalog.star_count()
                );
                *slot = Slot::Ready(Arc::new(catalog));
            }
            Err(e) => {
                log::warn!("{e}; continuing with an empty sky");
                *slot = Slot::Failed;
            }
        }
    }

    /// Current state as seen by a waiting session.
    pub fn status(&self) -> CacheStatus {
        match &*self.slot.lock() {
            Slot::Ready(catalog) => CacheStatus::Ready(Arc::clone(catalog)),
            Slot::InFlight => CacheStatus::Pending,
            Slot::Empty | Slot::Failed => CacheStatus::Failed,
        }
    }

    /// The loaded catalog, if any.
    pub fn get(&self) -> Option<Arc<Catalog>> {
        match &*self.slot.lock() {
            Slot::Ready(catalog) => Some(Arc::clone(catalog)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star(id: StarId, ra: f64, dec: f64) -> Star {
        Star::new(id, ra, dec, 2.0)
    }

    #[test]
    fn bundled_catalog_parses() {
        let catalog = Catalog::bundled().unwrap();
        assert!(catalog.constellations().len() >= 8);
        assert!(catalog.star_count() > 40);
        assert!(catalog
            .constellations()
            .iter()
            .any(|c| c.name == "Orion"));
        assert!(catalog.stars().iter().all(Star::is_valid));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = Catalog::from_json("{ not json");
        assert!(matches!(result, Err(SkyError::CatalogParse(_))));

        let result = Catalog::from_json(r#"{"stars": []}"#);
        assert!(matches!(result, Err(SkyError::CatalogParse(_))));
    }

    #[test]
    fn invalid_constellations_are_skipped() {
        let good = Constellation {
            name: "Good".into(),
            stars: vec![star(1, 1.0, 10.0), star(2, 1.5, 12.0)],
            lines: vec![[0, 1]],
        };
        let bad_star = Constellation {
            name: "BadStar".into(),
            stars: vec![star(3, 25.0, 10.0)],
            lines: vec![],
        };
        let bad_line = Constellation {
            name: "BadLine".into(),
            stars: vec![star(4, 2.0, 10.0)],
            lines: vec![[0, 3]],
        };

        assert!(matches!(
            validate_constellation(&bad_star),
            Err(SkyError::InvalidStar { id: 3, .. })
        ));
        assert!(matches!(
            validate_constellation(&bad_line),
            Err(SkyError::InvalidLine { from: 0, to: 3, .. })
        ));

        let catalog = Catalog::new(vec![good, bad_star, bad_line]);
        assert_eq!(catalog.constellations().len(), 1);
        assert_eq!(catalog.stars().iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn shared_stars_are_flattened_once_and_figures_use_ids() {
        let a = Constellation {
            name: "A".into(),
            stars: vec![star(10, 1.0, 0.0), star(11, 2.0, 0.0)],
            lines: vec![[0, 1]],
        };
        let b = Constellation {
            name: "B".into(),
            stars: vec![star(11, 2.0, 0.0), star(12, 3.0, 0.0)],
            lines: vec![[1, 0]],
        };

        let catalog = Catalog::new(vec![a, b]);
        let ids: Vec<_> = catalog.stars().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(catalog.figure_segments(), &[(10, 11), (12, 11)]);
    }

    #[test]
    fn empty_catalog_has_no_stars() {
        let catalog = Catalog::empty();
        assert!(catalog.is_empty());
        assert!(catalog.figure_segments().is_empty());
    }

    #[test]
    fn cache_is_single_flight() {
        let cache = CatalogCache::new();
        let other = cache.clone();

        assert!(matches!(cache.begin(), CacheRequest::StartFetch));
        assert!(matches!(other.begin(), CacheRequest::InFlight));
        assert!(matches!(other.status(), CacheStatus::Pending));

        cache.complete(Catalog::bundled());
        let loaded = other.get().expect("catalog should be cached");
        match other.begin() {
            CacheRequest::Cached(catalog) => assert!(Arc::ptr_eq(&catalog, &loaded)),
            unexpected => panic!("expected cached catalog, got {unexpected:?}"),
        }
    }

    #[test]
    fn failed_fetch_allows_retry() {
        let cache = CatalogCache::new();
        assert!(matches!(cache.begin(), CacheRequest::StartFetch));
        cache.complete(Err(SkyError::CatalogLoad("offline".into())));

        assert!(matches!(cache.status(), CacheStatus::Failed));
        assert!(cache.get().is_none());
        assert!(matches!(cache.begin(), CacheRequest::StartFetch));
    }

    #[test]
    fn default_source_points_at_assets() {
        assert_eq!(
            CatalogSource::default(),
            CatalogSource::Path("assets/constellations.json".into())
        );
    }
}
