use crate::assets::color::Color;
use crate::foundation::core::Location;
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::net::BoxFuture;
use crate::scene::model::PlaceLabel;
use crate::scene::presets::{Preset, presets};

/// A place found by free-text search.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PlaceResult {
    /// Display name.
    pub name: String,
    /// Country or region.
    pub country: String,
    /// Map center.
    pub location: Location,
    /// Short description.
    pub description: String,
    /// Accent color for the label.
    pub accent_color: Color,
    /// Provenance links, if the search backend reports any.
    pub source_urls: Vec<String>,
}

impl PlaceResult {
    /// Split into what a surface needs.
    pub fn into_scene(self) -> (Location, PlaceLabel) {
        (
            self.location,
            PlaceLabel {
                display_name: self.name,
                country_or_region: self.country,
                description: self.description,
                accent_color: self.accent_color,
            },
        )
    }
}

impl From<Preset> for PlaceResult {
    fn from(p: Preset) -> Self {
        Self {
            name: p.label.display_name,
            country: p.label.country_or_region,
            location: p.location,
            description: p.label.description,
            accent_color: p.label.accent_color,
            source_urls: Vec::new(),
        }
    }
}

/// Free-text place lookup.
///
/// Backends may be anything from a fixed list to a remote service; only the result shape is
/// fixed. `Ok(None)` means nothing matched.
pub trait PlaceSearch: Send + Sync {
    /// Find the best match for `query`.
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, CityPaperResult<Option<PlaceResult>>>;
}

/// [`PlaceSearch`] over the built-in presets.
///
/// Exact name or country matches win over prefixes, which win over substrings.
#[derive(Clone, Debug)]
pub struct PresetSearch {
    presets: Vec<Preset>,
}

impl Default for PresetSearch {
    fn default() -> Self {
        Self { presets: presets() }
    }
}

impl PresetSearch {
    /// Search over a custom preset list.
    pub fn new(presets: Vec<Preset>) -> Self {
        Self { presets }
    }

    /// Synchronous lookup.
    pub fn find(&self, query: &str) -> CityPaperResult<Option<PlaceResult>> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Err(CityPaperError::validation("search query is empty"));
        }
        let rank = |p: &Preset| -> Option<u8> {
            let name = p.label.display_name.to_lowercase();
            let country = p.label.country_or_region.to_lowercase();
            if name == q || country == q {
                Some(0)
            } else if name.starts_with(&q) {
                Some(1)
            } else if name.contains(&q) || country.contains(&q) {
                Some(2)
            } else {
                None
            }
        };
        Ok(self
            .presets
            .iter()
            .filter_map(|p| rank(p).map(|r| (r, p)))
            .min_by_key(|(r, _)| *r)
            .map(|(_, p)| PlaceResult::from(p.clone())))
    }
}

impl PlaceSearch for PresetSearch {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, CityPaperResult<Option<PlaceResult>>> {
        Box::pin(async move { self.find(query) })
    }
}
