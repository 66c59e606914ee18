use std::path::Path;

use anyhow::Context as _;
use tracing::info;

use crate::assets::color::Color;
use crate::capture::pipeline::{BatchItem, BatchScene};
use crate::foundation::core::{AspectRatioId, DEFAULT_ZOOM, Location, ViewportSpec};
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::geocode::address::{FALLBACK_NAME, Granularity};
use crate::geocode::resolver::AdminNameResolver;
use crate::scene::model::{PlaceLabel, StyleId};

/// Batch description read from JSON.
///
/// ```json
/// { "style": "retro", "zoom": 13, "ratio": "9:19", "granularity": "city",
///   "items": [ { "lat": 35.68, "lng": 139.65, "name": "Tokyo" }, { "lat": 31.23, "lng": 121.47 } ] }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchFile {
    /// Style shared by every item.
    #[serde(default)]
    pub style: StyleId,
    /// Zoom shared by every item.
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Aspect ratio shared by every item.
    #[serde(default)]
    pub ratio: AspectRatioId,
    /// Level used when an item's name has to be looked up.
    #[serde(default)]
    pub granularity: Granularity,
    /// Whether labels are drawn.
    #[serde(default = "default_true")]
    pub show_labels: bool,
    /// Places in export order.
    pub items: Vec<BatchEntry>,
}

/// One place in a [`BatchFile`].
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchEntry {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    #[serde(alias = "lon")]
    pub lng: f64,
    /// Display name; looked up when missing or blank.
    #[serde(default)]
    pub name: Option<String>,
    /// Country or region line.
    #[serde(default)]
    pub country: Option<String>,
    /// Description under the coordinates.
    #[serde(default)]
    pub description: Option<String>,
    /// Accent bar color.
    #[serde(default)]
    pub accent: Option<Color>,
}

fn default_zoom() -> f64 {
    DEFAULT_ZOOM
}

fn default_true() -> bool {
    true
}

impl BatchFile {
    /// Parse a batch from JSON text.
    pub fn from_json(text: &str) -> CityPaperResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| CityPaperError::validation(format!("invalid batch file: {e}")))
    }

    /// Read and parse a batch file.
    pub fn from_path(path: &Path) -> CityPaperResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read batch file '{}'", path.display()))?;
        Self::from_json(&text)
    }

    /// Shared scene settings.
    pub fn scene(&self) -> BatchScene {
        BatchScene {
            style: self.style.spec(),
            viewport: ViewportSpec::new(self.zoom, self.ratio),
            show_labels: self.show_labels,
        }
    }

    /// Validate every coordinate and fill in missing names.
    ///
    /// Any out-of-range coordinate rejects the whole batch before anything is rendered.
    /// Names are looked up one at a time in item order; without a resolver, missing names
    /// become the fallback name.
    pub async fn prepare(
        &self,
        resolver: Option<&AdminNameResolver>,
    ) -> CityPaperResult<(BatchScene, Vec<BatchItem>)> {
        if self.items.is_empty() {
            return Err(CityPaperError::validation("batch has no items"));
        }
        let locations = self
            .items
            .iter()
            .enumerate()
            .map(|(i, e)| {
                Location::new(e.lat, e.lng).map_err(|err| {
                    CityPaperError::invalid_coordinate(format!("item {}: {err}", i + 1))
                })
            })
            .collect::<CityPaperResult<Vec<_>>>()?;

        let mut items = Vec::with_capacity(self.items.len());
        for (entry, location) in self.items.iter().zip(locations) {
            let given = entry.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
            let display_name = match (given, resolver) {
                (Some(name), _) => name.to_owned(),
                (None, Some(r)) => r.resolve(location, self.granularity).await,
                (None, None) => FALLBACK_NAME.to_owned(),
            };
            let mut label = PlaceLabel::named(display_name);
            label.country_or_region = entry.country.clone().unwrap_or_default();
            label.description = entry.description.clone().unwrap_or_default();
            if let Some(accent) = entry.accent {
                label.accent_color = accent;
            }
            items.push(BatchItem { location, label });
        }
        info!(items = items.len(), style = self.style.as_str(), "batch prepared");
        Ok((self.scene(), items))
    }
}
