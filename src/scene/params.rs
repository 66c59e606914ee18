use tracing::warn;

use crate::assets::color::Color;
use crate::foundation::core::{AspectRatioId, Location, ViewportSpec};
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::scene::model::{PlaceLabel, StyleId};

/// Initial inputs persisted as a `key=value&...` string.
///
/// Keys: `lat`, `lng`, `zoom`, `style`, `accent`, `ratio`, `name`. Unknown keys are ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WallpaperParams {
    /// Map center; only set when both `lat` and `lng` are present.
    pub location: Option<Location>,
    /// Requested zoom.
    pub zoom: Option<f64>,
    /// Style id.
    pub style: Option<StyleId>,
    /// Accent color.
    pub accent: Option<Color>,
    /// Aspect ratio.
    pub ratio: Option<AspectRatioId>,
    /// Display name.
    pub name: Option<String>,
}

impl WallpaperParams {
    /// Parse a query string, with or without a leading `?`.
    ///
    /// Out-of-range coordinates are rejected with `InvalidCoordinate`. Malformed values of the
    /// other keys are logged and ignored so a stale link still opens.
    pub fn from_query(query: &str) -> CityPaperResult<Self> {
        let query = query.trim().trim_start_matches('?');
        let mut out = Self::default();
        let (mut lat, mut lng) = (None, None);

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "lat" => lat = Some(parse_coord("lat", value)?),
                "lng" | "lon" => lng = Some(parse_coord("lng", value)?),
                "zoom" => out.zoom = lenient("zoom", value, value.parse::<f64>().ok()),
                "style" => out.style = lenient("style", value, value.parse().ok()),
                "accent" => out.accent = lenient("accent", value, value.parse().ok()),
                "ratio" => out.ratio = lenient("ratio", value, value.parse().ok()),
                "name" if !value.is_empty() => out.name = Some(value.to_owned()),
                _ => {}
            }
        }

        out.location = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Location::new(lat, lng)?),
            (None, None) => None,
            _ => {
                return Err(CityPaperError::invalid_coordinate(
                    "lat and lng must be given together",
                ));
            }
        };
        Ok(out)
    }

    /// Serialize the present fields in a stable key order.
    pub fn to_query(&self) -> String {
        let mut q = url::form_urlencoded::Serializer::new(String::new());
        if let Some(loc) = self.location {
            q.append_pair("lat", &loc.lat().to_string());
            q.append_pair("lng", &loc.lng().to_string());
        }
        if let Some(zoom) = self.zoom {
            q.append_pair("zoom", &zoom.to_string());
        }
        if let Some(style) = self.style {
            q.append_pair("style", style.as_str());
        }
        if let Some(accent) = self.accent {
            q.append_pair("accent", &accent.to_hex());
        }
        if let Some(ratio) = self.ratio {
            q.append_pair("ratio", ratio.as_str());
        }
        if let Some(name) = &self.name {
            q.append_pair("name", name);
        }
        q.finish()
    }

    /// Viewport from these params over `base`.
    pub fn viewport(&self, base: ViewportSpec) -> ViewportSpec {
        ViewportSpec::new(
            self.zoom.unwrap_or(base.zoom_level),
            self.ratio.unwrap_or(base.aspect_ratio),
        )
    }

    /// Label from these params over `base`.
    pub fn label(&self, mut base: PlaceLabel) -> PlaceLabel {
        if let Some(name) = &self.name {
            base.display_name = name.clone();
        }
        if let Some(accent) = self.accent {
            base.accent_color = accent;
        }
        base
    }
}

fn parse_coord(key: &str, value: &str) -> CityPaperResult<f64> {
    value
        .parse::<f64>()
        .map_err(|_| CityPaperError::invalid_coordinate(format!("{key} '{value}' is not a number")))
}

fn lenient<T>(key: &str, raw: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        warn!(key, value = raw, "ignoring malformed query parameter");
    }
    parsed
}
