use crate::foundation::error::{CityPaperError, CityPaperResult};

pub use kurbo::{Point, Rect, Size};

/// Lowest zoom level a surface will display.
pub const MIN_ZOOM: f64 = 10.0;
/// Highest zoom level a surface will display.
pub const MAX_ZOOM: f64 = 18.0;
/// Zoom used when no zoom is supplied.
pub const DEFAULT_ZOOM: f64 = 13.0;

/// Geographic point in WGS84 degrees.
///
/// Construct through [`Location::new`]; latitude is limited to `[-90, 90]` and longitude to
/// `[-180, 180]`, so an existing value is always safe to hand to a surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Location {
    lat: f64,
    lng: f64,
}

impl Location {
    /// Create a validated location.
    pub fn new(lat: f64, lng: f64) -> CityPaperResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CityPaperError::invalid_coordinate(format!(
                "latitude {lat} must be within [-90, 90]"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(CityPaperError::invalid_coordinate(format!(
                "longitude {lng} must be within [-180, 180]"
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Build a location by clamping into range. Non-finite components become zero.
    pub(crate) fn clamped(lat: f64, lng: f64) -> Self {
        fn fit(v: f64, limit: f64) -> f64 {
            if v.is_finite() { v.clamp(-limit, limit) } else { 0.0 }
        }
        Self {
            lat: fit(lat, 90.0),
            lng: fit(lng, 180.0),
        }
    }

    /// Latitude in degrees.
    pub fn lat(self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(self) -> f64 {
        self.lng
    }

    /// Human-readable coordinate line with 4 decimals and hemisphere letters.
    pub fn coordinate_line(self) -> String {
        let ns = if self.lat < 0.0 { 'S' } else { 'N' };
        let ew = if self.lng < 0.0 { 'W' } else { 'E' };
        format!(
            "{:.4}\u{b0} {ns} / {:.4}\u{b0} {ew}",
            self.lat.abs(),
            self.lng.abs()
        )
    }

    /// Return `true` when both components match within `eps` degrees.
    pub fn approx_eq(self, other: Location, eps: f64) -> bool {
        (self.lat - other.lat).abs() <= eps && (self.lng - other.lng).abs() <= eps
    }
}

impl<'de> serde::Deserialize<'de> for Location {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct Repr {
            lat: f64,
            #[serde(alias = "lon")]
            lng: f64,
        }

        let r = Repr::deserialize(deserializer)?;
        Location::new(r.lat, r.lng).map_err(serde::de::Error::custom)
    }
}

/// Clamp a requested zoom into `[MIN_ZOOM, MAX_ZOOM]`.
///
/// Non-finite requests map to [`MIN_ZOOM`]; out-of-range requests are never rejected.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return MIN_ZOOM;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Supported wallpaper aspect ratios (width:height).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum AspectRatioId {
    /// 9:19, the on-screen device frame.
    #[default]
    #[serde(rename = "9:19")]
    Phone9x19,
    /// 9:20, tall modern phones.
    #[serde(rename = "9:20")]
    Phone9x20,
    /// 9:16, classic phones.
    #[serde(rename = "9:16")]
    Phone9x16,
}

impl AspectRatioId {
    /// All supported ratios in display order.
    pub const ALL: [AspectRatioId; 3] = [Self::Phone9x19, Self::Phone9x20, Self::Phone9x16];

    /// `(width, height)` parts of the ratio.
    pub fn parts(self) -> (u32, u32) {
        match self {
            Self::Phone9x19 => (9, 19),
            Self::Phone9x20 => (9, 20),
            Self::Phone9x16 => (9, 16),
        }
    }

    /// Persisted form, e.g. `9:19`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phone9x19 => "9:19",
            Self::Phone9x20 => "9:20",
            Self::Phone9x16 => "9:16",
        }
    }

    /// File-name-safe form, e.g. `9x19`.
    pub fn file_tag(self) -> &'static str {
        match self {
            Self::Phone9x19 => "9x19",
            Self::Phone9x20 => "9x20",
            Self::Phone9x16 => "9x16",
        }
    }

    /// Logical capture-target size for a given logical width.
    pub fn logical_size(self, width: f64) -> Size {
        let (w, h) = self.parts();
        let height = (width * f64::from(h) / f64::from(w)).round();
        Size::new(width, height)
    }
}

impl std::str::FromStr for AspectRatioId {
    type Err = CityPaperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s || r.file_tag() == s)
            .ok_or_else(|| {
                CityPaperError::validation(format!(
                    "unknown aspect ratio '{s}' (expected 9:19, 9:20 or 9:16)"
                ))
            })
    }
}

/// Zoom and aspect ratio for a surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewportSpec {
    /// Requested zoom level; clamped to `[MIN_ZOOM, MAX_ZOOM]` when applied.
    #[serde(default = "default_zoom")]
    pub zoom_level: f64,
    /// Capture-target aspect ratio.
    #[serde(default)]
    pub aspect_ratio: AspectRatioId,
}

fn default_zoom() -> f64 {
    DEFAULT_ZOOM
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self {
            zoom_level: DEFAULT_ZOOM,
            aspect_ratio: AspectRatioId::default(),
        }
    }
}

impl ViewportSpec {
    /// Create a viewport spec.
    pub fn new(zoom_level: f64, aspect_ratio: AspectRatioId) -> Self {
        Self {
            zoom_level,
            aspect_ratio,
        }
    }

    /// Zoom after clamping.
    pub fn effective_zoom(self) -> f64 {
        clamp_zoom(self.zoom_level)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
