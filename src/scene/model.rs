use crate::assets::color::Color;
use crate::foundation::error::CityPaperError;

/// Placeholder shown while an admin name lookup is in flight.
pub const RESOLVING_NAME: &str = "Locating\u{2026}";

/// Text shown in the label block. Owned by the caller; surfaces only read it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlaceLabel {
    /// Main title, e.g. the city name. May hold [`RESOLVING_NAME`] transiently.
    pub display_name: String,
    /// Country or region line.
    #[serde(default)]
    pub country_or_region: String,
    /// Short poetic description.
    #[serde(default)]
    pub description: String,
    /// Accent color for the bar above the title.
    #[serde(default = "default_accent")]
    pub accent_color: Color,
}

fn default_accent() -> Color {
    Color::WHITE
}

impl PlaceLabel {
    /// Label with only a display name.
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            country_or_region: String::new(),
            description: String::new(),
            accent_color: default_accent(),
        }
    }

    /// Return `true` while the display name is the in-flight placeholder.
    pub fn is_resolving(&self) -> bool {
        self.display_name == RESOLVING_NAME
    }
}

/// Identifier of a catalog style.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StyleId {
    /// Midnight Dark.
    #[default]
    Dark,
    /// Pure Light.
    Light,
    /// Clean Silver.
    Silver,
    /// Vintage Retro.
    Retro,
}

impl StyleId {
    /// Catalog order.
    pub const ALL: [StyleId; 4] = [Self::Dark, Self::Light, Self::Silver, Self::Retro];

    /// Persisted form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
            Self::Silver => "silver",
            Self::Retro => "retro",
        }
    }

    /// Next style in catalog order, wrapping around.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Catalog entry for this id.
    pub fn spec(self) -> StyleSpec {
        style_catalog()
            .into_iter()
            .find(|s| s.id == self)
            .unwrap_or_else(StyleSpec::midnight_dark)
    }
}

impl std::str::FromStr for StyleId {
    type Err = CityPaperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                CityPaperError::validation(format!(
                    "unknown style '{s}' (expected dark, light, silver or retro)"
                ))
            })
    }
}

/// Immutable map style: tile source plus text and background colors.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StyleSpec {
    /// Catalog id.
    pub id: StyleId,
    /// Display name.
    pub name: &'static str,
    /// XYZ URL template with `{s}`, `{z}`, `{x}`, `{y}` and optional `{r}` placeholders.
    pub tile_source_template: &'static str,
    /// Attribution line for the tile provider.
    pub attribution: &'static str,
    /// Label text color.
    pub text_color: Color,
    /// Fill behind the tiles.
    pub background_color: Color,
}

impl StyleSpec {
    fn midnight_dark() -> Self {
        Self {
            id: StyleId::Dark,
            name: "Midnight Dark",
            tile_source_template: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
            attribution: "\u{a9} OpenStreetMap \u{a9} CARTO",
            text_color: Color::rgb(0xff, 0xff, 0xff),
            background_color: Color::rgb(0x1a, 0x1a, 0x1a),
        }
    }
}

/// The fixed style catalog.
pub fn style_catalog() -> Vec<StyleSpec> {
    vec![
        StyleSpec::midnight_dark(),
        StyleSpec {
            id: StyleId::Light,
            name: "Pure Light",
            tile_source_template: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
            attribution: "\u{a9} OpenStreetMap \u{a9} CARTO",
            text_color: Color::rgb(0x00, 0x00, 0x00),
            background_color: Color::rgb(0xff, 0xff, 0xff),
        },
        StyleSpec {
            id: StyleId::Silver,
            name: "Clean Silver",
            tile_source_template:
                "https://{s}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png",
            attribution: "\u{a9} OpenStreetMap \u{a9} CARTO",
            text_color: Color::rgb(0x33, 0x33, 0x33),
            background_color: Color::rgb(0xf5, 0xf5, 0xf5),
        },
        StyleSpec {
            id: StyleId::Retro,
            name: "Vintage Retro",
            tile_source_template: "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png",
            attribution: "\u{a9} OpenStreetMap contributors",
            text_color: Color::rgb(0x4a, 0x37, 0x28),
            background_color: Color::rgb(0xff, 0xfc, 0xf0),
        },
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
