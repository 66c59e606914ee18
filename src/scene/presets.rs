use crate::assets::color::Color;
use crate::foundation::core::Location;
use crate::scene::model::PlaceLabel;

/// A built-in place with a ready-made label.
#[derive(Clone, Debug, PartialEq)]
pub struct Preset {
    /// Where the map is centered.
    pub location: Location,
    /// Label shown over the map.
    pub label: PlaceLabel,
}

struct Row {
    name: &'static str,
    country: &'static str,
    lat: f64,
    lng: f64,
    accent: Color,
    description: &'static str,
}

const ROWS: &[Row] = &[
    Row {
        name: "Tokyo",
        country: "Japan",
        lat: 35.6762,
        lng: 139.6503,
        accent: Color::rgb(0xff, 0x00, 0x55),
        description: "A neon-lit metropolis where tradition meets the future.",
    },
    Row {
        name: "Paris",
        country: "France",
        lat: 48.8566,
        lng: 2.3522,
        accent: Color::rgb(0xd4, 0xaf, 0x37),
        description: "Stone boulevards and river light, forever in bloom.",
    },
    Row {
        name: "New York",
        country: "United States",
        lat: 40.7128,
        lng: -74.0060,
        accent: Color::rgb(0xff, 0xc1, 0x07),
        description: "A vertical city that never quite finishes its sentence.",
    },
    Row {
        name: "Shanghai",
        country: "China",
        lat: 31.2304,
        lng: 121.4737,
        accent: Color::rgb(0x00, 0xe5, 0xff),
        description: "Old lanes and glass towers facing each other across the Huangpu.",
    },
    Row {
        name: "Reykjavik",
        country: "Iceland",
        lat: 64.1466,
        lng: -21.9426,
        accent: Color::rgb(0x7c, 0xfc, 0x00),
        description: "Colored roofs at the edge of the northern lights.",
    },
    Row {
        name: "Cape Town",
        country: "South Africa",
        lat: -33.9249,
        lng: 18.4241,
        accent: Color::rgb(0xff, 0x6f, 0x3c),
        description: "Where the mountain meets two oceans.",
    },
];

impl Row {
    fn to_preset(&self) -> Preset {
        Preset {
            location: Location::clamped(self.lat, self.lng),
            label: PlaceLabel {
                display_name: self.name.to_owned(),
                country_or_region: self.country.to_owned(),
                description: self.description.to_owned(),
                accent_color: self.accent,
            },
        }
    }
}

/// All built-in places, default first.
pub fn presets() -> Vec<Preset> {
    ROWS.iter().map(Row::to_preset).collect()
}

/// The place shown before the caller picks anything (Tokyo).
pub fn default_place() -> Preset {
    ROWS[0].to_preset()
}
