use crate::foundation::error::CityPaperError;

/// Name used when no usable address field is available.
pub const FALLBACK_NAME: &str = "Custom Location";

/// Provinces administered directly as cities.
const MUNICIPALITIES: &[&str] = &[
    "北京", "上海", "天津", "重庆", "Beijing", "Shanghai", "Tianjin", "Chongqing",
];

const CITY_SUFFIXES: &[&str] = &["市", "自治州", "州", "盟", "地区", " city", " prefecture", " league"];
const DISTRICT_SUFFIXES: &[&str] = &["区", "县", "旗", " district", " county", " banner"];
const PROVINCE_SUFFIXES: &[&str] = &["省", "自治区", " province", " autonomous region"];
const STREET_SUFFIXES: &[&str] = &["街道", "街", "路", " subdistrict", " street", " road"];

/// Administrative level requested for a resolved name.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// State or province.
    Province,
    /// City, including direct-administered municipalities.
    #[default]
    City,
    /// District or county inside a city.
    District,
}

impl Granularity {
    /// Persisted form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Province => "province",
            Self::City => "city",
            Self::District => "district",
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = CityPaperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "province" | "state" => Ok(Self::Province),
            "city" => Ok(Self::City),
            "district" | "county" => Ok(Self::District),
            other => Err(CityPaperError::validation(format!(
                "unknown granularity '{other}' (expected province, city or district)"
            ))),
        }
    }
}

/// Address fields of a reverse-geocoding answer. Any subset may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressFields {
    /// `state`
    pub state: Option<String>,
    /// `province`
    pub province: Option<String>,
    /// `state_district`
    pub state_district: Option<String>,
    /// `city`
    pub city: Option<String>,
    /// `municipality`
    pub municipality: Option<String>,
    /// `district` or `city_district`
    pub district: Option<String>,
    /// `county`
    pub county: Option<String>,
    /// `suburb`
    pub suburb: Option<String>,
    /// `town`
    pub town: Option<String>,
}

impl AddressFields {
    /// Read fields from a loosely typed address object.
    ///
    /// Non-string and blank values are treated as absent; numbers are kept as text.
    pub fn from_json(address: &serde_json::Value) -> Self {
        let field = |key: &str| -> Option<String> {
            let text = match address.get(key)? {
                serde_json::Value::String(s) => s.trim().to_owned(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!text.is_empty()).then_some(text)
        };
        Self {
            state: field("state"),
            province: field("province"),
            state_district: field("state_district"),
            city: field("city"),
            municipality: field("municipality"),
            district: field("district").or_else(|| field("city_district")),
            county: field("county"),
            suburb: field("suburb"),
            town: field("town"),
        }
    }
}

fn has_suffix(name: &str, suffixes: &[&str]) -> bool {
    let lower = name.to_lowercase();
    suffixes.iter().any(|s| lower.ends_with(s))
}

fn is_city_level(name: &str) -> bool {
    has_suffix(name, CITY_SUFFIXES)
}

fn is_district_level(name: &str) -> bool {
    // 自治区 and 地区 also end in 区
    !is_province_level(name) && !is_city_level(name) && has_suffix(name, DISTRICT_SUFFIXES)
}

fn is_province_level(name: &str) -> bool {
    has_suffix(name, PROVINCE_SUFFIXES)
}

fn is_street_level(name: &str) -> bool {
    has_suffix(name, STREET_SUFFIXES)
}

fn is_municipality(name: &str) -> bool {
    let bare = name.trim().trim_end_matches('市');
    name.ends_with('市') || MUNICIPALITIES.iter().any(|m| bare.eq_ignore_ascii_case(m))
}

/// Choose a display name for `granularity`, or `fallback` when nothing fits.
pub fn pick_admin_name(fields: &AddressFields, granularity: Granularity, fallback: &str) -> String {
    let picked = match granularity {
        Granularity::Province => fields.state.as_ref().or(fields.province.as_ref()),
        Granularity::District => pick_district(fields),
        Granularity::City => pick_city(fields),
    };
    picked.cloned().unwrap_or_else(|| fallback.to_owned())
}

fn pick_district(f: &AddressFields) -> Option<&String> {
    if let Some(city) = &f.city
        && is_district_level(city)
    {
        return Some(city);
    }
    [&f.district, &f.county, &f.suburb, &f.town]
        .into_iter()
        .flatten()
        .find(|name| !is_street_level(name))
}

fn pick_city(f: &AddressFields) -> Option<&String> {
    if let Some(m) = &f.municipality {
        return Some(m);
    }
    if let Some(sd) = &f.state_district
        && is_city_level(sd)
    {
        return Some(sd);
    }
    if let Some(city) = &f.city
        && !is_district_level(city)
        && !is_province_level(city)
    {
        return Some(city);
    }
    if let Some(sd) = &f.state_district {
        return Some(sd);
    }
    if let Some(city) = &f.city {
        return Some(city);
    }
    if let Some(state) = &f.state
        && is_municipality(state)
    {
        return Some(state);
    }
    f.town.as_ref()
}

#[cfg(test)]
#[path = "../../tests/unit/geocode/address.rs"]
mod tests;
