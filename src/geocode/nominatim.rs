use tracing::debug;

use crate::foundation::core::Location;
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::geocode::address::AddressFields;
use crate::net::{BoxFuture, HttpClient};

/// Public OpenStreetMap reverse endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
/// Address detail level (Nominatim zoom) asked for on every lookup.
pub const DEFAULT_DETAIL: u8 = 14;

/// Coordinates-to-address lookup.
pub trait ReverseGeocoder: Send + Sync {
    /// Resolve the address fields around `location`.
    fn reverse(&self, location: Location) -> BoxFuture<'_, CityPaperResult<AddressFields>>;
}

/// [`ReverseGeocoder`] backed by a Nominatim-compatible HTTP service.
#[derive(Clone, Debug)]
pub struct NominatimGeocoder {
    http: HttpClient,
    endpoint: url::Url,
    locale: String,
    detail: u8,
}

impl NominatimGeocoder {
    /// Create a geocoder for `endpoint`, sending `locale` as the language hint.
    pub fn new(
        http: HttpClient,
        endpoint: &str,
        locale: impl Into<String>,
        detail: u8,
    ) -> CityPaperResult<Self> {
        let endpoint = url::Url::parse(endpoint).map_err(|e| {
            CityPaperError::validation(format!("invalid geocode endpoint '{endpoint}': {e}"))
        })?;
        Ok(Self {
            http,
            endpoint,
            locale: locale.into(),
            detail,
        })
    }

    /// Request URL for one lookup.
    pub fn request_url(&self, location: Location) -> url::Url {
        let mut url = self.endpoint.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("format", "jsonv2")
                .append_pair("lat", &location.lat().to_string())
                .append_pair("lon", &location.lng().to_string())
                .append_pair("zoom", &self.detail.to_string())
                .append_pair("addressdetails", "1");
            if !self.locale.is_empty() {
                q.append_pair("accept-language", &self.locale);
            }
        }
        url
    }
}

/// Extract address fields from a reverse-lookup response body.
pub fn parse_reverse_response(body: &[u8]) -> CityPaperResult<AddressFields> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| CityPaperError::geocode_failed(format!("malformed response: {e}")))?;
    if let Some(err) = value.get("error") {
        return Err(CityPaperError::geocode_failed(format!(
            "service error: {}",
            err.as_str().unwrap_or("unknown")
        )));
    }
    match value.get("address") {
        Some(address) if address.is_object() => Ok(AddressFields::from_json(address)),
        _ => Err(CityPaperError::geocode_failed("response has no address object")),
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse(&self, location: Location) -> BoxFuture<'_, CityPaperResult<AddressFields>> {
        Box::pin(async move {
            let url = self.request_url(location);
            debug!(%url, "reverse geocode");
            let body = self
                .http
                .get_bytes(url.as_str())
                .await
                .map_err(|e| CityPaperError::geocode_failed(e.to_string()))?;
            parse_reverse_response(&body)
        })
    }
}
