//! Reverse geocoding and admin-name disambiguation.

/// Address fields and admin-level picking rules.
pub mod address;
/// Nominatim reverse geocoder.
pub mod nominatim;
/// Name resolution with fallback and staleness tickets.
pub mod resolver;

#[cfg(test)]
#[path = "../../tests/unit/geocode/mock.rs"]
pub(crate) mod mock;
