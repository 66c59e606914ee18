//! Spherical Web Mercator in tile-pixel space.

use std::f64::consts::PI;

use crate::foundation::core::{Location, Point};

/// Edge length of one tile in pixels at its native zoom.
pub(crate) const TILE_SIZE: f64 = 256.0;

/// Latitude where the square Mercator world ends.
pub(crate) const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// World edge length in pixels at `zoom`.
pub(crate) fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project a location into world pixels at `zoom`. Latitudes beyond the Mercator limit are pinned.
pub(crate) fn project(loc: Location, zoom: f64) -> Point {
    let ws = world_size(zoom);
    let lat = loc.lat().clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = (loc.lng() + 180.0) / 360.0 * ws;
    let lat_rad = lat.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * ws;
    Point::new(x, y)
}

/// Inverse of [`project`], wrapping longitude into `[-180, 180)`.
pub(crate) fn unproject(p: Point, zoom: f64) -> Location {
    let ws = world_size(zoom);
    let lng = (p.x / ws * 360.0 - 180.0 + 180.0).rem_euclid(360.0) - 180.0;
    let n = PI * (1.0 - 2.0 * p.y / ws);
    let lat = n.sinh().atan().to_degrees();
    Location::clamped(lat, lng)
}
