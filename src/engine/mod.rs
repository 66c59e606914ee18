/// Adapter owning one engine per surface.
pub(crate) mod adapter;
/// Tile engine contract.
pub mod api;
pub(crate) mod mercator;
/// Built-in XYZ raster engine.
pub mod slippy;
/// Host box an engine binds to.
pub mod surface_handle;
pub(crate) mod template;

#[cfg(test)]
#[path = "../../tests/unit/engine/mock.rs"]
pub(crate) mod mock;
