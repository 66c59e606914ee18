/// Composed frames.
pub mod backend;
pub(crate) mod overlay;
/// The render surface and its export guard.
pub mod surface;
