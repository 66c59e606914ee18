pub mod color;
pub(crate) mod fonts;
pub(crate) mod svg_raster;
