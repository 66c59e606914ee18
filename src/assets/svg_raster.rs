use std::sync::Arc;

use anyhow::Context as _;
use resvg::tiny_skia::{Pixmap, Transform};

use crate::assets::fonts::make_overlay_font_resolver;
use crate::foundation::error::{CityPaperError, CityPaperResult};

// Avoid pathological allocations from bad sizes or ratios.
const MAX_DIM: u32 = 16_384;

/// Escape text for use inside SVG element content or attribute values.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Allocate a transparent pixmap for a logical `width` x `height` area at `scale`.
pub(crate) fn alloc_scaled(width: f64, height: f64, scale: f64) -> CityPaperResult<Pixmap> {
    fn to_px(v: f64) -> CityPaperResult<u32> {
        if !v.is_finite() || v < 1.0 {
            return Err(CityPaperError::validation(format!(
                "raster dimension {v} is not drawable"
            )));
        }
        let px = v.round() as u32;
        if px > MAX_DIM {
            return Err(CityPaperError::validation(format!(
                "raster dimension {px} exceeds {MAX_DIM}"
            )));
        }
        Ok(px)
    }

    let w = to_px(width * scale)?;
    let h = to_px(height * scale)?;
    Pixmap::new(w, h).ok_or_else(|| CityPaperError::validation("failed to allocate pixmap"))
}

/// Parses SVG markup and draws it over existing pixels.
#[derive(Clone)]
pub(crate) struct SvgRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl SvgRasterizer {
    pub(crate) fn new(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }

    /// Draw `svg` (in logical units) onto `pixmap`, scaled by `scale`.
    pub(crate) fn draw(&self, pixmap: &mut Pixmap, svg: &str, scale: f64) -> CityPaperResult<()> {
        let opts = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            font_resolver: make_overlay_font_resolver(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &opts).context("parse overlay svg")?;
        let scale = scale as f32;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
        Ok(())
    }
}

impl std::fmt::Debug for SvgRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgRasterizer")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}
