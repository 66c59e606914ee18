//! Built-in XYZ raster tile engine.
//!
//! Tiles are fetched on the tokio runtime in background tasks and land in a shared store; the
//! map composites whatever is loaded when asked to rasterize. Nothing here blocks on the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context as _;
use resvg::tiny_skia::{FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::assets::svg_raster::{SvgRasterizer, alloc_scaled, escape_xml};
use crate::engine::api::{
    ClickHandler, LayerId, MapOptions, TileEngine, TileEngineLibrary, TileLayerOptions,
};
use crate::engine::mercator::{self, TILE_SIZE};
use crate::engine::surface_handle::SurfaceHandle;
use crate::engine::template::{self, TileCoord};
use crate::foundation::core::{Location, Point, Size};
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::net::TileSource;

const MAX_TILE_ZOOM: u32 = 22;
const MAX_VISIBLE_TILES: usize = 1024;
const STORE_SOFT_LIMIT: usize = 512;
const FADE_IN: Duration = Duration::from_millis(250);

/// Factory for [`SlippyMap`] instances sharing one tile source and runtime.
pub struct SlippyLibrary {
    source: Arc<dyn TileSource>,
    runtime: Handle,
    svg: SvgRasterizer,
    loaded: AtomicBool,
}

impl SlippyLibrary {
    /// Create a loaded library. Tile fetches are spawned on `runtime`.
    pub fn new(
        source: Arc<dyn TileSource>,
        runtime: Handle,
        fontdb: Arc<usvg::fontdb::Database>,
    ) -> Self {
        Self {
            source,
            runtime,
            svg: SvgRasterizer::new(fontdb),
            loaded: AtomicBool::new(true),
        }
    }

    /// Mark the library available or unavailable for new and existing maps.
    pub fn set_loaded(&self, loaded: bool) {
        self.loaded.store(loaded, Ordering::Release);
    }
}

impl std::fmt::Debug for SlippyLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlippyLibrary")
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl TileEngineLibrary for SlippyLibrary {
    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    fn create_map(
        &self,
        surface: &SurfaceHandle,
        opts: MapOptions,
    ) -> CityPaperResult<Box<dyn TileEngine>> {
        if !surface.is_attached() {
            return Err(CityPaperError::attach_failed(format!(
                "surface {} is detached",
                surface.id()
            )));
        }
        if !surface.has_area() {
            return Err(CityPaperError::attach_failed(format!(
                "surface {} has no drawable area",
                surface.id()
            )));
        }
        debug!(surface = surface.id(), ?opts, "creating slippy map");
        Ok(Box::new(SlippyMap {
            surface: surface.clone(),
            size: surface.size(),
            center: opts.center,
            zoom: opts.zoom,
            options: opts,
            layers: Vec::new(),
            next_layer: 1,
            tiles: Arc::new(Mutex::new(HashMap::new())),
            inflight: Vec::new(),
            source: Arc::clone(&self.source),
            runtime: self.runtime.clone(),
            svg: self.svg.clone(),
            click: None,
            destroyed: false,
        }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TileKey {
    layer: LayerId,
    tile: TileCoord,
}

enum TileState {
    Pending,
    Ready { image: Pixmap, arrived: Instant },
    Failed,
}

type TileStore = Arc<Mutex<HashMap<TileKey, TileState>>>;

fn lock(store: &Mutex<HashMap<TileKey, TileState>>) -> MutexGuard<'_, HashMap<TileKey, TileState>> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Layer {
    id: LayerId,
    opts: TileLayerOptions,
}

#[derive(Clone, Copy, Debug)]
struct ViewGeometry {
    tile_zoom: u32,
    // Screen pixels per tile-zoom world pixel.
    scale: f64,
    // World pixel (at tile_zoom) under the surface's top-left corner.
    origin: Point,
}

struct VisibleTile {
    coord: TileCoord,
    screen: Point,
}

/// Map instance produced by [`SlippyLibrary`].
pub struct SlippyMap {
    surface: SurfaceHandle,
    options: MapOptions,
    size: Size,
    center: Location,
    zoom: f64,
    layers: Vec<Layer>,
    next_layer: u64,
    tiles: TileStore,
    inflight: Vec<(LayerId, AbortHandle)>,
    source: Arc<dyn TileSource>,
    runtime: Handle,
    svg: SvgRasterizer,
    click: Option<ClickHandler>,
    destroyed: bool,
}

impl SlippyMap {
    fn geometry(&self) -> ViewGeometry {
        let tile_zoom = self.zoom.round().clamp(0.0, f64::from(MAX_TILE_ZOOM)) as u32;
        let scale = 2f64.powf(self.zoom - f64::from(tile_zoom));
        let c = mercator::project(self.center, f64::from(tile_zoom));
        ViewGeometry {
            tile_zoom,
            scale,
            origin: Point::new(
                c.x - self.size.width / 2.0 / scale,
                c.y - self.size.height / 2.0 / scale,
            ),
        }
    }

    fn visible_tiles(&self, g: ViewGeometry) -> Vec<VisibleTile> {
        if self.size.width < 1.0 || self.size.height < 1.0 {
            return Vec::new();
        }
        let n = 1i64 << g.tile_zoom;
        let span_x = self.size.width / g.scale;
        let span_y = self.size.height / g.scale;
        let x0 = (g.origin.x / TILE_SIZE).floor() as i64;
        let x1 = ((g.origin.x + span_x) / TILE_SIZE).ceil() as i64 - 1;
        let y0 = ((g.origin.y / TILE_SIZE).floor() as i64).max(0);
        let y1 = (((g.origin.y + span_y) / TILE_SIZE).ceil() as i64 - 1).min(n - 1);

        let mut out = Vec::new();
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                if out.len() >= MAX_VISIBLE_TILES {
                    return out;
                }
                out.push(VisibleTile {
                    coord: TileCoord {
                        z: g.tile_zoom,
                        x: tx.rem_euclid(n) as u32,
                        y: ty as u32,
                    },
                    screen: Point::new(
                        (tx as f64 * TILE_SIZE - g.origin.x) * g.scale,
                        (ty as f64 * TILE_SIZE - g.origin.y) * g.scale,
                    ),
                });
            }
        }
        out
    }

    fn request_visible(&mut self) {
        if self.destroyed || self.layers.is_empty() {
            return;
        }
        self.inflight.retain(|(_, h)| !h.is_finished());

        let visible = self.visible_tiles(self.geometry());
        let mut store = lock(&self.tiles);
        if store.len() > STORE_SOFT_LIMIT {
            let keep: Vec<TileCoord> = visible.iter().map(|v| v.coord).collect();
            store.retain(|k, _| keep.contains(&k.tile));
        }

        for layer in &self.layers {
            for v in &visible {
                let key = TileKey {
                    layer: layer.id,
                    tile: v.coord,
                };
                // Failed tiles are fetched again on the next view or resize.
                if matches!(
                    store.get(&key),
                    Some(TileState::Pending | TileState::Ready { .. })
                ) {
                    continue;
                }
                store.insert(key, TileState::Pending);

                let url = template::expand(&layer.opts.url_template, v.coord, layer.opts.retina);
                let source = Arc::clone(&self.source);
                let tiles = Arc::clone(&self.tiles);
                let task = self.runtime.spawn(async move {
                    let result = match source.fetch(&url).await {
                        Ok(bytes) => decode_tile(&bytes),
                        Err(e) => Err(e),
                    };
                    let mut store = lock(&tiles);
                    let Some(slot) = store.get_mut(&key) else {
                        trace!(%url, "discarding tile for a removed layer");
                        return;
                    };
                    *slot = match result {
                        Ok(image) => {
                            trace!(%url, "tile loaded");
                            TileState::Ready {
                                image,
                                arrived: Instant::now(),
                            }
                        }
                        Err(e) => {
                            debug!(%url, error = %e, "tile failed");
                            TileState::Failed
                        }
                    };
                });
                self.inflight.push((layer.id, task.abort_handle()));
            }
        }
    }

    fn draw_controls(&self, out: &mut Pixmap, pixel_ratio: f64) {
        let Size { width, height } = self.size;
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        if self.options.zoom_control {
            svg.push_str(
                r#"<g><rect x="10" y="10" width="30" height="60" rx="4" fill="white" stroke="black" stroke-opacity="0.2"/><path d="M17 25h16M25 17v16M17 55h16" stroke="black" stroke-width="2"/></g>"#,
            );
        }
        if self.options.attribution_control {
            let text = self
                .layers
                .iter()
                .map(|l| l.opts.attribution.as_str())
                .filter(|a| !a.is_empty())
                .collect::<Vec<_>>()
                .join(" | ");
            svg.push_str(&format!(
                r#"<rect x="{x}" y="{y}" width="{w}" height="14" fill="white" fill-opacity="0.7"/><text x="{tx}" y="{ty}" font-family="sans-serif" font-size="9" text-anchor="end" fill="black">{}</text>"#,
                escape_xml(&text),
                x = width * 0.4,
                y = height - 14.0,
                w = width * 0.6,
                tx = width - 4.0,
                ty = height - 4.0,
            ));
        }
        svg.push_str("</svg>");
        if let Err(e) = self.svg.draw(out, &svg, pixel_ratio) {
            debug!(error = %e, "skipping map controls");
        }
    }
}

fn decode_tile(bytes: &[u8]) -> CityPaperResult<Pixmap> {
    let img = image::load_from_memory(bytes)
        .context("decode tile image")?
        .to_rgba8();
    let (w, h) = img.dimensions();
    let mut data = img.into_raw();
    premultiply_rgba8_in_place(&mut data);
    let size = IntSize::from_wh(w, h)
        .ok_or_else(|| CityPaperError::validation(format!("tile has invalid size {w}x{h}")))?;
    Pixmap::from_vec(data, size)
        .ok_or_else(|| CityPaperError::validation("tile buffer does not match its size"))
}

impl TileEngine for SlippyMap {
    fn options(&self) -> &MapOptions {
        &self.options
    }

    fn set_view(&mut self, center: Location, zoom: f64) {
        if self.destroyed {
            return;
        }
        self.center = center;
        if zoom.is_finite() {
            self.zoom = zoom;
        }
        self.request_visible();
    }

    fn center(&self) -> Location {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn add_tile_layer(&mut self, opts: TileLayerOptions) -> CityPaperResult<LayerId> {
        if self.destroyed {
            return Err(CityPaperError::engine_unavailable("map was destroyed"));
        }
        template::validate(&opts.url_template)?;
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        debug!(layer = id.0, template = %opts.url_template, "tile layer added");
        self.layers.push(Layer { id, opts });
        self.request_visible();
        Ok(id)
    }

    fn remove_layer(&mut self, id: LayerId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() == before {
            return false;
        }
        self.inflight.retain(|(layer, h)| {
            if *layer == id {
                h.abort();
                false
            } else {
                true
            }
        });
        lock(&self.tiles).retain(|k, _| k.layer != id);
        debug!(layer = id.0, "tile layer removed");
        true
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn on_click(&mut self, handler: ClickHandler) {
        self.click = Some(handler);
    }

    fn click(&mut self, at: Point) -> Option<Location> {
        if self.destroyed {
            return None;
        }
        let g = self.geometry();
        let world = Point::new(g.origin.x + at.x / g.scale, g.origin.y + at.y / g.scale);
        let loc = mercator::unproject(world, f64::from(g.tile_zoom));
        if let Some(handler) = self.click.as_mut() {
            handler(loc);
        }
        Some(loc)
    }

    fn invalidate_size(&mut self) {
        let size = self.surface.size();
        if size != self.size {
            debug!(from = ?self.size, to = ?size, "map size invalidated");
            self.size = size;
            self.request_visible();
        }
    }

    fn size(&self) -> Size {
        self.size
    }

    fn pending_tiles(&self) -> usize {
        let visible = self.visible_tiles(self.geometry());
        let store = lock(&self.tiles);
        self.layers
            .iter()
            .flat_map(|l| visible.iter().map(move |v| TileKey { layer: l.id, tile: v.coord }))
            .filter(|k| matches!(store.get(k), Some(TileState::Pending)))
            .count()
    }

    fn rasterize(&self, pixel_ratio: f64) -> CityPaperResult<Pixmap> {
        if self.destroyed {
            return Err(CityPaperError::engine_unavailable("map was destroyed"));
        }
        let mut out = alloc_scaled(self.size.width, self.size.height, pixel_ratio)?;
        let visible = self.visible_tiles(self.geometry());
        let g = self.geometry();
        let now = Instant::now();

        {
            let store = lock(&self.tiles);
            for layer in &self.layers {
                for v in &visible {
                    let key = TileKey {
                        layer: layer.id,
                        tile: v.coord,
                    };
                    let Some(TileState::Ready { image, arrived }) = store.get(&key) else {
                        continue;
                    };
                    if layer.opts.cross_origin.is_none() {
                        return Err(CityPaperError::Other(anyhow::anyhow!(
                            "tile layer {} was loaded without cross-origin access; raster is tainted",
                            layer.id.0
                        )));
                    }
                    let opacity = if self.options.animate {
                        (now.saturating_duration_since(*arrived).as_secs_f32()
                            / FADE_IN.as_secs_f32())
                        .min(1.0)
                    } else {
                        1.0
                    };
                    let s = (g.scale * pixel_ratio * TILE_SIZE / f64::from(image.width())) as f32;
                    let paint = PixmapPaint {
                        opacity,
                        quality: FilterQuality::Bilinear,
                        ..PixmapPaint::default()
                    };
                    out.draw_pixmap(
                        0,
                        0,
                        image.as_ref(),
                        &paint,
                        Transform::from_row(
                            s,
                            0.0,
                            0.0,
                            s,
                            (v.screen.x * pixel_ratio) as f32,
                            (v.screen.y * pixel_ratio) as f32,
                        ),
                        None,
                    );
                }
            }
        }

        if self.options.zoom_control || self.options.attribution_control {
            self.draw_controls(&mut out, pixel_ratio);
        }
        Ok(out)
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        for (_, h) in self.inflight.drain(..) {
            h.abort();
        }
        self.layers.clear();
        self.click = None;
        lock(&self.tiles).clear();
        self.destroyed = true;
        debug!(surface = self.surface.id(), "slippy map destroyed");
    }
}

impl Drop for SlippyMap {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/slippy.rs"]
mod tests;
