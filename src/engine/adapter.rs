use std::sync::Arc;

use resvg::tiny_skia::Pixmap;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::engine::api::{
    CrossOrigin, LayerId, MapOptions, TileEngine, TileEngineLibrary, TileLayerOptions,
};
use crate::engine::surface_handle::SurfaceHandle;
use crate::foundation::core::{Location, Point, Size, clamp_zoom};
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::foundation::ready::{ReadyPolicy, wait_until_ready};
use crate::scene::model::{StyleId, StyleSpec};

/// Callback for location picks. Shared so it can be re-registered on a fresh engine.
pub type PickCallback = Arc<dyn Fn(Location) + Send + Sync>;

/// Owns exactly one engine instance bound to one surface handle.
///
/// The engine is created on [`TileEngineAdapter::attach`] and destroyed on
/// [`TileEngineAdapter::detach`] or drop. Size changes of the bound surface are observed through
/// its watch channel and forwarded to the engine before every operation.
pub(crate) struct TileEngineAdapter {
    library: Arc<dyn TileEngineLibrary>,
    policy: ReadyPolicy,
    retina_tiles: bool,
    bound: Option<Bound>,
    pick: Option<PickCallback>,
}

struct Bound {
    surface: SurfaceHandle,
    size_rx: watch::Receiver<Size>,
    engine: Box<dyn TileEngine>,
    active: Option<(StyleId, LayerId)>,
}

impl TileEngineAdapter {
    pub(crate) fn new(
        library: Arc<dyn TileEngineLibrary>,
        policy: ReadyPolicy,
        retina_tiles: bool,
    ) -> Self {
        Self {
            library,
            policy,
            retina_tiles,
            bound: None,
            pick: None,
        }
    }

    /// Wait for the engine library within the readiness bound.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn ensure_ready(&self) -> CityPaperResult<()> {
        let library = Arc::clone(&self.library);
        wait_until_ready("tile engine library", self.policy, move || {
            library.is_loaded()
        })
        .await
        .map(|_| ())
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.bound.is_some()
    }

    /// Bind an engine to `surface`. A second call for the same surface is a no-op.
    pub(crate) fn attach(
        &mut self,
        surface: &SurfaceHandle,
        center: Location,
        zoom: f64,
    ) -> CityPaperResult<()> {
        if let Some(bound) = &self.bound {
            if bound.surface.id() == surface.id() {
                return Ok(());
            }
            return Err(CityPaperError::attach_failed(format!(
                "adapter already bound to surface {}",
                bound.surface.id()
            )));
        }
        if !self.library.is_loaded() {
            return Err(CityPaperError::engine_unavailable(
                "tile engine library is not loaded",
            ));
        }
        if !surface.is_attached() || !surface.has_area() {
            return Err(CityPaperError::attach_failed(format!(
                "surface {} is detached or has no drawable area",
                surface.id()
            )));
        }

        let opts = MapOptions {
            center,
            zoom: clamp_zoom(zoom),
            zoom_control: false,
            attribution_control: false,
            animate: false,
        };
        let mut engine = self.library.create_map(surface, opts).map_err(|e| {
            if e.is_terminal_for_surface() {
                e
            } else {
                CityPaperError::attach_failed(e.to_string())
            }
        })?;
        if let Some(pick) = &self.pick {
            let pick = Arc::clone(pick);
            engine.on_click(Box::new(move |loc| pick(loc)));
        }

        let mut size_rx = surface.subscribe();
        size_rx.mark_unchanged();
        self.bound = Some(Bound {
            surface: surface.clone(),
            size_rx,
            engine,
            active: None,
        });
        info!(surface = surface.id(), "tile engine attached");
        Ok(())
    }

    fn live(&mut self) -> CityPaperResult<&mut Bound> {
        self.live_synced().map(|(bound, _)| bound)
    }

    /// Like `live`, also reporting whether a size change was forwarded to the engine.
    fn live_synced(&mut self) -> CityPaperResult<(&mut Bound, bool)> {
        if !self.library.is_loaded() {
            if let Some(mut bound) = self.bound.take() {
                error!(
                    surface = bound.surface.id(),
                    "tile engine library became unavailable; tearing down engine"
                );
                bound.engine.destroy();
            }
            return Err(CityPaperError::engine_unavailable(
                "tile engine library became unavailable",
            ));
        }
        let bound = self
            .bound
            .as_mut()
            .ok_or_else(|| CityPaperError::attach_failed("adapter is not attached"))?;
        if !bound.surface.is_attached() {
            return Err(CityPaperError::attach_failed(format!(
                "surface {} was detached",
                bound.surface.id()
            )));
        }
        if bound.size_rx.has_changed().unwrap_or(false) {
            bound.size_rx.mark_unchanged();
        }
        let size = bound.surface.size();
        let resized = size != bound.engine.size();
        if resized {
            debug!(surface = bound.surface.id(), ?size, "surface resized");
            bound.engine.invalidate_size();
        }
        Ok((bound, resized))
    }

    /// Forward a pending host size change to the engine. Returns whether one was forwarded.
    pub(crate) fn sync_size(&mut self) -> CityPaperResult<bool> {
        self.live_synced().map(|(_, resized)| resized)
    }

    /// Move the view. Out-of-range zoom is clamped.
    pub(crate) fn set_view(&mut self, location: Location, zoom: f64) -> CityPaperResult<()> {
        let bound = self.live()?;
        bound.engine.set_view(location, clamp_zoom(zoom));
        Ok(())
    }

    /// Swap the tile layer. The old layer is removed before the new one is added.
    pub(crate) fn set_style(&mut self, style: &StyleSpec) -> CityPaperResult<()> {
        let retina = self.retina_tiles;
        let bound = self.live()?;
        if matches!(bound.active, Some((id, _)) if id == style.id) {
            return Ok(());
        }
        if let Some((old_style, old_layer)) = bound.active.take() {
            bound.engine.remove_layer(old_layer);
            debug!(from = old_style.as_str(), to = style.id.as_str(), "style swap");
        }
        let layer = bound.engine.add_tile_layer(TileLayerOptions {
            url_template: style.tile_source_template.to_owned(),
            attribution: style.attribution.to_owned(),
            cross_origin: Some(CrossOrigin::Anonymous),
            retina,
        })?;
        bound.active = Some((style.id, layer));
        Ok(())
    }

    /// Register the single location-picked callback, replacing any previous one.
    pub(crate) fn on_location_picked(&mut self, callback: PickCallback) {
        if let Some(bound) = self.bound.as_mut() {
            let cb = Arc::clone(&callback);
            bound.engine.on_click(Box::new(move |loc| cb(loc)));
        }
        self.pick = Some(callback);
    }

    /// Tell the engine to re-read the surface size.
    pub(crate) fn notify_resized(&mut self) -> CityPaperResult<()> {
        let bound = self.live()?;
        bound.engine.invalidate_size();
        Ok(())
    }

    pub(crate) fn click(&mut self, at: Point) -> CityPaperResult<Option<Location>> {
        Ok(self.live()?.engine.click(at))
    }

    pub(crate) fn rasterize(&mut self, pixel_ratio: f64) -> CityPaperResult<Pixmap> {
        self.live()?.engine.rasterize(pixel_ratio)
    }

    pub(crate) fn pending_tiles(&self) -> usize {
        self.bound
            .as_ref()
            .map_or(0, |b| b.engine.pending_tiles())
    }

    pub(crate) fn layer_count(&self) -> usize {
        self.bound.as_ref().map_or(0, |b| b.engine.layer_count())
    }

    pub(crate) fn center(&self) -> Option<Location> {
        self.bound.as_ref().map(|b| b.engine.center())
    }

    pub(crate) fn zoom(&self) -> Option<f64> {
        self.bound.as_ref().map(|b| b.engine.zoom())
    }

    pub(crate) fn engine_size(&self) -> Option<Size> {
        self.bound.as_ref().map(|b| b.engine.size())
    }

    /// Destroy the engine. Safe to call repeatedly.
    pub(crate) fn detach(&mut self) {
        if let Some(mut bound) = self.bound.take() {
            bound.engine.destroy();
            info!(surface = bound.surface.id(), "tile engine detached");
        }
    }
}

impl Drop for TileEngineAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/adapter.rs"]
mod tests;
