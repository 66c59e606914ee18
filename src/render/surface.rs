use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use resvg::tiny_skia::{self, Pixmap, PixmapPaint, Transform};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::assets::color::Color;
use crate::assets::svg_raster::{SvgRasterizer, alloc_scaled};
use crate::engine::adapter::{PickCallback, TileEngineAdapter};
use crate::engine::api::TileEngineLibrary;
use crate::engine::surface_handle::SurfaceHandle;
use crate::foundation::core::{DEFAULT_ZOOM, Location, Point, Size, ViewportSpec};
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::foundation::math::{round_corners_premul, tone_filter_premul};
use crate::foundation::ready::ReadyPolicy;
use crate::render::backend::{ComposeMode, FrameRGBA};
use crate::render::overlay::overlay_svg;
use crate::scene::model::{PlaceLabel, StyleSpec};
use crate::scene::presets::default_place;

const MAP_GRAYSCALE: f32 = 0.2;
const MAP_CONTRAST: f32 = 1.1;
const BEZEL_COLOR: Color = Color::rgb(0x11, 0x11, 0x11);

/// Geometry and engine options for a [`RenderSurface`].
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceOpts {
    /// Logical width of the capture target. Height follows the aspect ratio.
    pub logical_width: f64,
    /// Outer corner radius of the on-screen frame.
    pub corner_radius: f64,
    /// Device bezel thickness around the capture target in previews.
    pub bezel: f64,
    /// Engine readiness polling.
    pub ready: ReadyPolicy,
    /// Request `@2x` tiles.
    pub retina_tiles: bool,
}

impl Default for SurfaceOpts {
    fn default() -> Self {
        Self {
            logical_width: 340.0,
            corner_radius: 40.0,
            bezel: 8.0,
            ready: ReadyPolicy::default(),
            retina_tiles: false,
        }
    }
}

#[derive(Clone, Debug)]
struct Scene {
    location: Location,
    style: StyleSpec,
    viewport: ViewportSpec,
    label: PlaceLabel,
    show_labels: bool,
}

#[derive(Clone, Debug)]
enum Failure {
    Unavailable(String),
    Attach(String),
}

impl Failure {
    fn to_error(&self) -> CityPaperError {
        match self {
            Self::Unavailable(m) => CityPaperError::engine_unavailable(m.clone()),
            Self::Attach(m) => CityPaperError::attach_failed(m.clone()),
        }
    }
}

/// The visual target that is both previewed and captured.
///
/// Owns its engine adapter exclusively. Composition order, back to front: background fill, map
/// tiles (tone-filtered), vignette and dot grid, label block, then device chrome in previews
/// only. A lifecycle failure puts the surface into a persistent failed state until
/// [`RenderSurface::remount`].
pub struct RenderSurface {
    handle: SurfaceHandle,
    library: Arc<dyn TileEngineLibrary>,
    adapter: TileEngineAdapter,
    opts: SurfaceOpts,
    svg: SvgRasterizer,
    scene: Option<Scene>,
    failure: Option<Failure>,
    last_mutation: Instant,
    pick: Option<PickCallback>,
}

impl RenderSurface {
    /// Create a surface and bind a fresh engine to `handle`.
    ///
    /// Waits for the engine library within `opts.ready`. Fails with `EngineUnavailable` or
    /// `AttachFailed`; the handle must have a drawable area.
    #[tracing::instrument(skip_all, fields(surface = handle.id()))]
    pub async fn mount(
        handle: SurfaceHandle,
        library: Arc<dyn TileEngineLibrary>,
        opts: SurfaceOpts,
        fontdb: Arc<usvg::fontdb::Database>,
    ) -> CityPaperResult<Self> {
        let adapter = TileEngineAdapter::new(Arc::clone(&library), opts.ready, opts.retina_tiles);
        let mut surface = Self {
            handle,
            library,
            adapter,
            opts,
            svg: SvgRasterizer::new(fontdb),
            scene: None,
            failure: None,
            last_mutation: Instant::now(),
            pick: None,
        };
        surface.bind().await?;
        Ok(surface)
    }

    async fn bind(&mut self) -> CityPaperResult<()> {
        let result = async {
            self.adapter.ensure_ready().await?;
            let (center, zoom) = match &self.scene {
                Some(s) => (s.location, s.viewport.zoom_level),
                None => (default_place().location, DEFAULT_ZOOM),
            };
            self.adapter.attach(&self.handle, center, zoom)
        }
        .await;
        self.guard(result)?;
        if let Some(pick) = &self.pick {
            self.adapter.on_location_picked(Arc::clone(pick));
        }
        self.last_mutation = Instant::now();
        Ok(())
    }

    /// Tear down the engine and bind a new one, clearing a failed state.
    ///
    /// The last rendered scene is re-applied to the new engine.
    pub async fn remount(&mut self) -> CityPaperResult<()> {
        self.adapter.detach();
        self.adapter = TileEngineAdapter::new(
            Arc::clone(&self.library),
            self.opts.ready,
            self.opts.retina_tiles,
        );
        self.failure = None;
        info!(surface = self.handle.id(), "remounting surface");
        self.bind().await?;
        if let Some(scene) = self.scene.take() {
            self.render(
                scene.location,
                &scene.style,
                scene.viewport,
                &scene.label,
                scene.show_labels,
            )?;
        }
        Ok(())
    }

    fn guard<T>(&mut self, result: CityPaperResult<T>) -> CityPaperResult<T> {
        if let Err(e) = &result {
            let failure = match e {
                CityPaperError::EngineUnavailable(m) => Some(Failure::Unavailable(m.clone())),
                CityPaperError::AttachFailed(m) => Some(Failure::Attach(m.clone())),
                _ => None,
            };
            if let Some(f) = failure {
                error!(surface = self.handle.id(), error = %e, "surface failed");
                self.adapter.detach();
                self.failure = Some(f);
            }
        }
        result
    }

    fn check_live(&self) -> CityPaperResult<()> {
        match &self.failure {
            Some(f) => Err(f.to_error()),
            None => Ok(()),
        }
    }

    /// Reconcile the engine with new inputs: geometry, then style, then view.
    #[tracing::instrument(skip(self, style, label), fields(style = style.id.as_str()))]
    pub fn render(
        &mut self,
        location: Location,
        style: &StyleSpec,
        viewport: ViewportSpec,
        label: &PlaceLabel,
        show_labels: bool,
    ) -> CityPaperResult<()> {
        self.check_live()?;
        self.handle
            .resize(viewport.aspect_ratio.logical_size(self.opts.logical_width));

        let result = self
            .adapter
            .set_style(style)
            .and_then(|()| self.adapter.set_view(location, viewport.zoom_level));
        self.guard(result)?;

        self.scene = Some(Scene {
            location,
            style: style.clone(),
            viewport,
            label: label.clone(),
            show_labels,
        });
        self.last_mutation = Instant::now();
        debug!(
            lat = location.lat(),
            lng = location.lng(),
            zoom = viewport.effective_zoom(),
            "surface rendered"
        );
        Ok(())
    }

    /// Replace only the label; the engine is untouched.
    pub fn set_label(&mut self, label: &PlaceLabel) {
        if let Some(scene) = self.scene.as_mut() {
            scene.label = label.clone();
        }
    }

    /// Register the single location-picked callback, replacing any previous one.
    pub fn on_location_picked<F>(&mut self, callback: F)
    where
        F: Fn(Location) + Send + Sync + 'static,
    {
        let cb: PickCallback = Arc::new(callback);
        self.adapter.on_location_picked(Arc::clone(&cb));
        self.pick = Some(cb);
    }

    /// Simulate a click at surface-local logical coordinates.
    pub fn pick_location(&mut self, at: Point) -> CityPaperResult<Option<Location>> {
        self.check_live()?;
        let result = self.adapter.click(at);
        self.guard(result)
    }

    /// Re-read the host box size. Resizes are also picked up automatically.
    pub fn notify_resized(&mut self) -> CityPaperResult<()> {
        self.check_live()?;
        let result = self.adapter.notify_resized();
        self.guard(result)
    }

    /// Forward a host box resize the engine has not seen yet.
    ///
    /// A forwarded resize counts as a mutation, so the settle delay restarts.
    pub fn sync_size(&mut self) -> CityPaperResult<bool> {
        self.check_live()?;
        let result = self.adapter.sync_size();
        let resized = self.guard(result)?;
        if resized {
            self.last_mutation = Instant::now();
        }
        Ok(resized)
    }

    /// Compose the current scene at `pixel_ratio`.
    pub fn compose(&mut self, pixel_ratio: f64, mode: ComposeMode) -> CityPaperResult<FrameRGBA> {
        self.check_live()?;
        let scene = self
            .scene
            .clone()
            .ok_or_else(|| CityPaperError::validation("nothing has been rendered yet"))?;
        let size = self.handle.size();

        let map = self.adapter.rasterize(pixel_ratio);
        let mut map = self.guard(map)?;
        let map_w = map.width();
        tone_filter_premul(map.data_mut(), map_w, MAP_GRAYSCALE, MAP_CONTRAST);

        let mut canvas = alloc_scaled(size.width, size.height, pixel_ratio)?;
        canvas.fill(to_skia(scene.style.background_color));
        draw_over(&mut canvas, &map, 0.0, 0.0);

        let svg = overlay_svg(
            size,
            &scene.style,
            &scene.label,
            scene.location,
            scene.show_labels,
        );
        self.svg.draw(&mut canvas, &svg, pixel_ratio)?;

        match mode {
            ComposeMode::Capture => Ok(FrameRGBA::from_pixmap(canvas)),
            ComposeMode::Preview => self.frame_preview(canvas, size, pixel_ratio),
        }
    }

    fn frame_preview(
        &self,
        mut inner: Pixmap,
        size: Size,
        pixel_ratio: f64,
    ) -> CityPaperResult<FrameRGBA> {
        let bezel = self.opts.bezel.max(0.0);
        let inner_radius = ((self.opts.corner_radius - bezel).max(0.0) * pixel_ratio) as f32;
        let (w, h) = (inner.width(), inner.height());
        round_corners_premul(inner.data_mut(), w, h, inner_radius);

        let mut frame = alloc_scaled(size.width + 2.0 * bezel, size.height + 2.0 * bezel, pixel_ratio)?;
        frame.fill(to_skia(BEZEL_COLOR));
        let (fw, fh) = (frame.width(), frame.height());
        round_corners_premul(
            frame.data_mut(),
            fw,
            fh,
            (self.opts.corner_radius.max(0.0) * pixel_ratio) as f32,
        );
        let offset = (bezel * pixel_ratio) as f32;
        draw_over(&mut frame, &inner, offset, offset);
        Ok(FrameRGBA::from_pixmap(frame))
    }

    /// Logical size of the capture target.
    pub fn capture_size(&self) -> Size {
        self.handle.size()
    }

    /// Time since the last state mutation.
    pub fn since_last_mutation(&self) -> Duration {
        self.last_mutation.elapsed()
    }

    /// Visible tiles still loading.
    pub fn pending_tiles(&self) -> usize {
        self.adapter.pending_tiles()
    }

    /// Attached tile layers.
    pub fn layer_count(&self) -> usize {
        self.adapter.layer_count()
    }

    /// Engine center, if an engine is bound.
    pub fn center(&self) -> Option<Location> {
        self.adapter.center()
    }

    /// Engine zoom, if an engine is bound.
    pub fn zoom(&self) -> Option<f64> {
        self.adapter.zoom()
    }

    /// Label of the last rendered scene.
    pub fn label(&self) -> Option<&PlaceLabel> {
        self.scene.as_ref().map(|s| &s.label)
    }

    /// Style of the last rendered scene.
    pub fn style(&self) -> Option<&StyleSpec> {
        self.scene.as_ref().map(|s| &s.style)
    }

    /// Viewport of the last rendered scene.
    pub fn viewport(&self) -> Option<ViewportSpec> {
        self.scene.as_ref().map(|s| s.viewport)
    }

    /// The persistent lifecycle error, if the surface has failed.
    pub fn failure(&self) -> Option<CityPaperError> {
        self.failure.as_ref().map(Failure::to_error)
    }

    /// Handle of the host box.
    pub fn handle(&self) -> &SurfaceHandle {
        &self.handle
    }

    /// Destroy the engine. The surface fails with `AttachFailed` afterwards.
    pub fn unmount(&mut self) {
        self.adapter.detach();
        self.failure = Some(Failure::Attach("surface was unmounted".to_owned()));
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSurface")
            .field("surface", &self.handle.id())
            .field("size", &self.handle.size())
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

fn to_skia(c: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn draw_over(dst: &mut Pixmap, src: &Pixmap, x: f32, y: f32) {
    dst.draw_pixmap(
        0,
        0,
        src.as_ref(),
        &PixmapPaint::default(),
        Transform::from_translate(x, y),
        None,
    );
}

/// A surface shared between tasks, with a single-export guard.
///
/// Mutations go through [`SharedSurface::lock`]. Exports claim the surface with
/// [`SharedSurface::try_begin_export`]; a second claim while one is held is rejected.
#[derive(Clone, Debug)]
pub struct SharedSurface {
    inner: Arc<tokio::sync::Mutex<RenderSurface>>,
    exporting: Arc<AtomicBool>,
}

impl SharedSurface {
    /// Wrap a mounted surface.
    pub fn new(surface: RenderSurface) -> Self {
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(surface)),
            exporting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Lock the surface for mutation or composition.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, RenderSurface> {
        self.inner.lock().await
    }

    /// Claim the surface for one export. Fails with `ExportInProgress` while another is active.
    pub fn try_begin_export(&self) -> CityPaperResult<ExportGuard> {
        self.exporting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CityPaperError::ExportInProgress)?;
        Ok(ExportGuard {
            flag: Arc::clone(&self.exporting),
        })
    }

    /// Whether an export currently holds the surface.
    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::Acquire)
    }
}

/// Releases the export claim on drop.
#[derive(Debug)]
pub struct ExportGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
