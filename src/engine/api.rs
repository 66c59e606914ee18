use resvg::tiny_skia::Pixmap;

use crate::engine::surface_handle::SurfaceHandle;
use crate::foundation::core::{DEFAULT_ZOOM, Location, Point, Size};
use crate::foundation::error::CityPaperResult;

/// Identifier of a tile layer inside one engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

/// Cross-origin mode declared by a tile layer.
///
/// Tiles loaded without a cross-origin declaration taint the raster and cannot be captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossOrigin {
    /// Load without credentials; pixels stay readable.
    Anonymous,
    /// Load with credentials; pixels stay readable.
    UseCredentials,
}

/// Options for constructing a map on a surface.
#[derive(Clone, Debug, PartialEq)]
pub struct MapOptions {
    /// Initial center.
    pub center: Location,
    /// Initial zoom.
    pub zoom: f64,
    /// Draw the built-in zoom buttons.
    pub zoom_control: bool,
    /// Draw the built-in attribution strip.
    pub attribution_control: bool,
    /// Fade tiles in and animate view changes.
    pub animate: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center: Location::clamped(0.0, 0.0),
            zoom: DEFAULT_ZOOM,
            zoom_control: true,
            attribution_control: true,
            animate: true,
        }
    }
}

/// Options for one XYZ raster tile layer.
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayerOptions {
    /// URL template with `{s}`, `{z}`, `{x}`, `{y}` and optional `{r}`.
    pub url_template: String,
    /// Attribution text.
    pub attribution: String,
    /// Cross-origin declaration. `None` taints the raster.
    pub cross_origin: Option<CrossOrigin>,
    /// Request `@2x` tiles where the template supports it.
    pub retina: bool,
}

/// Callback receiving the geographic point of a click.
pub type ClickHandler = Box<dyn FnMut(Location) + Send>;

/// One live map bound to a surface handle.
///
/// Mirrors the minimal contract the render surface needs from a tile engine. The engine caches the
/// surface size and only re-reads it on [`TileEngine::invalidate_size`].
pub trait TileEngine: Send {
    /// Options the map was created with.
    fn options(&self) -> &MapOptions;

    /// Move the view. Never fails; the engine projects whatever it is given.
    fn set_view(&mut self, center: Location, zoom: f64);

    /// Current center.
    fn center(&self) -> Location;

    /// Current zoom.
    fn zoom(&self) -> f64;

    /// Add a tile layer on top of the existing ones.
    fn add_tile_layer(&mut self, opts: TileLayerOptions) -> CityPaperResult<LayerId>;

    /// Remove a layer and drop its tiles. Returns `false` if the id was unknown.
    fn remove_layer(&mut self, id: LayerId) -> bool;

    /// Number of attached tile layers.
    fn layer_count(&self) -> usize;

    /// Register the click handler, replacing any previous one.
    fn on_click(&mut self, handler: ClickHandler);

    /// Dispatch a click at surface-local logical coordinates.
    fn click(&mut self, at: Point) -> Option<Location>;

    /// Re-read the size of the bound surface.
    fn invalidate_size(&mut self);

    /// Size the engine currently lays tiles out for.
    fn size(&self) -> Size;

    /// Number of visible tiles still loading.
    fn pending_tiles(&self) -> usize;

    /// Composite the loaded tiles at `pixel_ratio` device pixels per logical unit.
    fn rasterize(&self, pixel_ratio: f64) -> CityPaperResult<Pixmap>;

    /// Release layers, handlers and in-flight loads. Further calls are no-ops.
    fn destroy(&mut self);
}

/// Factory side of a tile engine, possibly loaded asynchronously.
pub trait TileEngineLibrary: Send + Sync {
    /// Whether maps can be created right now.
    fn is_loaded(&self) -> bool;

    /// Construct a map bound to `surface`.
    fn create_map(
        &self,
        surface: &SurfaceHandle,
        opts: MapOptions,
    ) -> CityPaperResult<Box<dyn TileEngine>>;
}
