//! CityPaper renders styled, labeled city map wallpapers and exports them as PNG.
//!
//! A [`RenderSurface`] owns one tile engine bound to a [`SurfaceHandle`] and composes map tiles,
//! a vignette and a label block. [`CapturePipeline`] turns the surface into files:
//!
//! - Mount a surface over a [`TileEngineLibrary`] (the built-in one is [`SlippyLibrary`])
//! - [`RenderSurface::render`] a location, style, viewport and label
//! - Export one PNG or a sequential batch into an [`ArtifactSink`]
//!
//! Place names come from [`AdminNameResolver`], which reverse-geocodes a location and picks a
//! province, city or district name from inconsistent address fields.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

pub mod capture;
pub mod config;
/// Tile engine contract and the built-in raster engine.
pub mod engine;
pub mod geocode;
/// Async HTTP.
pub mod net;
/// Surface composition.
pub mod render;
pub mod scene;

pub use crate::assets::color::Color;
pub use crate::assets::fonts::build_overlay_fontdb;
pub use crate::foundation::core::{
    AspectRatioId, DEFAULT_ZOOM, Location, MAX_ZOOM, MIN_ZOOM, Point, Rect, Size, ViewportSpec,
    clamp_zoom,
};
pub use crate::foundation::error::{BoxedSource, CityPaperError, CityPaperResult};
pub use crate::foundation::ready::{MAX_READY_WAIT, ReadyPolicy, wait_until_ready};

pub use crate::capture::batch::{BatchEntry, BatchFile};
pub use crate::capture::pipeline::{
    BatchItem, BatchProgress, BatchReport, BatchScene, CaptureOpts, CapturePipeline, ItemOutcome,
    ItemReport,
};
pub use crate::capture::sink::{ArtifactSink, DirectorySink, InMemoryArtifactSink};
pub use crate::config::CityPaperConfig;
pub use crate::engine::api::{
    ClickHandler, CrossOrigin, LayerId, MapOptions, TileEngine, TileEngineLibrary,
    TileLayerOptions,
};
pub use crate::engine::slippy::{SlippyLibrary, SlippyMap};
pub use crate::engine::surface_handle::SurfaceHandle;
pub use crate::geocode::address::{AddressFields, FALLBACK_NAME, Granularity, pick_admin_name};
pub use crate::geocode::nominatim::{NominatimGeocoder, ReverseGeocoder};
pub use crate::geocode::resolver::{AdminNameResolver, LabelSlot, Ticket};
pub use crate::net::{BoxFuture, HttpClient, TileSource};
pub use crate::render::backend::{ComposeMode, FrameRGBA};
pub use crate::render::surface::{ExportGuard, RenderSurface, SharedSurface, SurfaceOpts};
pub use crate::scene::model::{PlaceLabel, RESOLVING_NAME, StyleId, StyleSpec, style_catalog};
pub use crate::scene::params::WallpaperParams;
pub use crate::scene::presets::{Preset, default_place, presets};
pub use crate::scene::search::{PlaceResult, PlaceSearch, PresetSearch};
