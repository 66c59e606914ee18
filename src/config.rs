//! Runtime configuration: JSON file plus `CITYPAPER_*` environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use tracing::debug;

use crate::capture::naming::{DEFAULT_BATCH_TEMPLATE, DEFAULT_SINGLE_TEMPLATE};
use crate::capture::pipeline::CaptureOpts;
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::foundation::ready::{MAX_READY_WAIT, ReadyPolicy};
use crate::geocode::address::FALLBACK_NAME;
use crate::geocode::nominatim::{DEFAULT_DETAIL, DEFAULT_ENDPOINT};
use crate::net::HttpClient;
use crate::render::surface::SurfaceOpts;

/// Complete configuration. Every field has a default, so `{}` is a valid file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CityPaperConfig {
    /// Tile engine and HTTP.
    pub engine: EngineConfig,
    /// Surface geometry.
    pub surface: SurfaceConfig,
    /// Export timing, quality and naming.
    pub capture: CaptureConfig,
    /// Reverse geocoding.
    pub geocode: GeocodeConfig,
}

/// `engine` section.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Readiness probe interval.
    pub poll_interval_ms: u64,
    /// Readiness bound; capped at 60 s.
    pub max_wait_ms: u64,
    /// Per-request HTTP timeout.
    pub http_timeout_ms: u64,
    /// User agent for tile and geocode requests.
    pub user_agent: String,
    /// Request `@2x` tiles where the style supports them.
    pub retina_tiles: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_wait_ms: 10_000,
            http_timeout_ms: 15_000,
            user_agent: HttpClient::DEFAULT_USER_AGENT.to_owned(),
            retina_tiles: false,
        }
    }
}

/// `surface` section.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Capture-target width in logical units.
    pub logical_width: f64,
    /// Preview corner radius.
    pub corner_radius: f64,
    /// Preview bezel thickness.
    pub bezel: f64,
    /// Extra font files for the label block.
    pub fonts_dir: Option<PathBuf>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        let opts = SurfaceOpts::default();
        Self {
            logical_width: opts.logical_width,
            corner_radius: opts.corner_radius,
            bezel: opts.bezel,
            fonts_dir: None,
        }
    }
}

/// `capture` section.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Quiet time before rasterizing.
    pub settle_ms: u64,
    /// Oversampling factor.
    pub pixel_ratio: f64,
    /// Where PNG files go.
    pub out_dir: PathBuf,
    /// Single export file name template.
    pub file_template: String,
    /// Batch item file name template.
    pub batch_template: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1500,
            pixel_ratio: 3.0,
            out_dir: PathBuf::from("out"),
            file_template: DEFAULT_SINGLE_TEMPLATE.to_owned(),
            batch_template: DEFAULT_BATCH_TEMPLATE.to_owned(),
        }
    }
}

/// `geocode` section.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocodeConfig {
    /// Nominatim-compatible reverse endpoint.
    pub endpoint: String,
    /// `accept-language` hint; empty sends none.
    pub locale: String,
    /// Address detail level.
    pub detail: u8,
    /// Name used when lookup fails.
    pub fallback_name: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            locale: "en".to_owned(),
            detail: DEFAULT_DETAIL,
            fallback_name: FALLBACK_NAME.to_owned(),
        }
    }
}

impl CityPaperConfig {
    /// Read `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> CityPaperResult<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_path(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a JSON config file.
    pub fn from_path(path: &Path) -> CityPaperResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        serde_json::from_str(&text).map_err(|e| {
            CityPaperError::validation(format!("invalid config '{}': {e}", path.display()))
        })
    }

    /// Apply `CITYPAPER_*` overrides read through `lookup`. Unparsable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        if let Some(ms) = get("CITYPAPER_SETTLE_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.capture.settle_ms = ms;
        }
        if let Some(dir) = get("CITYPAPER_OUT_DIR") {
            self.capture.out_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("CITYPAPER_GEOCODE_URL") {
            self.geocode.endpoint = url;
        }
        if let Some(locale) = get("CITYPAPER_LOCALE") {
            self.geocode.locale = locale;
        }
        if let Some(agent) = get("CITYPAPER_USER_AGENT") {
            self.engine.user_agent = agent;
        }
        debug!(config = ?self, "config after env overrides");
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> CityPaperResult<()> {
        if self.engine.poll_interval_ms == 0 {
            return Err(CityPaperError::validation("engine.poll_interval_ms must be > 0"));
        }
        if !(self.surface.logical_width.is_finite() && self.surface.logical_width >= 1.0) {
            return Err(CityPaperError::validation("surface.logical_width must be >= 1"));
        }
        if !(self.capture.pixel_ratio.is_finite() && self.capture.pixel_ratio > 0.0) {
            return Err(CityPaperError::validation("capture.pixel_ratio must be > 0"));
        }
        if self.engine.user_agent.trim().is_empty() {
            return Err(CityPaperError::validation("engine.user_agent must not be empty"));
        }
        Ok(())
    }

    /// Readiness policy with the hard cap applied.
    pub fn ready_policy(&self) -> ReadyPolicy {
        ReadyPolicy {
            poll_interval: Duration::from_millis(self.engine.poll_interval_ms),
            max_wait: Duration::from_millis(self.engine.max_wait_ms).min(MAX_READY_WAIT),
        }
    }

    /// Options for [`crate::RenderSurface::mount`].
    pub fn surface_opts(&self) -> SurfaceOpts {
        SurfaceOpts {
            logical_width: self.surface.logical_width,
            corner_radius: self.surface.corner_radius,
            bezel: self.surface.bezel,
            ready: self.ready_policy(),
            retina_tiles: self.engine.retina_tiles,
        }
    }

    /// Options for [`crate::CapturePipeline::new`].
    pub fn capture_opts(&self) -> CaptureOpts {
        CaptureOpts {
            settle_delay: Duration::from_millis(self.capture.settle_ms),
            pixel_ratio: self.capture.pixel_ratio,
            file_template: self.capture.file_template.clone(),
            batch_template: self.capture.batch_template.clone(),
        }
    }

    /// Shared HTTP client for tiles and geocoding.
    pub fn http_client(&self) -> CityPaperResult<HttpClient> {
        HttpClient::new(
            Duration::from_millis(self.engine.http_timeout_ms),
            &self.engine.user_agent,
        )
    }
}
