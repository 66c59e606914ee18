use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capture::naming::{
    DEFAULT_BATCH_TEMPLATE, DEFAULT_SINGLE_TEMPLATE, NameParts, file_name,
};
use crate::capture::png::encode_png;
use crate::capture::sink::ArtifactSink;
use crate::foundation::core::{Location, ViewportSpec};
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::render::backend::ComposeMode;
use crate::render::surface::{RenderSurface, SharedSurface};
use crate::scene::model::{PlaceLabel, StyleSpec};

/// Capture timing, quality and naming.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureOpts {
    /// Minimum quiet time after the last surface mutation before rasterizing.
    ///
    /// A heuristic for tile and font loads the pipeline cannot observe; it is not a guarantee
    /// that every tile has arrived.
    pub settle_delay: Duration,
    /// Device pixels per logical unit in the exported image.
    pub pixel_ratio: f64,
    /// File name template for single exports.
    pub file_template: String,
    /// File name template for batch items.
    pub batch_template: String,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
            pixel_ratio: 3.0,
            file_template: DEFAULT_SINGLE_TEMPLATE.to_owned(),
            batch_template: DEFAULT_BATCH_TEMPLATE.to_owned(),
        }
    }
}

/// Settings shared by every item of a batch.
#[derive(Clone, Debug)]
pub struct BatchScene {
    /// Style for all items.
    pub style: StyleSpec,
    /// Zoom and aspect ratio for all items.
    pub viewport: ViewportSpec,
    /// Whether the label block is drawn.
    pub show_labels: bool,
}

/// One place to export in a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchItem {
    /// Map center.
    pub location: Location,
    /// Label drawn over the map.
    pub label: PlaceLabel,
}

/// Progress notification emitted when an item starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based index of the item that just started.
    pub index: usize,
    /// Number of items in the batch.
    pub total: usize,
    /// Display name of the item.
    pub label: String,
}

/// Result of one batch item.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The artifact was delivered.
    Written {
        /// Where the sink put it.
        path: PathBuf,
    },
    /// The item failed and was skipped.
    Failed {
        /// Display form of the error.
        error: String,
    },
}

/// Per-item record in a [`BatchReport`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ItemReport {
    /// 1-based index.
    pub index: usize,
    /// Display name.
    pub label: String,
    /// Deterministic file name.
    pub file_name: String,
    /// What happened.
    pub outcome: ItemOutcome,
}

/// Outcome of a batch. There is no all-or-nothing guarantee.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    /// Items in the order they were attempted.
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    /// Number of delivered artifacts.
    pub fn written(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Written { .. }))
            .count()
    }

    /// Number of skipped items.
    pub fn failed(&self) -> usize {
        self.items.len() - self.written()
    }
}

/// Turns a live surface into PNG artifacts.
#[derive(Clone, Debug, Default)]
pub struct CapturePipeline {
    opts: CaptureOpts,
}

impl CapturePipeline {
    /// Create a pipeline.
    pub fn new(opts: CaptureOpts) -> CityPaperResult<Self> {
        if !opts.pixel_ratio.is_finite() || opts.pixel_ratio <= 0.0 {
            return Err(CityPaperError::validation(format!(
                "pixel ratio must be positive, got {}",
                opts.pixel_ratio
            )));
        }
        Ok(Self { opts })
    }

    /// Options in effect.
    pub fn opts(&self) -> &CaptureOpts {
        &self.opts
    }

    /// Settle, rasterize and encode the surface. Nothing is saved.
    ///
    /// Conversion errors come back as `CaptureFailed` naming `file_name`. Lifecycle errors of the
    /// surface are returned unchanged.
    #[tracing::instrument(skip(self, surface))]
    pub async fn capture_one(
        &self,
        surface: &mut RenderSurface,
        file_name: &str,
    ) -> CityPaperResult<Vec<u8>> {
        if surface.sync_size()? {
            debug!("host box resized since last render; settling again");
        }
        let quiet = surface.since_last_mutation();
        if quiet < self.opts.settle_delay {
            tokio::time::sleep(self.opts.settle_delay - quiet).await;
        }
        let pending = surface.pending_tiles();
        if pending > 0 {
            warn!(pending, "capturing with tiles still loading");
        }

        let frame = surface
            .compose(self.opts.pixel_ratio, ComposeMode::Capture)
            .map_err(|e| wrap_capture(file_name, e))?;
        encode_png(frame).map_err(|e| wrap_capture(file_name, e))
    }

    /// Export the surface's current scene as one artifact.
    ///
    /// Rejected with `ExportInProgress` while another export holds the surface.
    pub async fn export_one(
        &self,
        surface: &SharedSurface,
        sink: &mut dyn ArtifactSink,
    ) -> CityPaperResult<PathBuf> {
        let _claim = surface.try_begin_export()?;
        let mut guard = surface.lock().await;

        let (label, style, viewport) = match (guard.label(), guard.style(), guard.viewport()) {
            (Some(l), Some(s), Some(v)) => (l.clone(), s.id, v),
            _ => return Err(CityPaperError::validation("nothing has been rendered yet")),
        };
        let name = file_name(
            &self.opts.file_template,
            NameParts {
                name: &label.display_name,
                style,
                ratio: viewport.aspect_ratio,
                index: 1,
                total: 1,
            },
        )?;

        let png = self.capture_one(&mut guard, &name).await?;
        let path = sink
            .save(&name, &png)
            .map_err(|e| wrap_capture(&name, e))?;
        info!(path = %path.display(), "export written");
        Ok(path)
    }

    /// Export `items` one after another on a single surface.
    ///
    /// Each item is rendered, announced through `progress`, settled, captured and saved before the
    /// next one starts. Item failures are logged and recorded; the batch moves on. A lifecycle
    /// failure of the surface ends the batch with that error.
    #[tracing::instrument(skip_all, fields(total = items.len()))]
    pub async fn export_batch<F>(
        &self,
        surface: &SharedSurface,
        scene: &BatchScene,
        items: &[BatchItem],
        sink: &mut dyn ArtifactSink,
        mut progress: F,
    ) -> CityPaperResult<BatchReport>
    where
        F: FnMut(BatchProgress) + Send,
    {
        let _claim = surface.try_begin_export()?;
        let mut guard = surface.lock().await;
        let total = items.len();
        let mut report = BatchReport::default();

        for (i, item) in items.iter().enumerate() {
            let index = i + 1;
            let display = item.label.display_name.clone();

            let name = match file_name(
                &self.opts.batch_template,
                NameParts {
                    name: &display,
                    style: scene.style.id,
                    ratio: scene.viewport.aspect_ratio,
                    index,
                    total,
                },
            ) {
                Ok(n) => n,
                Err(e) => {
                    warn!(index, error = %e, "skipping batch item");
                    report.items.push(ItemReport {
                        index,
                        label: display,
                        file_name: String::new(),
                        outcome: ItemOutcome::Failed {
                            error: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let result = self
                .run_item(&mut guard, scene, item, &name, sink, || {
                    progress(BatchProgress {
                        index,
                        total,
                        label: display.clone(),
                    })
                })
                .await;

            let outcome = match result {
                Ok(path) => {
                    info!(index, total, path = %path.display(), "batch item written");
                    ItemOutcome::Written { path }
                }
                Err(e) if e.is_terminal_for_surface() => {
                    warn!(index, total, error = %e, "batch aborted");
                    return Err(e);
                }
                Err(e) => {
                    warn!(index, total, error = %e, "batch item failed; continuing");
                    ItemOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.items.push(ItemReport {
                index,
                label: display,
                file_name: name,
                outcome,
            });
        }

        info!(
            written = report.written(),
            failed = report.failed(),
            "batch finished"
        );
        Ok(report)
    }

    async fn run_item(
        &self,
        surface: &mut RenderSurface,
        scene: &BatchScene,
        item: &BatchItem,
        name: &str,
        sink: &mut dyn ArtifactSink,
        started: impl FnOnce(),
    ) -> CityPaperResult<PathBuf> {
        let rendered = surface.render(
            item.location,
            &scene.style,
            scene.viewport,
            &item.label,
            scene.show_labels,
        );
        started();
        rendered?;
        let png = self.capture_one(surface, name).await?;
        sink.save(name, &png).map_err(|e| wrap_capture(name, e))
    }
}

fn wrap_capture(file_name: &str, e: CityPaperError) -> CityPaperError {
    match e {
        e if e.is_terminal_for_surface() => e,
        e @ CityPaperError::CaptureFailed { .. } => e,
        e => CityPaperError::capture_failed(file_name, e),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/pipeline.rs"]
mod tests;
