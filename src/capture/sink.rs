use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::debug;

use crate::foundation::error::CityPaperResult;

/// Destination for finished PNG files.
///
/// Ordering contract: within one batch, `save` is called in item order and at most once per item.
pub trait ArtifactSink: Send {
    /// Persist `png` under `file_name` and return where it went.
    fn save(&mut self, file_name: &str, png: &[u8]) -> CityPaperResult<PathBuf>;
}

/// Writes each artifact as a file inside one directory.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Sink writing into `dir`, created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&mut self, file_name: &str, png: &[u8]) -> CityPaperResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir '{}'", self.dir.display()))?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, png).with_context(|| format!("write png '{}'", path.display()))?;
        debug!(path = %path.display(), bytes = png.len(), "artifact written");
        Ok(path)
    }
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryArtifactSink {
    artifacts: Vec<(String, Vec<u8>)>,
}

impl InMemoryArtifactSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved artifacts in save order.
    pub fn artifacts(&self) -> &[(String, Vec<u8>)] {
        &self.artifacts
    }
}

impl ArtifactSink for InMemoryArtifactSink {
    fn save(&mut self, file_name: &str, png: &[u8]) -> CityPaperResult<PathBuf> {
        self.artifacts.push((file_name.to_owned(), png.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}
