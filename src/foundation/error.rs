/// Convenience result type used across CityPaper.
pub type CityPaperResult<T> = Result<T, CityPaperError>;

/// Boxed lower-level error carried as the source of a [`CityPaperError::CaptureFailed`].
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error taxonomy used by surface, capture and geocoding APIs.
#[derive(thiserror::Error, Debug)]
pub enum CityPaperError {
    /// A coordinate was rejected at the input boundary.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// The tile engine library never became available within its readiness bound.
    ///
    /// Terminal for the affected surface.
    #[error("tile engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine could not be bound to the surface handle.
    ///
    /// Terminal for the affected surface.
    #[error("attach failed: {0}")]
    AttachFailed(String),

    /// Raster conversion or artifact delivery failed for one export.
    #[error("capture failed for '{file_name}': {source}")]
    CaptureFailed {
        /// Deterministic file name of the export that failed.
        file_name: String,
        /// Underlying conversion or delivery error.
        #[source]
        source: BoxedSource,
    },

    /// Reverse geocoding failed. Degraded to a fallback name by the resolver.
    #[error("geocode failed: {0}")]
    GeocodeFailed(String),

    /// A second export was requested while one was already running on the surface.
    #[error("export already in progress for this surface")]
    ExportInProgress,

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(String),

    /// Invalid user-provided configuration or parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CityPaperError {
    /// Build a [`CityPaperError::InvalidCoordinate`] value.
    pub fn invalid_coordinate(msg: impl Into<String>) -> Self {
        Self::InvalidCoordinate(msg.into())
    }

    /// Build a [`CityPaperError::EngineUnavailable`] value.
    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable(msg.into())
    }

    /// Build a [`CityPaperError::AttachFailed`] value.
    pub fn attach_failed(msg: impl Into<String>) -> Self {
        Self::AttachFailed(msg.into())
    }

    /// Build a [`CityPaperError::CaptureFailed`] value wrapping `source`.
    pub fn capture_failed(file_name: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self::CaptureFailed {
            file_name: file_name.into(),
            source: source.into(),
        }
    }

    /// Build a [`CityPaperError::GeocodeFailed`] value.
    pub fn geocode_failed(msg: impl Into<String>) -> Self {
        Self::GeocodeFailed(msg.into())
    }

    /// Build a [`CityPaperError::Http`] value.
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Build a [`CityPaperError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Return `true` for lifecycle failures that leave a surface permanently unusable.
    pub fn is_terminal_for_surface(&self) -> bool {
        matches!(self, Self::EngineUnavailable(_) | Self::AttachFailed(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
