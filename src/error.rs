// error.rs: error types for startup, config and asset loading

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("failed to read annotations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("annotation document is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("annotation `{id}` has invalid {attr} value {value:?}")]
    InvalidLength {
        id: String,
        attr: &'static str,
        value: String,
    },
}

impl AnnotationError {
    /// I/O failures are worth another attempt; a malformed document is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnnotationError::Io { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Renderer(#[from] RendererError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}
