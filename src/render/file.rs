use super::{Readiness, RenderedPage, Renderer};
use crate::error::RenderError;
use std::path::PathBuf;
use tracing::info;

/// Serves an already rendered document saved to disk. There is nothing to
/// wait for, so the readiness condition is not consulted.
pub struct FileRenderer {
    path: PathBuf,
}

impl FileRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Renderer for FileRenderer {
    fn render(&self, url: &str, _readiness: &Readiness) -> Result<RenderedPage, RenderError> {
        info!("reading saved page {} (as {url})", self.path.display());
        let html = std::fs::read_to_string(&self.path).map_err(|source| RenderError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}
