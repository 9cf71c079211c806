pub mod chrome;
pub mod file;

use crate::{config, error::RenderError};
use scraper::{Html, Selector};
use std::time::Duration;

pub use chrome::ChromeRenderer;
pub use file::FileRenderer;

/// A document as the renderer left it, plus the URL relative links resolve against.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

/// Two independent waits: first for the load to settle, then for `selector`
/// to match something in the rendered document.
#[derive(Debug, Clone)]
pub struct Readiness {
    pub selector: String,
    pub settle_timeout: Duration,
    pub readiness_timeout: Duration,
    pub poll_interval: Duration,
    compiled: Selector,
}

impl Readiness {
    pub fn new(
        selector: &str,
        settle_timeout: Duration,
        readiness_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, RenderError> {
        let compiled =
            Selector::parse(selector).map_err(|_| RenderError::Selector(selector.to_string()))?;
        Ok(Self {
            selector: selector.to_string(),
            settle_timeout,
            readiness_timeout,
            poll_interval,
            compiled,
        })
    }

    pub fn from_config(source: &config::Source, render: &config::Render) -> Result<Self, RenderError> {
        Self::new(
            &source.row_selector,
            render.settle_timeout(),
            render.readiness_timeout(),
            render.poll_interval(),
        )
    }

    pub fn is_ready(&self, html: &str) -> bool {
        Html::parse_document(html).select(&self.compiled).next().is_some()
    }
}

/// Produces a rendered document for a URL, or fails once its waits run out.
///
/// Any browser or session an implementation opens must be released before
/// `render` returns, on success and on error.
pub trait Renderer {
    fn render(&self, url: &str, readiness: &Readiness) -> Result<RenderedPage, RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render(&self, url: &str, readiness: &Readiness) -> Result<RenderedPage, RenderError> {
        (**self).render(url, readiness)
    }
}
