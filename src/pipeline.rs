use crate::{
    config::Config,
    error::PipelineError,
    extract::Extractor,
    model::{Report, RunStamp},
    render::{Readiness, Renderer},
    response::{RunResponse, RunSummary},
    store::Store,
    util::sha256_hex,
    writer::BatchWriter,
};
use std::time::Instant;
use tracing::{error, info};

/// Render, extract, persist. One call to [`Pipeline::run`] is one run.
pub struct Pipeline<R: Renderer, S: Store> {
    url: String,
    readiness: Readiness,
    extractor: Extractor,
    renderer: R,
    writer: BatchWriter<S>,
    include_reports: bool,
}

impl<R: Renderer, S: Store> Pipeline<R, S> {
    pub fn new(cfg: &Config, renderer: R, store: S) -> Result<Self, PipelineError> {
        Ok(Self {
            url: cfg.source.url.clone(),
            readiness: Readiness::from_config(&cfg.source, &cfg.render)?,
            extractor: Extractor::from_config(&cfg.source)?,
            renderer,
            writer: BatchWriter::new(store, cfg.store.table_name.clone(), cfg.store.batch_size),
            include_reports: cfg.output.print_reports,
        })
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        self.run_at(RunStamp::now())
    }

    pub fn run_at(&self, run: RunStamp) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        info!("run started scraped_at={} url={}", run.rfc3339(), self.url);

        let (reports, document_sha256) = self.scrape(&run)?;
        info!("found {} reports", reports.len());

        if reports.is_empty() {
            return Ok(RunSummary {
                written: 0,
                document_sha256,
                reports,
            });
        }

        let echoed = if self.include_reports {
            reports.clone()
        } else {
            Vec::new()
        };
        let written = self.writer.persist(reports, &run)?;
        info!(
            "run finished: {} reports written to {} in {:.1}s",
            written,
            self.writer.table(),
            started.elapsed().as_secs_f64()
        );

        Ok(RunSummary {
            written,
            document_sha256,
            reports: echoed,
        })
    }

    /// Render and extract without writing anything.
    pub fn preview(&self, run: &RunStamp) -> Result<Vec<Report>, PipelineError> {
        Ok(self.scrape(run)?.0)
    }

    /// Runs once and folds the outcome into the response payload. Errors are
    /// converted here and nowhere else.
    pub fn invoke(&self) -> RunResponse {
        match self.run() {
            Ok(summary) => RunResponse::completed(summary, self.include_reports),
            Err(err) => {
                error!("run failed: {}", err.chain().join(": "));
                RunResponse::failed(&err)
            }
        }
    }

    fn scrape(&self, run: &RunStamp) -> Result<(Vec<Report>, String), PipelineError> {
        // The renderer has released its browser by the time this returns.
        let page = self.renderer.render(&self.url, &self.readiness)?;
        let digest = sha256_hex(page.html.as_bytes());
        info!("rendered {} bytes sha256={}", page.html.len(), digest);

        let reports = self.extractor.extract(&page, run)?;
        Ok((reports, digest))
    }
}
