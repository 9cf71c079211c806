use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser {exe}")]
    Launch {
        exe: String,
        #[source]
        source: std::io::Error,
    },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("page did not settle within {0:?}")]
    SettleTimeout(Duration),

    #[error("no element matched `{selector}` within {waited:?}")]
    ReadinessTimeout { selector: String, waited: Duration },

    #[error("waiting on browser {exe}")]
    Wait {
        exe: String,
        #[source]
        source: std::io::Error,
    },

    #[error("output reader for browser {exe} panicked")]
    OutputReader { exe: String },

    #[error("invalid readiness selector `{0}`")]
    Selector(String),

    #[error("reading {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("no table matched `{0}` in the rendered document")]
    TableMissing(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("batch of {len} items exceeds the store limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("invalid table name `{0}`")]
    InvalidTable(String),

    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serializing item")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum WriteError {
    /// Batches before `batch_index` stay written; nothing after it was attempted.
    #[error(
        "batch {batch_index} (records {start}..{end}) failed with {committed} records already written"
    )]
    BatchFailed {
        batch_index: usize,
        start: usize,
        end: usize,
        committed: usize,
        #[source]
        source: StoreError,
    },
}

impl WriteError {
    pub fn committed(&self) -> usize {
        match self {
            WriteError::BatchFailed { committed, .. } => *committed,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("render failed")]
    Render(#[from] RenderError),

    #[error("extraction failed")]
    Extract(#[from] ExtractionError),

    #[error("store write failed")]
    Write(#[from] WriteError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Render(_) => "render",
            PipelineError::Extract(_) => "extract",
            PipelineError::Write(_) => "store",
        }
    }

    /// The error and each of its sources, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut out = vec![self.to_string()];
        let mut cur = std::error::Error::source(self);
        while let Some(err) = cur {
            out.push(err.to_string());
            cur = std::error::Error::source(err);
        }
        out
    }
}
