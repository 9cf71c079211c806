use crate::{error::PipelineError, model::Report, util::now_rfc3339};
use serde::{Deserialize, Serialize};

/// What a run hands back to whatever triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Completed {
        message: String,
        count: usize,
        timestamp: String,
        document_sha256: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        reports: Vec<Report>,
    },
    Empty {
        message: String,
        count: usize,
    },
    Failed {
        message: String,
        error: String,
        kind: String,
        detail: Vec<String>,
    },
}

/// The successful end of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub written: usize,
    pub document_sha256: String,
    /// Empty unless `output.print_reports` is set.
    pub reports: Vec<Report>,
}

impl RunResponse {
    pub fn completed(summary: RunSummary, include_reports: bool) -> Self {
        if summary.written == 0 {
            return Self::empty();
        }
        Self {
            status_code: 200,
            body: ResponseBody::Completed {
                message: "scrape completed".to_string(),
                count: summary.written,
                timestamp: now_rfc3339(),
                document_sha256: summary.document_sha256,
                reports: if include_reports {
                    summary.reports
                } else {
                    Vec::new()
                },
            },
        }
    }

    pub fn empty() -> Self {
        Self {
            status_code: 200,
            body: ResponseBody::Empty {
                message: "no reports found to process".to_string(),
                count: 0,
            },
        }
    }

    pub fn failed(err: &PipelineError) -> Self {
        Self {
            status_code: 500,
            body: ResponseBody::Failed {
                message: "scrape failed".to_string(),
                error: err.chain().join(": "),
                kind: err.kind().to_string(),
                detail: err.chain(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code < 400
    }

    pub fn count(&self) -> usize {
        match &self.body {
            ResponseBody::Completed { count, .. } | ResponseBody::Empty { count, .. } => *count,
            ResponseBody::Failed { .. } => 0,
        }
    }
}
