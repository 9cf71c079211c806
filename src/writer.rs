use crate::{
    batch_plan::BatchPlan,
    error::WriteError,
    model::{Report, RunStamp, StoredReport},
    store::{Store, MAX_BATCH_ITEMS},
};
use tracing::{debug, error, info, warn};

pub struct BatchWriter<S: Store> {
    store: S,
    table: String,
    batch_size: usize,
}

impl<S: Store> BatchWriter<S> {
    /// `batch_size` is clamped to `1..=MAX_BATCH_ITEMS`; the writer never relies
    /// on the store to refuse an oversized request.
    pub fn new(store: S, table: impl Into<String>, batch_size: usize) -> Self {
        let clamped = batch_size.clamp(1, MAX_BATCH_ITEMS);
        if clamped != batch_size {
            warn!("batch size {} out of range, using {}", batch_size, clamped);
        }
        Self {
            store,
            table: table.into(),
            batch_size: clamped,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Writes `records` in order, one store request per batch, never more than
    /// one in flight.
    ///
    /// The first failing batch ends the call. Batches before it stay written and
    /// nothing after it is sent; the error says how many records made it.
    pub fn persist(&self, records: Vec<Report>, run: &RunStamp) -> Result<usize, WriteError> {
        if records.is_empty() {
            debug!("no records to write");
            return Ok(0);
        }

        let plan = BatchPlan::from_count(records.len(), self.batch_size);
        debug!(?plan, "batch plan");

        let items = assign_ids(records, run);

        for batch in &plan.batches {
            let chunk = &items[batch.start..batch.end];
            match self.store.batch_upsert(&self.table, chunk) {
                Ok(()) => {
                    info!(
                        "batch {}/{} written ({} items) to {}",
                        batch.index + 1,
                        plan.batches.len(),
                        chunk.len(),
                        self.table
                    );
                }
                Err(source) => {
                    error!(
                        "batch {}/{} failed; {} records already written",
                        batch.index + 1,
                        plan.batches.len(),
                        batch.start
                    );
                    return Err(WriteError::BatchFailed {
                        batch_index: batch.index,
                        start: batch.start,
                        end: batch.end,
                        committed: batch.start,
                        source,
                    });
                }
            }
        }

        Ok(items.len())
    }
}

/// Attach ids by absolute position in `records`.
pub fn assign_ids(records: Vec<Report>, run: &RunStamp) -> Vec<StoredReport> {
    records
        .into_iter()
        .enumerate()
        .map(|(ordinal, report)| StoredReport {
            id: run.record_id(&report.report_label, ordinal),
            report,
        })
        .collect()
}
