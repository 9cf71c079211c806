use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub record_count: usize,
    pub batch_size: usize,
    pub batches: Vec<BatchRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRange {
    pub index: usize,
    pub start: usize, // 0-based inclusive
    pub end: usize,   // 0-based exclusive
}

impl BatchRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl BatchPlan {
    /// Contiguous ranges of at most `batch_size` records, in order. A zero
    /// `batch_size` is treated as one.
    pub fn from_count(record_count: usize, batch_size: usize) -> BatchPlan {
        let size = batch_size.max(1);

        let mut batches = Vec::with_capacity(record_count.div_ceil(size));
        let mut start = 0usize;

        while start < record_count {
            let end = (start + size).min(record_count);
            batches.push(BatchRange {
                index: batches.len(),
                start,
                end,
            });
            start = end;
        }

        BatchPlan {
            record_count,
            batch_size: size,
            batches,
        }
    }
}
