pub mod memory;
pub mod sqlite;

use crate::{error::StoreError, model::StoredReport};
use regex::Regex;
use std::sync::LazyLock;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Per-request item limit of the store's batch write.
pub const MAX_BATCH_ITEMS: usize = 25;

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,255}$").unwrap());

/// A key-value store that accepts batched upserts keyed by `StoredReport::id`.
///
/// One call is one request: implementations either apply the whole batch or
/// return an error, and must reject batches over [`MAX_BATCH_ITEMS`].
pub trait Store {
    fn batch_upsert(&self, table: &str, items: &[StoredReport]) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for &S {
    fn batch_upsert(&self, table: &str, items: &[StoredReport]) -> Result<(), StoreError> {
        (**self).batch_upsert(table, items)
    }
}

pub fn valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

fn check_request(table: &str, items: &[StoredReport]) -> Result<(), StoreError> {
    if !valid_table_name(table) {
        return Err(StoreError::InvalidTable(table.to_string()));
    }
    if items.len() > MAX_BATCH_ITEMS {
        return Err(StoreError::BatchTooLarge {
            len: items.len(),
            max: MAX_BATCH_ITEMS,
        });
    }
    Ok(())
}
