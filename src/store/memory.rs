use super::{check_request, Store};
use crate::{error::StoreError, model::StoredReport};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// In-process store. Keeps every request it receives, in order, so callers can
/// see exactly what was sent and when a write was refused.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RefCell<BTreeMap<String, BTreeMap<String, StoredReport>>>,
    requests: RefCell<Vec<Vec<String>>>,
    fail_on_request: Cell<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the `n`th request (0-based). The refused request is still recorded.
    pub fn failing_on(n: usize) -> Self {
        let store = Self::default();
        store.fail_on_request.set(Some(n));
        store
    }

    /// Ids of every request received, in the order they arrived.
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.borrow().clone()
    }

    pub fn items(&self, table: &str) -> Vec<StoredReport> {
        self.tables
            .borrow()
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables.borrow().get(table).map_or(0, |t| t.len())
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

impl Store for MemoryStore {
    fn batch_upsert(&self, table: &str, items: &[StoredReport]) -> Result<(), StoreError> {
        let n = {
            let mut requests = self.requests.borrow_mut();
            requests.push(items.iter().map(|i| i.id.clone()).collect());
            requests.len() - 1
        };

        check_request(table, items)?;

        if self.fail_on_request.get() == Some(n) {
            return Err(StoreError::Rejected(format!("request {n} refused")));
        }

        let mut tables = self.tables.borrow_mut();
        let t = tables.entry(table.to_string()).or_default();
        for item in items {
            t.insert(item.id.clone(), item.clone());
        }
        Ok(())
    }
}
