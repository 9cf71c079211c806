use sismo_scrape::{
    batch_plan::BatchPlan,
    error::{StoreError, WriteError},
    model::{Magnitude, Report, RunStamp, StoredReport},
    store::{MemoryStore, Store, MAX_BATCH_ITEMS},
    writer::{assign_ids, BatchWriter},
};
use std::cell::RefCell;
use std::collections::HashSet;

const TABLE: &str = "TablaWebScrapping";

fn run() -> RunStamp {
    RunStamp::from_unix_millis(1_704_103_200_000).unwrap()
}

fn reports(n: usize) -> Vec<Report> {
    (0..n)
        .map(|i| Report {
            // Repeated labels on purpose: ids must still differ.
            report_label: format!("IGP/CENSIS/RS 2024-{:04}", i % 7),
            reference: "Lima".into(),
            local_datetime: "2024-01-01 10:00".into(),
            magnitude: Magnitude::Number(4.0 + (i % 10) as f64 / 10.0),
            report_link: String::new(),
            scraped_at: run().rfc3339(),
        })
        .collect()
}

#[test]
fn plan_splits_sixty_into_25_25_10() {
    let plan = BatchPlan::from_count(60, 25);
    let sizes: Vec<_> = plan.batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![25, 25, 10]);
    assert_eq!(plan.batches[2].start, 50);
    assert_eq!(plan.batches[2].end, 60);
}

#[test]
fn plan_for_zero_records_is_empty() {
    assert!(BatchPlan::from_count(0, 25).batches.is_empty());
}

#[test]
fn empty_input_issues_no_requests() {
    let store = MemoryStore::new();
    let writer = BatchWriter::new(&store, TABLE, 25);
    assert_eq!(writer.persist(Vec::new(), &run()).unwrap(), 0);
    assert!(store.requests().is_empty());
}

#[test]
fn every_request_stays_within_the_batch_limit() {
    let store = MemoryStore::new();
    let writer = BatchWriter::new(&store, TABLE, MAX_BATCH_ITEMS);

    let written = writer.persist(reports(103), &run()).unwrap();

    assert_eq!(written, 103);
    let requests = store.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests.iter().all(|r| r.len() <= MAX_BATCH_ITEMS));
    assert_eq!(store.len(TABLE), 103);
}

#[test]
fn requests_keep_input_order() {
    let store = MemoryStore::new();
    let writer = BatchWriter::new(&store, TABLE, 10);
    let input = reports(35);
    let expected: Vec<String> = assign_ids(input.clone(), &run())
        .into_iter()
        .map(|s| s.id)
        .collect();

    writer.persist(input, &run()).unwrap();

    let sent: Vec<String> = store.requests().into_iter().flatten().collect();
    assert_eq!(sent, expected);
}

#[test]
fn ids_are_unique_and_independent_of_batch_size() {
    let run = run();
    let mut seen = Vec::new();

    for batch_size in [1, 7, 25] {
        let store = MemoryStore::new();
        BatchWriter::new(&store, TABLE, batch_size)
            .persist(reports(60), &run)
            .unwrap();
        let ids: Vec<String> = store.requests().into_iter().flatten().collect();

        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), 60);
        seen.push(ids);
    }

    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[1], seen[2]);
}

#[test]
fn later_runs_get_new_ids() {
    let a = RunStamp::from_unix_millis(1_704_103_200_000).unwrap();
    let b = RunStamp::from_unix_millis(1_704_106_800_000).unwrap();
    let ids_a: HashSet<_> = assign_ids(reports(5), &a).into_iter().map(|s| s.id).collect();
    let ids_b: HashSet<_> = assign_ids(reports(5), &b).into_iter().map(|s| s.id).collect();
    assert!(ids_a.is_disjoint(&ids_b));
}

#[test]
fn id_format_uses_label_run_millis_and_ordinal() {
    let items = assign_ids(reports(2), &run());
    assert_eq!(items[0].id, "IGP/CENSIS/RS_2024-0000_1704103200000_0");
    assert_eq!(items[1].id, "IGP/CENSIS/RS_2024-0001_1704103200000_1");
    assert_eq!(items[0].report.scraped_at, items[1].report.scraped_at);
}

#[test]
fn failing_batch_stops_the_run_without_rollback() {
    // Second request (index 1) is refused.
    let store = MemoryStore::failing_on(1);
    let writer = BatchWriter::new(&store, TABLE, 25);

    let err = writer.persist(reports(60), &run()).unwrap_err();

    let WriteError::BatchFailed {
        batch_index,
        start,
        end,
        committed,
        ref source,
    } = err;
    assert_eq!(batch_index, 1);
    assert_eq!((start, end), (25, 50));
    assert_eq!(committed, 25);
    assert_eq!(err.committed(), 25);
    assert!(matches!(source, StoreError::Rejected(_)));

    // First batch issued and kept, third never attempted.
    let requests = store.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(store.len(TABLE), 25);
}

/// Accepts any request size, so only the writer keeps requests in bounds.
struct UncheckedStore {
    sizes: RefCell<Vec<usize>>,
}

impl Store for UncheckedStore {
    fn batch_upsert(&self, _table: &str, items: &[StoredReport]) -> Result<(), StoreError> {
        self.sizes.borrow_mut().push(items.len());
        Ok(())
    }
}

#[test]
fn oversized_batch_size_is_clamped_by_the_writer() {
    let store = UncheckedStore {
        sizes: RefCell::new(Vec::new()),
    };
    let writer = BatchWriter::new(&store, TABLE, 100);
    assert_eq!(writer.batch_size(), MAX_BATCH_ITEMS);

    assert_eq!(writer.persist(reports(60), &run()).unwrap(), 60);
    assert_eq!(*store.sizes.borrow(), vec![25, 25, 10]);
}

#[test]
fn thirty_records_with_batch_size_thirty_go_out_as_25_and_5() {
    let store = MemoryStore::new();
    let writer = BatchWriter::new(&store, TABLE, 30);

    writer.persist(reports(30), &run()).unwrap();

    let sizes: Vec<_> = store.requests().iter().map(|r| r.len()).collect();
    assert_eq!(sizes, vec![25, 5]);
    assert_eq!(store.len(TABLE), 30);
}

#[test]
fn zero_batch_size_still_writes() {
    let store = MemoryStore::new();
    let writer = BatchWriter::new(&store, TABLE, 0);
    assert_eq!(writer.batch_size(), 1);
    writer.persist(reports(3), &run()).unwrap();
    assert_eq!(store.requests().len(), 3);
}
