#[path = "common/mod.rs"]
mod common;

use common::*;
use spillsort::{CancelToken, SortError, SortOptions, Sorter};

/// Everything fits in memory: one spill at finalization, one run, and the
/// cursor yields the records in lexicographic order.
#[test]
fn sorts_a_small_input_with_defaults() {
    init_tracing_once();
    let dir = tempfile::tempdir().unwrap();
    let mut sorter = Sorter::new(SortOptions::default().with_temp_dir(dir.path()));

    for word in ["foo", "bar", "baz", "boo"] {
        sorter.append(word.as_bytes()).unwrap();
    }
    assert_eq!(sorter.spilled_runs(), 0, "nothing spills below the memory budget");

    let mut cursor = sorter.sort(&CancelToken::new()).unwrap();
    let records = drain(&mut cursor);
    assert_eq!(
        records,
        vec![b"bar".to_vec(), b"baz".to_vec(), b"boo".to_vec(), b"foo".to_vec()]
    );

    cursor.close().unwrap();
    sorter.close().unwrap();
    assert!(dir_entries(dir.path()).is_empty(), "close removes every run file");
}

#[test]
fn honors_a_reverse_comparer() {
    let dir = tempfile::tempdir().unwrap();
    let mut sorter = Sorter::new(
        SortOptions::default()
            .with_temp_dir(dir.path())
            .with_comparer(|a: &[u8], b: &[u8]| b.cmp(a)),
    );

    for word in ["foo", "bar", "baz", "boo"] {
        sorter.append(word.as_bytes()).unwrap();
    }

    let mut cursor = sorter.sort(&CancelToken::new()).unwrap();
    assert_eq!(
        drain(&mut cursor),
        vec![b"foo".to_vec(), b"boo".to_vec(), b"baz".to_vec(), b"bar".to_vec()]
    );
    cursor.close().unwrap();
    sorter.close().unwrap();
}

#[test]
fn preserves_duplicates_and_empty_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut sorter = Sorter::new(SortOptions::default().with_temp_dir(dir.path()));

    for record in [b"dup".as_slice(), b"", b"dup", b"aa", b""] {
        sorter.append(record).unwrap();
    }

    let mut cursor = sorter.sort(&CancelToken::new()).unwrap();
    assert_eq!(
        drain(&mut cursor),
        vec![
            Vec::new(),
            Vec::new(),
            b"aa".to_vec(),
            b"dup".to_vec(),
            b"dup".to_vec(),
        ]
    );
    cursor.close().unwrap();
    sorter.close().unwrap();
}

#[test]
fn an_empty_engine_yields_an_empty_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let mut sorter = Sorter::new(SortOptions::default().with_temp_dir(dir.path()));

    let mut cursor = sorter.sort(&CancelToken::new()).unwrap();
    assert!(!cursor.next());
    assert!(cursor.error().is_none());
    cursor.close().unwrap();
    sorter.close().unwrap();
}

/// A record bigger than the whole memory budget is accepted into the empty
/// buffer and spilled as a one-record run on the next append.
#[test]
fn accepts_a_single_oversized_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut sorter = Sorter::new(
        SortOptions::default()
            .with_temp_dir(dir.path())
            .with_max_mem_buffer(1024 * 1024),
    );

    let huge = vec![b'h'; 10 * 1024 * 1024];
    sorter.append(&huge).unwrap();
    assert_eq!(sorter.spilled_runs(), 0);

    sorter.append(b"small").unwrap();
    assert_eq!(sorter.spilled_runs(), 1, "the oversized record spilled alone");

    let mut cursor = sorter.sort(&CancelToken::new()).unwrap();
    let records = drain(&mut cursor);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], huge);
    assert_eq!(records[1], b"small");

    cursor.close().unwrap();
    sorter.close().unwrap();
    assert!(dir_entries(dir.path()).is_empty());
}

#[test]
fn closed_cursor_reports_closed() {
    let dir = tempfile::tempdir().unwrap();
    let mut sorter = Sorter::new(SortOptions::default().with_temp_dir(dir.path()));
    sorter.append(b"a").unwrap();
    sorter.append(b"b").unwrap();

    let mut cursor = sorter.sort(&CancelToken::new()).unwrap();
    assert!(cursor.next());
    cursor.close().unwrap();
    assert!(!cursor.next());
    assert!(matches!(cursor.error(), Some(SortError::Closed)));
    assert_eq!(cursor.current(), b"");
    cursor.close().unwrap();

    sorter.close().unwrap();
}

#[test]
fn close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut sorter = Sorter::new(
        SortOptions::default()
            .with_temp_dir(dir.path())
            .with_max_mem_buffer(1024 * 1024),
    );
    for record in random_records(40_000, 11) {
        sorter.append(&record).unwrap();
    }
    assert!(sorter.spilled_runs() > 0);

    sorter.close().unwrap();
    assert!(dir_entries(dir.path()).is_empty());
    sorter.close().unwrap();
}

/// Dropping the sorter without an explicit close still removes its runs.
#[test]
fn drop_removes_run_files() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut sorter = Sorter::new(
            SortOptions::default()
                .with_temp_dir(dir.path())
                .with_max_mem_buffer(1024 * 1024),
        );
        for record in random_records(40_000, 12) {
            sorter.append(&record).unwrap();
        }
        assert!(!dir_entries(dir.path()).is_empty());
    }
    assert!(dir_entries(dir.path()).is_empty());
}
