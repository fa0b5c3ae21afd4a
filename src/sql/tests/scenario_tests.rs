use crate::common::utility::create_scratch_database;
use crate::common::Error;
use crate::concurrency::{Permission, TransactionId};
use crate::sql::execution::{Aggregate, AggregateOp, Insert, Operator, SeqScan, Values};
use crate::sql::tests::utility::{
    assert_same_tuples, collect_all, int_tuples, pair_tuples, populate_table, scan_table, setup,
};
use crate::storage::page::PageId;
use crate::storage::Database;
use crate::types::field::Field;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::time::{Duration, Instant};

/// Insert then scan: the table holds exactly what was inserted, and the
/// ungrouped aggregates agree with the reference values.
#[test]
fn test_insert_scan_and_aggregates() {
    setup();
    let (db, _dir, table_id) = create_scratch_database(8, 1);

    let tid = TransactionId::new();
    let schema = db.catalog().get_schema(table_id).unwrap();
    let values = Values::new((*schema).clone(), int_tuples(&[3, 1, 4, 1, 5])).unwrap();
    let mut insert = Insert::new(db.buffer_pool(), tid, Box::new(values), table_id).unwrap();
    insert.open().unwrap();
    assert_eq!(insert.next().unwrap().unwrap(), int_tuples(&[5])[0]);
    insert.close();
    db.buffer_pool().transaction_complete(tid, true).unwrap();

    assert_same_tuples(scan_table(&db, table_id), int_tuples(&[3, 1, 4, 1, 5]));

    let tid = TransactionId::new();
    for (op, expected) in [
        (AggregateOp::Count, 5),
        (AggregateOp::Sum, 14),
        (AggregateOp::Max, 5),
        (AggregateOp::Min, 1),
    ] {
        let scan = SeqScan::new(db.buffer_pool(), tid, table_id, "t").unwrap();
        let mut agg = Aggregate::new(Box::new(scan), 0, None, op).unwrap();
        assert_eq!(collect_all(&mut agg).unwrap(), int_tuples(&[expected]), "{op}");
    }
    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

/// An aborted insert leaves no trace for later transactions.
#[test]
fn test_aborted_insert_is_invisible() {
    setup();
    let (db, _dir, table_id) = create_scratch_database(8, 1);

    let a = TransactionId::new();
    db.buffer_pool()
        .insert_tuple(a, table_id, int_tuples(&[9]).remove(0))
        .unwrap();
    db.buffer_pool().transaction_complete(a, false).unwrap();

    assert!(scan_table(&db, table_id).is_empty());
}

/// Abort purity over a non-empty table: re-scanning after the abort
/// yields the same multiset as before the transaction started.
#[test]
fn test_abort_restores_prior_contents() {
    setup();
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    populate_table(&db, table_id, int_tuples(&[10, 20, 30]));
    let before = scan_table(&db, table_id);

    let tid = TransactionId::new();
    let pool = db.buffer_pool();
    pool.insert_tuple(tid, table_id, int_tuples(&[40]).remove(0))
        .unwrap();
    let victim = {
        let file = db.catalog().get_file(table_id).unwrap();
        file.iterator(tid, pool).next().unwrap().unwrap()
    };
    pool.delete_tuple(tid, &victim).unwrap();
    pool.transaction_complete(tid, false).unwrap();

    assert_same_tuples(scan_table(&db, table_id), before);
}

/// A sole shared holder upgrades to exclusive; a second reader then
/// blocks until the holder commits, and succeeds afterwards.
#[test]
fn test_upgrade_blocks_reader_until_commit() {
    setup();
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    populate_table(&db, table_id, int_tuples(&[1]));
    let pool = db.buffer_pool();
    let pid = PageId::new(table_id, 0);

    let a = TransactionId::new();
    pool.get_page(a, pid, Permission::ReadOnly).unwrap();
    pool.get_page(a, pid, Permission::ReadWrite).unwrap();

    let b = TransactionId::new();
    let b_granted = AtomicBool::new(false);
    crossbeam::thread::scope(|s| {
        s.spawn(|_| {
            pool.get_page(b, pid, Permission::ReadOnly).unwrap();
            b_granted.store(true, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(50));
        assert!(!b_granted.load(Ordering::SeqCst), "reader ran before commit");
        pool.transaction_complete(a, true).unwrap();
    })
    .unwrap();

    assert!(b_granted.load(Ordering::SeqCst));
    pool.transaction_complete(b, true).unwrap();
}

/// Symmetric lock cycle: each transaction holds one page exclusively and
/// wants the other's. The wait timeout aborts at least one of them
/// quickly, and both commit after retrying.
#[test]
fn test_deadlock_resolved_by_timeout() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let db = Database::with_capacity_and_lock_timeout(8, Duration::from_millis(200));
    let first = crate::common::utility::create_heap_file(dir.path(), "first", 1);
    let second = crate::common::utility::create_heap_file(dir.path(), "second", 1);
    let first_id = db.catalog().add_table(first, "first", None).unwrap();
    let second_id = db.catalog().add_table(second, "second", None).unwrap();
    populate_table(&db, first_id, int_tuples(&[1]));
    populate_table(&db, second_id, int_tuples(&[2]));

    let pool = db.buffer_pool();
    let barrier = Barrier::new(2);
    let start = Instant::now();

    let run = |own: PageId, other: PageId| -> (usize, Option<Duration>) {
        let mut aborts = 0;
        let mut first_abort_at = None;
        let mut synchronize = true;
        loop {
            let tid = TransactionId::new();
            let attempt = pool.get_page(tid, own, Permission::ReadWrite).and_then(|_| {
                if synchronize {
                    // line both holders up so the first round truly deadlocks
                    barrier.wait();
                    synchronize = false;
                }
                pool.get_page(tid, other, Permission::ReadOnly)
            });
            match attempt {
                Ok(_) => {
                    pool.transaction_complete(tid, true).unwrap();
                    return (aborts, first_abort_at);
                }
                Err(Error::Abort) => {
                    aborts += 1;
                    first_abort_at.get_or_insert(start.elapsed());
                    pool.transaction_complete(tid, false).unwrap();
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    };

    let (p1, p2) = (PageId::new(first_id, 0), PageId::new(second_id, 0));
    let ((a_aborts, a_first), (b_aborts, b_first)) = crossbeam::thread::scope(|s| {
        let a = s.spawn(|_| run(p1, p2));
        let b = s.spawn(|_| run(p2, p1));
        (a.join().unwrap(), b.join().unwrap())
    })
    .unwrap();

    assert!(a_aborts + b_aborts >= 1, "no transaction was aborted");
    let first_abort = [a_first, b_first].into_iter().flatten().min().unwrap();
    assert!(
        first_abort < Duration::from_secs(1),
        "first abort took {first_abort:?}"
    );
}

/// Two writers inserting concurrently both commit (retrying on abort),
/// and the table ends up holding both inserts.
#[test]
fn test_concurrent_writers_serialize() {
    setup();
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    populate_table(&db, table_id, int_tuples(&[0]));
    let pool = db.buffer_pool();

    crossbeam::thread::scope(|s| {
        for value in [1, 2] {
            s.spawn(move |_| loop {
                let tid = TransactionId::new();
                match pool.insert_tuple(tid, table_id, int_tuples(&[value]).remove(0)) {
                    Ok(()) => {
                        pool.transaction_complete(tid, true).unwrap();
                        break;
                    }
                    Err(Error::Abort) => {
                        pool.transaction_complete(tid, false).unwrap();
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            });
        }
    })
    .unwrap();

    assert_same_tuples(scan_table(&db, table_id), int_tuples(&[0, 1, 2]));
}

/// Grouped SUM over (k, v) rows, order of groups unspecified.
#[test]
fn test_grouped_sum() {
    setup();
    let (db, _dir, table_id) = create_scratch_database(8, 2);
    populate_table(&db, table_id, pair_tuples(&[(1, 10), (1, 20), (2, 30)]));

    let tid = TransactionId::new();
    let scan = SeqScan::new(db.buffer_pool(), tid, table_id, "s").unwrap();
    let mut agg = Aggregate::new(Box::new(scan), 1, Some(0), AggregateOp::Sum).unwrap();
    let tuples = collect_all(&mut agg).unwrap();
    assert_same_tuples(tuples, pair_tuples(&[(1, 30), (2, 30)]));
    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

/// Committed work survives the cache: after commit and an explicit
/// re-read from disk, the data is present (NO STEAL / FORCE-on-commit).
#[test]
fn test_committed_data_is_on_disk() {
    setup();
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    populate_table(&db, table_id, int_tuples(&[11, 22]));

    let file = db.catalog().get_file(table_id).unwrap();
    let page = file.read_page(PageId::new(table_id, 0)).unwrap();
    let values: Vec<Field> = page
        .iter()
        .map(|t| t.get_field(0).unwrap().clone())
        .collect();
    assert_same_tuples(
        values.into_iter().map(|f| crate::storage::tuple::Tuple::new(vec![f])).collect(),
        int_tuples(&[11, 22]),
    );
}
