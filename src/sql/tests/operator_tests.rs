use crate::common::utility::create_scratch_database;
use crate::common::Error;
use crate::concurrency::TransactionId;
use crate::sql::execution::{
    Aggregate, AggregateOp, Delete, Filter, Insert, Join, JoinPredicate, Op, Operator, Predicate,
    Project, SeqScan, Values,
};
use crate::sql::tests::utility::{
    assert_same_tuples, collect_all, int_tuples, pair_tuples, populate_table, scan_table,
};
use crate::storage::tuple::Tuple;
use crate::types::field::Field;
use crate::types::{DataType, Schema};

#[test]
fn test_seq_scan_qualifies_columns() {
    let (db, _dir, table_id) = create_scratch_database(8, 2);
    populate_table(&db, table_id, pair_tuples(&[(1, 2), (3, 4)]));

    let tid = TransactionId::new();
    let mut scan = SeqScan::new(db.buffer_pool(), tid, table_id, "s").unwrap();
    assert_eq!(scan.schema().get_field_name(0), Some("s.test0"));
    assert_eq!(scan.schema().get_field_name(1), Some("s.test1"));

    let tuples = collect_all(&mut scan).unwrap();
    assert_same_tuples(tuples, pair_tuples(&[(1, 2), (3, 4)]));
    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_next_before_open_is_an_error() {
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    let tid = TransactionId::new();
    let mut scan = SeqScan::new(db.buffer_pool(), tid, table_id, "s").unwrap();
    assert!(matches!(scan.next(), Err(Error::InvalidState(_))));
    assert!(matches!(scan.rewind(), Err(Error::InvalidState(_))));
}

#[test]
fn test_scan_rewind_restarts() {
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    populate_table(&db, table_id, int_tuples(&[1, 2, 3]));

    let tid = TransactionId::new();
    let mut scan = SeqScan::new(db.buffer_pool(), tid, table_id, "s").unwrap();
    scan.open().unwrap();
    let first = scan.next().unwrap().unwrap();
    scan.rewind().unwrap();
    assert_eq!(scan.next().unwrap().unwrap(), first);
    scan.close();
    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_filter_keeps_matching_tuples() {
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    populate_table(&db, table_id, int_tuples(&[1, 5, 2, 8, 3]));

    let tid = TransactionId::new();
    let scan = SeqScan::new(db.buffer_pool(), tid, table_id, "s").unwrap();
    let mut filter = Filter::new(
        Predicate::new(0, Op::GreaterThan, Field::Integer(2)),
        Box::new(scan),
    );
    let tuples = collect_all(&mut filter).unwrap();
    assert_same_tuples(tuples, int_tuples(&[5, 8, 3]));
    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_project_selects_subfields() {
    let schema = Schema::from(vec![DataType::Int, DataType::Int]);
    let values = Values::new(schema, pair_tuples(&[(1, 10), (2, 20)])).unwrap();
    let mut project = Project::new(Box::new(values), vec![1]).unwrap();

    assert_eq!(project.schema().col_count(), 1);
    let tuples = collect_all(&mut project).unwrap();
    assert_eq!(tuples, int_tuples(&[10, 20]));
}

#[test]
fn test_project_rejects_bad_index() {
    let schema = Schema::from(vec![DataType::Int]);
    let values = Values::new(schema, vec![]).unwrap();
    assert!(Project::new(Box::new(values), vec![1]).is_err());
}

#[test]
fn test_join_emits_concatenated_matches() {
    let left_schema = Schema::from(vec![DataType::Int, DataType::Int]);
    let right_schema = Schema::from(vec![DataType::Int]);
    let left = Values::new(left_schema, pair_tuples(&[(1, 10), (2, 20), (3, 10)])).unwrap();
    let right = Values::new(right_schema, int_tuples(&[10, 30])).unwrap();

    let mut join = Join::new(
        JoinPredicate::new(1, Op::Equals, 0),
        Box::new(left),
        Box::new(right),
    );
    assert_eq!(join.schema().col_count(), 3);

    let tuples = collect_all(&mut join).unwrap();
    assert_eq!(
        tuples,
        vec![
            Tuple::new(vec![Field::Integer(1), Field::Integer(10), Field::Integer(10)]),
            Tuple::new(vec![Field::Integer(3), Field::Integer(10), Field::Integer(10)]),
        ]
    );
}

#[test]
fn test_join_over_tables_rewinds_right_scan() {
    let (db, dir, left_id) = create_scratch_database(16, 1);
    let right_file = crate::common::utility::create_heap_file(dir.path(), "right", 1);
    let right_id = db.catalog().add_table(right_file, "right", None).unwrap();

    populate_table(&db, left_id, int_tuples(&[1, 2, 3]));
    populate_table(&db, right_id, int_tuples(&[2, 3, 4]));

    let tid = TransactionId::new();
    let left = SeqScan::new(db.buffer_pool(), tid, left_id, "l").unwrap();
    let right = SeqScan::new(db.buffer_pool(), tid, right_id, "r").unwrap();
    let mut join = Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        Box::new(left),
        Box::new(right),
    );
    let tuples = collect_all(&mut join).unwrap();
    assert_same_tuples(tuples, pair_tuples(&[(2, 2), (3, 3)]));
    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_aggregate_operator_pipeline() {
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    populate_table(&db, table_id, int_tuples(&[3, 1, 4, 1, 5]));

    let tid = TransactionId::new();
    for (op, expected) in [
        (AggregateOp::Count, 5),
        (AggregateOp::Sum, 14),
        (AggregateOp::Max, 5),
        (AggregateOp::Min, 1),
        (AggregateOp::Avg, 2),
    ] {
        let scan = SeqScan::new(db.buffer_pool(), tid, table_id, "s").unwrap();
        let mut agg = Aggregate::new(Box::new(scan), 0, None, op).unwrap();
        let tuples = collect_all(&mut agg).unwrap();
        assert_eq!(tuples, int_tuples(&[expected]), "{op}");
    }
    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_aggregate_rewind_repeats_results() {
    let schema = Schema::from(vec![DataType::Int]);
    let values = Values::new(schema, int_tuples(&[1, 2, 3])).unwrap();
    let mut agg = Aggregate::new(Box::new(values), 0, None, AggregateOp::Sum).unwrap();

    agg.open().unwrap();
    assert_eq!(agg.next().unwrap().unwrap(), int_tuples(&[6])[0]);
    assert!(agg.next().unwrap().is_none());
    agg.rewind().unwrap();
    assert_eq!(agg.next().unwrap().unwrap(), int_tuples(&[6])[0]);
    agg.close();
}

#[test]
fn test_insert_reports_count_once() {
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    let tid = TransactionId::new();

    let schema = db.catalog().get_schema(table_id).unwrap();
    let values = Values::new((*schema).clone(), int_tuples(&[7, 8, 9])).unwrap();
    let mut insert = Insert::new(db.buffer_pool(), tid, Box::new(values), table_id).unwrap();

    insert.open().unwrap();
    assert_eq!(insert.next().unwrap().unwrap(), int_tuples(&[3])[0]);
    assert!(insert.next().unwrap().is_none());
    insert.close();
    db.buffer_pool().transaction_complete(tid, true).unwrap();

    assert_same_tuples(scan_table(&db, table_id), int_tuples(&[7, 8, 9]));
}

#[test]
fn test_insert_rejects_schema_mismatch() {
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    let tid = TransactionId::new();
    let values = Values::new(
        Schema::from(vec![DataType::Text]),
        vec![Tuple::new(vec![Field::from("x")])],
    )
    .unwrap();
    assert!(Insert::new(db.buffer_pool(), tid, Box::new(values), table_id).is_err());
}

#[test]
fn test_delete_through_filter() {
    let (db, _dir, table_id) = create_scratch_database(8, 1);
    populate_table(&db, table_id, int_tuples(&[1, 2, 3, 4, 5]));

    let tid = TransactionId::new();
    let scan = SeqScan::new(db.buffer_pool(), tid, table_id, "s").unwrap();
    let filter = Filter::new(
        Predicate::new(0, Op::GreaterThan, Field::Integer(3)),
        Box::new(scan),
    );
    let mut delete = Delete::new(db.buffer_pool(), tid, Box::new(filter));

    delete.open().unwrap();
    assert_eq!(delete.next().unwrap().unwrap(), int_tuples(&[2])[0]);
    assert!(delete.next().unwrap().is_none());
    delete.close();
    db.buffer_pool().transaction_complete(tid, true).unwrap();

    assert_same_tuples(scan_table(&db, table_id), int_tuples(&[1, 2, 3]));
}
