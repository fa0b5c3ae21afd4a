use itertools::Itertools;
use log::info;
use minnowdb::common::Result;
use minnowdb::concurrency::TransactionId;
use minnowdb::config::config::Settings;
use minnowdb::sql::execution::{Operator, SeqScan};
use minnowdb::storage::Database;
use minnowdb::types::Schema;
use std::path::Path;
use std::time::Duration;

/// A demo shim around the library: load a schema file, sequentially scan
/// one table, and print its tuples.
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let [_, schema_path, table] = args.as_slice() else {
        eprintln!("usage: minnowdb <schema-file> <table-name>");
        std::process::exit(2);
    };

    let settings = Settings::load()?;
    let db = Database::with_capacity_and_lock_timeout(
        settings.pool_capacity,
        Duration::from_millis(settings.lock_timeout_ms),
    );
    db.catalog().load_schema(Path::new(schema_path))?;
    let table_id = db.catalog().get_table_id(table)?;

    let tid = TransactionId::new();
    let mut scan = SeqScan::new(db.buffer_pool(), tid, table_id, table)?;
    print_columns(scan.schema());

    scan.open()?;
    let mut count = 0usize;
    while let Some(tuple) = scan.next()? {
        println!("  {tuple}");
        count += 1;
    }
    scan.close();
    db.buffer_pool().transaction_complete(tid, true)?;

    info!("scanned {count} tuples from '{table}'");
    Ok(())
}

fn print_columns(schema: &Schema) {
    println!(
        "  [{}]",
        schema.columns().iter().map(|c| c.to_string()).join(", ")
    );
}
