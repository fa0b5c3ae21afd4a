use crate::config::config::MAX_STRING_LEN;
use crate::storage::heap::HeapFile;
use crate::storage::Database;
use crate::types::field::Field;
use crate::types::{Column, DataType, Schema};
use rand::{random, Rng};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::path::Path;
use std::sync::Arc;

/// Builds a schema of `num_columns` int columns named `prefix0..prefixN`.
pub fn create_table_definition(num_columns: usize, prefix: &str) -> Schema {
    let columns = (0..num_columns)
        .map(|i| Column::new(&format!("{prefix}{i}"), DataType::Int))
        .collect();
    Schema::new(columns)
}

/// Builds a random field of the given type from a seeded generator.
pub fn create_random_field(rng: &mut ChaCha8Rng, data_type: DataType) -> Field {
    match data_type {
        DataType::Int => Field::from(rng.gen_range(-1000..1000)),
        DataType::Text => {
            let len = rng.gen_range(0..MAX_STRING_LEN);
            let s: String = (0..len)
                .map(|_| rng.gen_range(33u8..123) as char) // printable ascii
                .collect();
            Field::from(s)
        }
    }
}

/// Builds a random tuple under the schema. Passing the same seed produces
/// the same tuple; `None` draws a fresh seed.
pub fn create_random_tuple(schema: &Schema, seed: Option<u64>) -> crate::storage::tuple::Tuple {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(random));
    let fields = schema
        .columns()
        .iter()
        .map(|c| create_random_field(&mut rng, c.get_data_type()))
        .collect();
    crate::storage::tuple::Tuple::new(fields)
}

/// Creates an empty heap file `<dir>/<name>.dat` with int columns.
pub fn create_heap_file(dir: &Path, name: &str, num_columns: usize) -> Arc<HeapFile> {
    let schema = create_table_definition(num_columns, name);
    Arc::new(
        HeapFile::new(&dir.join(format!("{name}.dat")), schema)
            .expect("creating scratch heap file"),
    )
}

/// Creates a scratch database over a temp directory with one registered
/// int-column table. Returns the database, the directory guard, and the
/// table id.
pub fn create_scratch_database(
    capacity: usize,
    num_columns: usize,
) -> (Database, tempfile::TempDir, i32) {
    let dir = tempfile::tempdir().expect("creating scratch directory");
    let db = Database::with_capacity(capacity);
    let file = create_heap_file(dir.path(), "test", num_columns);
    let id = db
        .catalog()
        .add_table(file, "test", None)
        .expect("registering scratch table");
    (db, dir, id)
}
