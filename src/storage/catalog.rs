use crate::common::constants::{NO_SUCH_TABLE_MSG, NO_SUCH_TABLE_NAME_MSG};
use crate::common::{Error, Result};
use crate::errinput;
use crate::storage::heap::HeapFile;
use crate::types::{Column, DataType, Schema};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// One registered table: its heap file, name, and optional primary key
/// column.
#[derive(Clone, Debug)]
pub struct TableInfo {
    file: Arc<HeapFile>,
    name: String,
    primary_key: Option<String>,
}

impl TableInfo {
    pub fn file(&self) -> &Arc<HeapFile> {
        &self.file
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }
}

/// The table registry, mapping table ids and names to heap files. Tables
/// are added at runtime; registering a table under an existing name
/// rebinds the name (last write wins) while the old table stays reachable
/// by id.
#[derive(Debug, Default)]
pub struct Catalog {
    inner: RwLock<CatalogInner>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    tables: HashMap<i32, TableInfo>,
    names: HashMap<String, i32>,
}

/// One table per line: `Name (col type[, col type[ pk]]...)`.
static SCHEMA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w+)\s*\((.*)\)\s*$").expect("schema line pattern is valid"));

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    /// Registers a table, returning its id.
    pub fn add_table(
        &self,
        file: Arc<HeapFile>,
        name: &str,
        primary_key: Option<&str>,
    ) -> Result<i32> {
        let id = file.id();
        let mut inner = self.inner.write()?;
        inner.names.insert(name.to_string(), id);
        inner.tables.insert(
            id,
            TableInfo {
                file,
                name: name.to_string(),
                primary_key: primary_key.map(|pk| pk.to_string()),
            },
        );
        Ok(id)
    }

    pub fn get_table(&self, table_id: i32) -> Result<TableInfo> {
        self.inner
            .read()?
            .tables
            .get(&table_id)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("{NO_SUCH_TABLE_MSG} ({table_id})")))
    }

    pub fn get_file(&self, table_id: i32) -> Result<Arc<HeapFile>> {
        Ok(Arc::clone(self.get_table(table_id)?.file()))
    }

    pub fn get_schema(&self, table_id: i32) -> Result<Arc<Schema>> {
        Ok(Arc::clone(self.get_table(table_id)?.file().schema()))
    }

    pub fn get_table_id(&self, name: &str) -> Result<i32> {
        self.inner
            .read()?
            .names
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidInput(format!("{NO_SUCH_TABLE_NAME_MSG} ({name})")))
    }

    pub fn table_ids(&self) -> Result<Vec<i32>> {
        Ok(self.inner.read()?.tables.keys().copied().collect())
    }

    /// Loads a schema file, creating or opening `<dir>/<Name>.dat` next to
    /// it for each table line. Returns the ids of the loaded tables; any
    /// invalid line aborts the load.
    pub fn load_schema(&self, schema_path: &Path) -> Result<Vec<i32>> {
        let contents = std::fs::read_to_string(schema_path)?;
        let dir = schema_path.parent().unwrap_or_else(|| Path::new("."));

        let mut ids = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let caps = SCHEMA_LINE
                .captures(line)
                .ok_or_else(|| Error::InvalidInput(format!("invalid schema line '{line}'")))?;
            let name = &caps[1];
            let (schema, primary_key) = parse_columns(&caps[2])?;

            let file = HeapFile::new(&dir.join(format!("{name}.dat")), schema)?;
            let id = self.add_table(Arc::new(file), name, primary_key.as_deref())?;
            info!("loaded table '{name}' as {id}");
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Parses the parenthesized column list of a schema line.
fn parse_columns(spec: &str) -> Result<(Schema, Option<String>)> {
    let mut columns = Vec::new();
    let mut primary_key = None;

    for part in spec.split(',') {
        let tokens: Vec<&str> = part.split_whitespace().collect();
        match tokens.as_slice() {
            [name, data_type] => columns.push(Column::new(name, DataType::from_token(data_type)?)),
            [name, data_type, pk] if pk.eq_ignore_ascii_case("pk") => {
                columns.push(Column::new(name, DataType::from_token(data_type)?));
                primary_key = Some(name.to_string());
            }
            _ => return errinput!("invalid column declaration '{}'", part.trim()),
        }
    }
    Ok((Schema::new(columns), primary_key))
}
