use crate::common::constants::NOT_OPEN_MSG;
use crate::common::{Error, Result};
use crate::concurrency::TransactionId;
use crate::sql::execution::Operator;
use crate::storage::buffer::BufferPool;
use crate::storage::heap::HeapFileIterator;
use crate::storage::tuple::Tuple;
use crate::types::Schema;
use std::sync::Arc;

/// Sequential scan over one table, the leaf of every pipeline. Pages are
/// pulled read-only through the buffer pool, and the emitted schema has
/// every column qualified by the scan's alias.
pub struct SeqScan {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: i32,
    schema: Schema,
    iter: Option<HeapFileIterator>,
}

impl SeqScan {
    pub fn new(
        pool: &Arc<BufferPool>,
        tid: TransactionId,
        table_id: i32,
        alias: &str,
    ) -> Result<SeqScan> {
        let schema = pool.catalog().get_schema(table_id)?.qualified(alias);
        Ok(SeqScan {
            pool: Arc::clone(pool),
            tid,
            table_id,
            schema,
            iter: None,
        })
    }

    fn fresh_iterator(&self) -> Result<HeapFileIterator> {
        let file = self.pool.catalog().get_file(self.table_id)?;
        Ok(file.iterator(self.tid, &self.pool))
    }
}

/// Emits a predefined list of tuples. The usual source below an `Insert`,
/// and handy as a leaf in tests.
pub struct Values {
    schema: Schema,
    rows: Vec<Tuple>,
    cursor: usize,
    open: bool,
}

impl Values {
    pub fn new(schema: Schema, rows: Vec<Tuple>) -> Result<Values> {
        for row in &rows {
            if !row.matches_schema(&schema) {
                return Err(Error::InvalidData(format!(
                    "value tuple ({row}) does not match {schema}"
                )));
            }
        }
        Ok(Values {
            schema,
            rows,
            cursor: 0,
            open: false,
        })
    }
}

impl Operator for Values {
    fn open(&mut self) -> Result<()> {
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        match self.rows.get(self.cursor) {
            Some(row) => {
                self.cursor += 1;
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Operator for SeqScan {
    fn open(&mut self) -> Result<()> {
        self.iter = Some(self.fresh_iterator()?);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        match self.iter.as_mut() {
            Some(iter) => iter.next().transpose(),
            None => Err(Error::InvalidState(NOT_OPEN_MSG.to_string())),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        if self.iter.is_none() {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        self.iter = Some(self.fresh_iterator()?);
        Ok(())
    }

    fn close(&mut self) {
        self.iter = None;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
