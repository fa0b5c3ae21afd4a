use crate::common::constants::{NOT_OPEN_MSG, SCHEMA_MISMATCH_MSG};
use crate::common::{Error, Result};
use crate::concurrency::TransactionId;
use crate::sql::execution::Operator;
use crate::storage::buffer::BufferPool;
use crate::storage::tuple::Tuple;
use crate::types::field::Field;
use crate::types::{Column, DataType, Schema};
use std::sync::Arc;

fn count_schema() -> Schema {
    Schema::new(vec![Column::new("count", DataType::Int)])
}

/// Consumes its child and inserts every tuple into the table through the
/// buffer pool, so the writes are locked and dirtied properly. Emits a
/// single one-field tuple holding the insert count, then `None`.
pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: i32,
    child: Box<dyn Operator>,
    schema: Schema,
    open: bool,
    done: bool,
}

impl Insert {
    pub fn new(
        pool: &Arc<BufferPool>,
        tid: TransactionId,
        child: Box<dyn Operator>,
        table_id: i32,
    ) -> Result<Insert> {
        let table_schema = pool.catalog().get_schema(table_id)?;
        if *child.schema() != *table_schema {
            return Err(Error::InvalidData(SCHEMA_MISMATCH_MSG.to_string()));
        }
        Ok(Insert {
            pool: Arc::clone(pool),
            tid,
            table_id,
            child,
            schema: count_schema(),
            open: false,
            done: false,
        })
    }
}

impl Operator for Insert {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.open = true;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        if self.done {
            return Ok(None);
        }
        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            self.pool.insert_tuple(self.tid, self.table_id, tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(vec![Field::Integer(count)])))
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.open = false;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Consumes its child and deletes every tuple it emits through the buffer
/// pool, using the record ids the scan below attached. Emits a single
/// one-field tuple holding the delete count, then `None`.
pub struct Delete {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn Operator>,
    schema: Schema,
    open: bool,
    done: bool,
}

impl Delete {
    pub fn new(pool: &Arc<BufferPool>, tid: TransactionId, child: Box<dyn Operator>) -> Delete {
        Delete {
            pool: Arc::clone(pool),
            tid,
            child,
            schema: count_schema(),
            open: false,
            done: false,
        }
    }
}

impl Operator for Delete {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.open = true;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        if self.done {
            return Ok(None);
        }
        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            self.pool.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(vec![Field::Integer(count)])))
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.open = false;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
