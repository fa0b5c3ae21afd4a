use crate::common::constants::NOT_OPEN_MSG;
use crate::common::{Error, Result};
use crate::errinput;
use crate::sql::execution::{Operator, Predicate};
use crate::storage::tuple::Tuple;
use crate::types::Schema;

/// Passes through the child's tuples that satisfy the predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn Operator>,
    open: bool,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn Operator>) -> Filter {
        Filter {
            predicate,
            child,
            open: false,
        }
    }
}

impl Operator for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        while let Some(tuple) = self.child.next()? {
            if self.predicate.filter(&tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
        self.open = false;
    }

    fn schema(&self) -> &Schema {
        self.child.schema()
    }
}

/// Emits the named subfields of the child's tuples, in the given order.
pub struct Project {
    child: Box<dyn Operator>,
    fields: Vec<usize>,
    schema: Schema,
    open: bool,
}

impl Project {
    pub fn new(child: Box<dyn Operator>, fields: Vec<usize>) -> Result<Project> {
        let input = child.schema();
        let columns = fields
            .iter()
            .map(|&i| {
                if i >= input.col_count() {
                    return errinput!("projected field index {i} out of bounds for {input}");
                }
                Ok(input.get_column(i).clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Project {
            child,
            fields,
            schema: Schema::new(columns),
            open: false,
        })
    }
}

impl Operator for Project {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        let Some(tuple) = self.child.next()? else {
            return Ok(None);
        };
        let fields = self
            .fields
            .iter()
            .map(|&i| tuple.get_field(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Tuple::new(fields)))
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
        self.open = false;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
