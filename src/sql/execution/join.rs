use crate::common::constants::NOT_OPEN_MSG;
use crate::common::{Error, Result};
use crate::sql::execution::{JoinPredicate, Operator};
use crate::storage::tuple::Tuple;
use crate::types::Schema;

/// A nested-loop join: for every left tuple the right child is streamed
/// from the start, and each matching pair is emitted as the concatenation
/// of the two tuples. The right child's `rewind` makes the restart cheap
/// when its pages are already cached.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    schema: Schema,
    current_left: Option<Tuple>,
    open: bool,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn Operator>,
        right: Box<dyn Operator>,
    ) -> Join {
        let schema = Schema::merge(left.schema(), right.schema());
        Join {
            predicate,
            left,
            right,
            schema,
            current_left: None,
            open: false,
        }
    }
}

impl Operator for Join {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = self.left.next()?;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        loop {
            let Some(left) = self.current_left.clone() else {
                return Ok(None);
            };
            while let Some(right) = self.right.next()? {
                if self.predicate.filter(&left, &right)? {
                    let fields = left
                        .fields()
                        .iter()
                        .chain(right.fields().iter())
                        .cloned()
                        .collect();
                    return Ok(Some(Tuple::new(fields)));
                }
            }
            // exhausted the right side for this left tuple; advance
            self.right.rewind()?;
            self.current_left = self.left.next()?;
        }
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = self.left.next()?;
        Ok(())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.current_left = None;
        self.open = false;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
