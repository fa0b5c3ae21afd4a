//! The execution operators. Every operator follows the same pull-based
//! contract: `open` it, pull tuples with `next` until `None`, optionally
//! `rewind` back to the start, and `close` it when done. Operators own
//! their children, so closing the root tears down the whole pipeline.
mod aggregate;
mod join;
mod predicate;
mod source;
mod transform;
mod write;

pub use aggregate::{Aggregate, AggregateOp, Aggregator};
pub use join::Join;
pub use predicate::{JoinPredicate, Op, Predicate};
pub use source::{SeqScan, Values};
pub use transform::{Filter, Project};
pub use write::{Delete, Insert};

use crate::common::Result;
use crate::storage::tuple::Tuple;
use crate::types::Schema;

/// A pull-based execution operator.
///
/// All mutation flows through operators and thus through the buffer pool,
/// keeping locking and the dirty-page lifecycle in force for every tuple
/// touched.
pub trait Operator {
    /// Acquires the operator's resources. Must be called before `next`.
    fn open(&mut self) -> Result<()>;

    /// Returns the next tuple, or `None` once the stream is exhausted.
    fn next(&mut self) -> Result<Option<Tuple>>;

    /// Resets the stream back to its start.
    fn rewind(&mut self) -> Result<()>;

    /// Releases the operator's resources, including its children's.
    fn close(&mut self);

    /// The schema of the tuples the operator emits.
    fn schema(&self) -> &Schema;
}
