use crate::common::constants::{ILLEGAL_AGGREGATE_MSG, NOT_OPEN_MSG};
use crate::common::{Error, Result};
use crate::errinput;
use crate::sql::execution::Operator;
use crate::storage::tuple::Tuple;
use crate::types::field::Field;
use crate::types::{Column, DataType, Schema};
use std::collections::BTreeMap;

/// An aggregate operator kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl std::fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{name}")
    }
}

/// Running state sufficient to produce one aggregate value in a single
/// pass. Sums and averages accumulate in i64 so intermediate totals never
/// overflow; the emitted value is truncated back to i32 two's complement.
#[derive(Clone, Debug)]
enum Accumulator {
    Min(Option<i32>),
    Max(Option<i32>),
    Sum(i64),
    Avg { sum: i64, count: i64 },
    Count(i64),
}

impl Accumulator {
    fn new(op: AggregateOp) -> Accumulator {
        match op {
            AggregateOp::Min => Accumulator::Min(None),
            AggregateOp::Max => Accumulator::Max(None),
            AggregateOp::Sum => Accumulator::Sum(0),
            AggregateOp::Avg => Accumulator::Avg { sum: 0, count: 0 },
            AggregateOp::Count => Accumulator::Count(0),
        }
    }

    fn add(&mut self, value: &Field) -> Result<()> {
        if let Accumulator::Count(count) = self {
            *count += 1;
            return Ok(());
        }
        let Field::Integer(v) = value else {
            return Err(Error::InvalidInput(ILLEGAL_AGGREGATE_MSG.to_string()));
        };
        match self {
            Accumulator::Min(min) => *min = Some(min.map_or(*v, |m| m.min(*v))),
            Accumulator::Max(max) => *max = Some(max.map_or(*v, |m| m.max(*v))),
            Accumulator::Sum(sum) => *sum += *v as i64,
            Accumulator::Avg { sum, count } => {
                *sum += *v as i64;
                *count += 1;
            }
            Accumulator::Count(_) => unreachable!("counts returned above"),
        }
        Ok(())
    }

    fn value(&self) -> Field {
        let v = match self {
            Accumulator::Min(min) => min.unwrap_or(0),
            Accumulator::Max(max) => max.unwrap_or(0),
            Accumulator::Sum(sum) => *sum as i32,
            Accumulator::Avg { sum, count } if *count > 0 => (sum / count) as i32,
            Accumulator::Avg { .. } => 0,
            Accumulator::Count(count) => *count as i32,
        };
        Field::Integer(v)
    }
}

/// Computes one aggregate over a tuple stream, optionally bucketed by a
/// grouping field. Integer columns support all five operators; text
/// columns support only COUNT.
pub struct Aggregator {
    op: AggregateOp,
    afield: usize,
    gfield: Option<usize>,
    buckets: BTreeMap<Option<Field>, Accumulator>,
}

impl Aggregator {
    pub fn new(op: AggregateOp, afield: usize, gfield: Option<usize>) -> Aggregator {
        Aggregator {
            op,
            afield,
            gfield,
            buckets: BTreeMap::new(),
        }
    }

    /// Folds one tuple into its group's accumulator.
    pub fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let value = tuple.get_field(self.afield)?.clone();
        let key = match self.gfield {
            Some(g) => Some(tuple.get_field(g)?.clone()),
            None => None,
        };
        self.buckets
            .entry(key)
            .or_insert_with(|| Accumulator::new(self.op))
            .add(&value)
    }

    /// Materializes the per-group results: `(group, value)` tuples when
    /// grouped, a single one-field tuple otherwise.
    pub fn into_tuples(self) -> Vec<Tuple> {
        let grouped = self.gfield.is_some();
        self.buckets
            .into_iter()
            .map(|(key, acc)| match (grouped, key) {
                (true, Some(group)) => Tuple::new(vec![group, acc.value()]),
                _ => Tuple::new(vec![acc.value()]),
            })
            .collect()
    }
}

/// The aggregation operator: drains its child on `open`, then emits one
/// tuple per group (or a single tuple when ungrouped).
pub struct Aggregate {
    child: Box<dyn Operator>,
    op: AggregateOp,
    afield: usize,
    gfield: Option<usize>,
    schema: Schema,
    results: Vec<Tuple>,
    cursor: usize,
    open: bool,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn Operator>,
        afield: usize,
        gfield: Option<usize>,
        op: AggregateOp,
    ) -> Result<Aggregate> {
        let input = child.schema();
        if afield >= input.col_count() {
            return errinput!("aggregate field index {afield} out of bounds for {input}");
        }
        if let Some(g) = gfield {
            if g >= input.col_count() {
                return errinput!("group field index {g} out of bounds for {input}");
            }
        }

        let agg_name = match input.get_field_name(afield) {
            Some(name) => format!("{op}({name})"),
            None => format!("{op}"),
        };
        let mut columns = Vec::new();
        if let Some(g) = gfield {
            columns.push(input.get_column(g).clone());
        }
        columns.push(Column::new(&agg_name, DataType::Int));

        Ok(Aggregate {
            child,
            op,
            afield,
            gfield,
            schema: Schema::new(columns),
            results: Vec::new(),
            cursor: 0,
            open: false,
        })
    }
}

impl Operator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        let mut aggregator = Aggregator::new(self.op, self.afield, self.gfield);
        while let Some(tuple) = self.child.next()? {
            aggregator.merge(&tuple)?;
        }
        self.results = aggregator.into_tuples();
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.open {
            return Err(Error::InvalidState(NOT_OPEN_MSG.to_string()));
        }
        match self.results.get(self.cursor) {
            Some(tuple) => {
                self.cursor += 1;
                Ok(Some(tuple.clone()))
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
        self.child.close();
        self.results.clear();
        self.open = false;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
