use crate::common::constants::SCHEMA_MISMATCH_MSG;
use crate::common::{Error, Result};
use crate::errinput;
use crate::storage::page::RecordId;
use crate::types::field::Field;
use crate::types::Schema;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A tuple: an ordered run of field values, plus the record id assigned
/// once the tuple has been placed on a page.
///
/// Equality compares field values only; two tuples with the same fields are
/// equal regardless of where (or whether) they are stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tuple {
    fields: Vec<Field>,
    rid: Option<RecordId>,
}

impl From<Vec<Field>> for Tuple {
    fn from(fields: Vec<Field>) -> Self {
        Tuple::new(fields)
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Tuple {}

impl std::fmt::Display for Tuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fields.iter().map(|v| v.to_string()).join(", "))
    }
}

impl Tuple {
    pub fn new(fields: Vec<Field>) -> Tuple {
        Tuple { fields, rid: None }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get_field(&self, index: usize) -> Result<&Field> {
        match self.fields.get(index) {
            Some(field) => Ok(field),
            None => errinput!("field index {index} out of bounds"),
        }
    }

    /// Replaces the field at `index`. The new value must keep the type the
    /// tuple already has at that position.
    pub fn set_field(&mut self, index: usize, new: Field) -> Result<()> {
        let field = self
            .fields
            .get_mut(index)
            .ok_or_else(|| Error::InvalidInput(format!("field index {index} out of bounds")))?;
        if field.get_type() != new.get_type() {
            return errinput!("cannot set {} field to {}", field.get_type(), new.get_type());
        }
        *field = new;
        Ok(())
    }

    pub fn rid(&self) -> Option<&RecordId> {
        self.rid.as_ref()
    }

    pub fn set_rid(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    /// Returns whether the tuple's field types match the schema in order.
    pub fn matches_schema(&self, schema: &Schema) -> bool {
        self.fields.len() == schema.col_count()
            && self
                .fields
                .iter()
                .enumerate()
                .all(|(i, field)| field.get_type() == schema.get_field_type(i))
    }

    /// Serializes the tuple into `schema.size()` bytes, fields concatenated
    /// in order at their fixed widths.
    pub fn serialize(&self, schema: &Schema) -> Result<Vec<u8>> {
        if !self.matches_schema(schema) {
            return Err(Error::InvalidData(SCHEMA_MISMATCH_MSG.to_string()));
        }
        let mut data = Vec::with_capacity(schema.size());
        for field in &self.fields {
            data.extend(field.serialize());
        }
        Ok(data)
    }

    /// Decodes a tuple from exactly `schema.size()` bytes.
    pub fn deserialize(data: &[u8], schema: &Schema) -> Result<Tuple> {
        if data.len() != schema.size() {
            return Err(Error::InvalidData(format!(
                "tuple must be {} bytes under {}, got {}",
                schema.size(),
                schema,
                data.len()
            )));
        }
        let mut fields = Vec::with_capacity(schema.col_count());
        let mut cursor = 0;
        for column in schema.columns() {
            let width = column.length_bytes();
            fields.push(Field::deserialize(
                &data[cursor..cursor + width],
                column.get_data_type(),
            )?);
            cursor += width;
        }
        Ok(Tuple::new(fields))
    }
}
