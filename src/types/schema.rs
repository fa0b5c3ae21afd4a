use crate::common::Result;
use crate::config::config::STRING_FIELD_BYTES;
use crate::errinput;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The data type of a column. Every type has a fixed encoded width, which
/// keeps page slot arithmetic trivial.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Text,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Text => write!(f, "string"),
        }
    }
}

impl DataType {
    /// Encoded width in bytes of a field of this type.
    pub fn length_bytes(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Text => STRING_FIELD_BYTES,
        }
    }

    /// Parses a schema-file type token, case-insensitively.
    pub fn from_token(token: &str) -> Result<DataType> {
        match token.to_ascii_lowercase().as_str() {
            "int" => Ok(DataType::Int),
            "string" => Ok(DataType::Text),
            _ => errinput!("unknown column type '{token}'"),
        }
    }
}

/// A single column of a schema: a data type with an optional name.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct Column {
    name: Option<String>,
    data_type: DataType,
}

impl Column {
    pub fn new(name: &str, data_type: DataType) -> Column {
        Column {
            name: Some(name.to_string()),
            data_type,
        }
    }

    pub fn anonymous(data_type: DataType) -> Column {
        Column {
            name: None,
            data_type,
        }
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_data_type(&self) -> DataType {
        self.data_type
    }

    pub fn length_bytes(&self) -> usize {
        self.data_type.length_bytes()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name.as_deref().unwrap_or("?"), self.data_type)
    }
}

impl From<DataType> for Column {
    fn from(data_type: DataType) -> Column {
        Column::anonymous(data_type)
    }
}

/// An ordered tuple descriptor. Two schemas are equal iff their type
/// sequences are equal; column names are ignored for equality.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.get_data_type() == b.get_data_type())
    }
}

impl Eq for Schema {}

impl From<Vec<DataType>> for Schema {
    fn from(types: Vec<DataType>) -> Schema {
        Schema::new(types.into_iter().map(Column::from).collect())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.columns.iter().map(|c| c.to_string()).join(", "))
    }
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Schema {
        Schema { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    pub fn get_column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn get_field_type(&self, index: usize) -> DataType {
        self.columns[index].get_data_type()
    }

    pub fn get_field_name(&self, index: usize) -> Option<&str> {
        self.columns[index].get_name()
    }

    /// Returns the index of the named column, or `None` when absent.
    pub fn field_name_to_index(&self, field_name: Option<&str>) -> Option<usize> {
        let name = field_name?;
        self.columns.iter().position(|c| c.get_name() == Some(name))
    }

    /// Encoded width in bytes of one tuple under this schema.
    pub fn size(&self) -> usize {
        self.columns.iter().map(|c| c.length_bytes()).sum()
    }

    /// Concatenates two schemas, left columns first.
    pub fn merge(left: &Schema, right: &Schema) -> Schema {
        let mut columns = left.columns.clone();
        columns.extend(right.columns.iter().cloned());
        Schema::new(columns)
    }

    /// Returns a copy of the schema with every named column qualified as
    /// `alias.name`. Anonymous columns stay anonymous.
    pub fn qualified(&self, alias: &str) -> Schema {
        let columns = self
            .columns
            .iter()
            .map(|c| match c.get_name() {
                Some(name) => Column::new(&format!("{alias}.{name}"), c.get_data_type()),
                None => Column::anonymous(c.get_data_type()),
            })
            .collect();
        Schema::new(columns)
    }
}
