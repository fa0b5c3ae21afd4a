use crate::common::{Error, Result};
use crate::config::config::{MAX_STRING_LEN, STRING_FIELD_BYTES};
use crate::errdata;
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// A field value held by a tuple. Text content is bounded by
/// [`MAX_STRING_LEN`]; longer strings are truncated on construction so the
/// in-memory value always round-trips through the fixed-width encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Integer(i32),
    Text(String),
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Integer(v)
    }
}

impl From<String> for Field {
    fn from(mut v: String) -> Self {
        v.truncate(MAX_STRING_LEN);
        Field::Text(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::from(v.to_owned())
    }
}

impl Ord for Field {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Field::Integer(a), Field::Integer(b)) => a.cmp(b),
            (Field::Text(a), Field::Text(b)) => a.cmp(b),
            (Field::Integer(_), Field::Text(_)) => std::cmp::Ordering::Less,
            (Field::Text(_), Field::Integer(_)) => std::cmp::Ordering::Greater,
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Integer(i) => i.fmt(f),
            Field::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Field {
    pub fn get_type(&self) -> DataType {
        match self {
            Field::Integer(_) => DataType::Int,
            Field::Text(_) => DataType::Text,
        }
    }

    /// Encoded width in bytes, fixed per data type.
    pub fn get_size(&self) -> usize {
        self.get_type().length_bytes()
    }

    /// Serializes the field into its fixed-width big-endian encoding.
    ///
    /// Integers are 4-byte big-endian two's complement. Text is a 4-byte
    /// big-endian content length followed by exactly [`MAX_STRING_LEN`]
    /// bytes, zero-padded past the content.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Field::Integer(i) => i.to_be_bytes().to_vec(),
            Field::Text(s) => {
                let content = s.as_bytes();
                let mut data = vec![0u8; STRING_FIELD_BYTES];
                data[0..4].copy_from_slice(&(content.len() as u32).to_be_bytes());
                data[4..4 + content.len()].copy_from_slice(content);
                data
            }
        }
    }

    /// Decodes a field of the given type from its fixed-width encoding.
    pub fn deserialize(data: &[u8], data_type: DataType) -> Result<Field> {
        if data.len() != data_type.length_bytes() {
            return errdata!(
                "field of type {} must be {} bytes, got {}",
                data_type,
                data_type.length_bytes(),
                data.len()
            );
        }
        match data_type {
            DataType::Int => {
                let bytes: [u8; 4] = data.try_into().expect("length checked above");
                Ok(Field::Integer(i32::from_be_bytes(bytes)))
            }
            DataType::Text => {
                let len_bytes: [u8; 4] = data[0..4].try_into().expect("length checked above");
                let len = u32::from_be_bytes(len_bytes) as usize;
                if len > MAX_STRING_LEN {
                    return errdata!("text length {} exceeds maximum {}", len, MAX_STRING_LEN);
                }
                let content = String::from_utf8(data[4..4 + len].to_vec())
                    .map_err(|e| Error::InvalidData(format!("text is not utf-8: {e}")))?;
                Ok(Field::Text(content))
            }
        }
    }
}
