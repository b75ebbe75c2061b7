//! Decoded views over packed record bytes.

use crate::error::{ClientError, Result};
use crate::schema::{Column, Schema};
use crate::types::{DataType, Value};
use std::borrow::Cow;

/// One field of a record: a typed view over a sub-slice of the record buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    index: usize,
    data_type: DataType,
    data: &'a [u8],
}

impl<'a> Field<'a> {
    /// Returns the column index of this field.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the data type of this field.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the raw bytes of this field.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Decodes the field into a native value.
    pub fn unpack(&self) -> Result<Value> {
        self.data_type.unpack(self.data)
    }
}

/// A record decoded with a [`Schema`].
///
/// The buffer is either borrowed from a larger buffer (a result page, a batch
/// block) or owned. Fields are computed from the schema's column offsets on
/// access; the buffer is never copied.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    schema: &'a Schema,
    data: Cow<'a, [u8]>,
    log_offset: Option<u64>,
}

impl<'a> Record<'a> {
    pub(crate) fn new(schema: &'a Schema, data: Cow<'a, [u8]>) -> Result<Self> {
        if data.len() != schema.record_size() {
            return Err(ClientError::DecodingError(format!(
                "record buffer has {} bytes, schema requires {}",
                data.len(),
                schema.record_size()
            )));
        }
        Ok(Self {
            schema,
            data,
            log_offset: None,
        })
    }

    /// Attaches the log offset the record was read from.
    pub fn with_log_offset(mut self, offset: u64) -> Self {
        self.log_offset = Some(offset);
        self
    }

    /// Returns the log offset the record was read from, if known.
    pub fn log_offset(&self) -> Option<u64> {
        self.log_offset
    }

    /// Returns the log version made visible by this record (offset + size).
    pub fn version(&self) -> Option<u64> {
        self.log_offset.map(|o| o + self.data.len() as u64)
    }

    /// Returns the schema this record was decoded with.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Returns the raw record bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns true if the record borrows its buffer.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }

    /// Converts into a record that owns its buffer.
    pub fn into_owned(self) -> Record<'a> {
        Record {
            schema: self.schema,
            data: Cow::Owned(self.data.into_owned()),
            log_offset: self.log_offset,
        }
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.schema.columns().len()
    }

    /// Returns true if the record has no fields. Never true for a valid schema.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the field at `index`.
    pub fn at(&self, index: usize) -> Option<Field<'_>> {
        self.schema.column(index).map(|c| self.field_for(c))
    }

    /// Returns the field for the column named `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Field<'_>> {
        self.schema.column_by_name(name).map(|c| self.field_for(c))
    }

    /// Iterates over all fields in column order.
    pub fn fields(&self) -> impl Iterator<Item = Field<'_>> + '_ {
        self.schema.columns().iter().map(move |c| self.field_for(c))
    }

    /// Decodes all fields into native values, timestamp first.
    pub fn values(&self) -> Result<Vec<Value>> {
        self.fields().map(|f| f.unpack()).collect()
    }

    /// Renders all fields as text, timestamp first.
    ///
    /// STRING fields drop their zero padding. See [`DataType::format_value`].
    pub fn to_strings(&self) -> Result<Vec<String>> {
        self.fields()
            .map(|f| f.data_type.format_value(f.data))
            .collect()
    }

    /// Returns the record timestamp (column 0).
    pub fn timestamp(&self) -> u64 {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&self.data[..8]);
        u64::from_ne_bytes(ts)
    }

    fn field_for(&self, column: &Column) -> Field<'_> {
        let start = column.offset();
        Field {
            index: column.index(),
            data_type: column.data_type(),
            data: &self.data[start..start + column.data_type().size()],
        }
    }
}
