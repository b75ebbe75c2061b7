//! Record layout: columns, schema builder and schema.
//!
//! A schema is an ordered list of fixed-width columns. Column 0 is always the
//! implicit `TIMESTAMP` column (ULONG, offset 0, width 8), injected by the
//! [`SchemaBuilder`].
//!
//! ## Record Layout
//!
//! ```text
//! ┌──────────────┬──────────────┬─────┬──────────────┐
//! │ TIMESTAMP u64│ column 1     │ ... │ column n     │
//! │ bytes 0..8   │ fixed width  │     │ fixed width  │
//! └──────────────┴──────────────┴─────┴──────────────┘
//! ```
//!
//! No padding, no alignment, no length prefixes.

mod parser;
mod record;

pub use parser::parse_schema_decl;
pub use record::{Field, Record};

use crate::error::{ClientError, Result};
use crate::types::{DataType, Value};
use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Name of the implicit timestamp column.
pub const TIMESTAMP_COLUMN: &str = "TIMESTAMP";

/// A column of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    index: usize,
    offset: usize,
    data_type: DataType,
    name: String,
    min: Option<Value>,
    max: Option<Value>,
}

impl Column {
    fn new(index: usize, offset: usize, data_type: DataType, name: &str) -> Self {
        Self {
            index,
            offset,
            data_type,
            name: name.to_ascii_uppercase(),
            min: None,
            max: None,
        }
    }

    /// Returns the position of the column within the schema.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the byte offset of the column within a packed record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the data type of the column.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the upper-cased column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared minimum value, if any.
    pub fn min(&self) -> Option<&Value> {
        self.min.as_ref()
    }

    /// Returns the declared maximum value, if any.
    pub fn max(&self) -> Option<&Value> {
        self.max.as_ref()
    }

    /// Extracts this column's field from a packed record buffer.
    pub fn apply<'a>(&self, record: &'a [u8]) -> Result<&'a [u8]> {
        record
            .get(self.offset..self.offset + self.data_type.size())
            .ok_or_else(|| {
                ClientError::DecodingError(format!(
                    "buffer of {} bytes too short for column {}",
                    record.len(),
                    self.name
                ))
            })
    }
}

/// Append-only builder for a schema's column list.
///
/// The timestamp column is injected on construction.
///
/// # Example
///
/// ```rust,ignore
/// let columns = SchemaBuilder::new()
///     .add_column(DataType::INT, "level")?
///     .add_column(DataType::string(16)?, "msg")?
///     .build();
/// let schema = Schema::new(columns)?;
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    columns: Vec<Column>,
    offset: usize,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Creates a builder holding only the timestamp column.
    pub fn new() -> Self {
        Self {
            columns: vec![Column::new(0, 0, DataType::TIMESTAMP, TIMESTAMP_COLUMN)],
            offset: DataType::TIMESTAMP.size(),
        }
    }

    /// Appends a column at the next free offset.
    ///
    /// A column named `TIMESTAMP` (any case) appends nothing; its type must
    /// match the timestamp type.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SchemaError`] on a timestamp type mismatch, an
    /// empty or duplicate name, or a NONE type.
    pub fn add_column(self, data_type: DataType, name: &str) -> Result<Self> {
        self.push_column(data_type, name, None, None)
    }

    /// Appends a column with declared value bounds.
    ///
    /// Bounds are metadata for server-side index bucketing; they are not
    /// enforced by [`Schema::pack`].
    pub fn add_column_with_bounds(
        self,
        data_type: DataType,
        name: &str,
        min: Value,
        max: Value,
    ) -> Result<Self> {
        data_type.pack(&min)?;
        data_type.pack(&max)?;
        self.push_column(data_type, name, Some(min), Some(max))
    }

    fn push_column(
        mut self,
        data_type: DataType,
        name: &str,
        min: Option<Value>,
        max: Option<Value>,
    ) -> Result<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case(TIMESTAMP_COLUMN) {
            if data_type != DataType::TIMESTAMP {
                return Err(ClientError::SchemaError(format!(
                    "{} must be of type {}, got {}",
                    TIMESTAMP_COLUMN,
                    DataType::TIMESTAMP,
                    data_type
                )));
            }
            return Ok(self);
        }
        if name.is_empty() {
            return Err(ClientError::SchemaError(
                "column name must not be empty".to_string(),
            ));
        }
        if data_type == DataType::NONE {
            return Err(ClientError::SchemaError(format!(
                "column {} cannot have type NONE",
                name
            )));
        }
        if self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(ClientError::SchemaError(format!(
                "duplicate column name {}",
                name.to_ascii_uppercase()
            )));
        }

        let mut column = Column::new(self.columns.len(), self.offset, data_type, name);
        column.min = min;
        column.max = max;
        self.offset += data_type.size();
        self.columns.push(column);
        Ok(self)
    }

    /// Finishes the builder, returning the ordered column list.
    pub fn build(self) -> Vec<Column> {
        self.columns
    }
}

/// An immutable record layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
    record_size: usize,
}

impl Schema {
    /// Creates a schema from a column list produced by [`SchemaBuilder::build`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SchemaError`] if the list does not start with the
    /// timestamp column or if indices and offsets are not contiguous.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        match columns.first() {
            Some(ts)
                if ts.name == TIMESTAMP_COLUMN
                    && ts.data_type == DataType::TIMESTAMP
                    && ts.offset == 0 => {}
            _ => {
                return Err(ClientError::SchemaError(format!(
                    "column 0 must be {} of type {}",
                    TIMESTAMP_COLUMN,
                    DataType::TIMESTAMP
                )))
            }
        }

        let mut record_size = 0;
        for (i, column) in columns.iter().enumerate() {
            if column.index != i || column.offset != record_size {
                return Err(ClientError::SchemaError(format!(
                    "column {} has index {} and offset {}, expected {} and {}",
                    column.name, column.index, column.offset, i, record_size
                )));
            }
            record_size += column.data_type.size();
        }

        Ok(Self {
            columns,
            record_size,
        })
    }

    /// Parses a textual declaration such as `{ msg: STRING(8), level: INT }`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut builder = SchemaBuilder::new();
        for (name, dtype) in parse_schema_decl(text)? {
            builder = builder.add_column(dtype, &name)?;
        }
        Self::new(builder.build())
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column at `index`.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the column named `name` (case-insensitive).
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Returns the packed record size in bytes.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Packs values into a record buffer of exactly `record_size()` bytes.
    ///
    /// Accepts one value per non-timestamp column, in which case the timestamp
    /// is set to the current time in microseconds, or one extra leading value
    /// holding the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SchemaError`] on any other arity and
    /// [`ClientError::EncodingError`] if a value does not fit its column.
    pub fn pack(&self, values: &[Value]) -> Result<Vec<u8>> {
        let user_columns = self.columns.len() - 1;
        let mut out = Vec::with_capacity(self.record_size);

        let rest = if values.len() == user_columns + 1 {
            DataType::TIMESTAMP.pack_into(&values[0], &mut out)?;
            &values[1..]
        } else if values.len() == user_columns {
            out.extend_from_slice(&now_micros().to_ne_bytes());
            values
        } else {
            return Err(ClientError::SchemaError(format!(
                "expected {} or {} values, got {}",
                user_columns,
                user_columns + 1,
                values.len()
            )));
        };

        for (column, value) in self.columns[1..].iter().zip(rest) {
            column.data_type.pack_into(value, &mut out).map_err(|e| match e {
                ClientError::EncodingError(msg) => {
                    ClientError::EncodingError(format!("column {}: {}", column.name, msg))
                }
                other => other,
            })?;
        }

        debug_assert_eq!(out.len(), self.record_size);
        Ok(out)
    }

    /// Parses textual values with each column's type and packs the record.
    ///
    /// Takes the same arities as [`Schema::pack`]: with one text per
    /// non-timestamp column the timestamp is synthesized.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SchemaError`] on a wrong arity and
    /// [`ClientError::EncodingError`] if a text does not parse as its column.
    pub fn pack_strs(&self, texts: &[&str]) -> Result<Vec<u8>> {
        let skip = if texts.len() == self.columns.len() {
            0
        } else if texts.len() + 1 == self.columns.len() {
            1
        } else {
            return Err(ClientError::SchemaError(format!(
                "expected {} or {} values, got {}",
                self.columns.len() - 1,
                self.columns.len(),
                texts.len()
            )));
        };

        let values: Vec<Value> = self.columns[skip..]
            .iter()
            .zip(texts)
            .map(|(column, text)| {
                column.data_type.parse_value(text).map_err(|e| match e {
                    ClientError::EncodingError(msg) => {
                        ClientError::EncodingError(format!("column {}: {}", column.name, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<_>>()?;
        self.pack(&values)
    }

    /// Decodes a borrowed record buffer.
    pub fn apply<'a>(&'a self, data: &'a [u8]) -> Result<Record<'a>> {
        Record::new(self, Cow::Borrowed(data))
    }

    /// Decodes an owned record buffer.
    pub fn apply_owned(&self, data: Vec<u8>) -> Result<Record<'_>> {
        Record::new(self, Cow::Owned(data))
    }

    /// Decodes every record in a buffer holding a whole number of records.
    pub fn apply_all<'a>(&'a self, data: &'a [u8]) -> Result<Vec<Record<'a>>> {
        if data.len() % self.record_size != 0 {
            return Err(ClientError::DecodingError(format!(
                "buffer of {} bytes is not a multiple of record size {}",
                data.len(),
                self.record_size
            )));
        }
        let records: Vec<Record<'a>> = data
            .chunks_exact(self.record_size)
            .map(|chunk| self.apply(chunk))
            .collect::<Result<_>>()?;
        debug!("Decoded {} records", records.len());
        Ok(records)
    }
}

/// Returns the current time in microseconds since the Unix epoch.
pub(crate) fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
