//! The RPC surface the client consumes, and its wire types.
//!
//! The transport itself lives outside this crate. Anything implementing
//! [`RpcService`] (a Thrift binding, an in-process store, a test double) can
//! back a [`Client`](crate::Client).

use crate::batch::RecordBatch;
use crate::error::{ClientError, Result};
use crate::schema::{Schema, SchemaBuilder};
use crate::stream::{PageFetcher, StreamHandle};
use crate::types::{DataType, TypeId};
use std::fmt;

/// Persistence level of a multilog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum StorageMode {
    /// Data lives in memory only.
    #[default]
    InMemory = 0,
    /// Data is persisted without waiting for flushes.
    DurableRelaxed = 1,
    /// Data is persisted before appends are acknowledged.
    Durable = 2,
}

impl StorageMode {
    /// Converts a wire value into a storage mode.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::InMemory),
            1 => Some(Self::DurableRelaxed),
            2 => Some(Self::Durable),
            _ => None,
        }
    }

    /// Returns the wire value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InMemory => "IN_MEMORY",
            Self::DurableRelaxed => "DURABLE_RELAXED",
            Self::Durable => "DURABLE",
        };
        f.write_str(name)
    }
}

/// A column as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcColumn {
    /// Wire type id.
    pub type_id: i32,
    /// Width in bytes.
    pub type_size: u32,
    /// Column name.
    pub name: String,
}

/// Server-side description of a multilog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultilogInfo {
    /// Server-assigned id.
    pub id: i64,
    /// Wire schema, timestamp column included.
    pub schema: Vec<RpcColumn>,
}

/// Converts a schema into its wire form.
pub fn convert_to_rpc_schema(schema: &Schema) -> Vec<RpcColumn> {
    schema
        .columns()
        .iter()
        .map(|col| RpcColumn {
            type_id: i32::from(col.data_type().id().as_u16()),
            type_size: col.data_type().wire_size(),
            name: col.name().to_string(),
        })
        .collect()
}

/// Rebuilds a schema from its wire form.
///
/// # Errors
///
/// Unknown type ids or widths that do not match their type yield
/// [`ClientError::InvalidType`]; layout violations yield
/// [`ClientError::SchemaError`].
pub fn convert_to_schema(columns: &[RpcColumn]) -> Result<Schema> {
    let mut builder = SchemaBuilder::new();
    for col in columns {
        let id = u16::try_from(col.type_id)
            .ok()
            .and_then(TypeId::from_u16)
            .ok_or_else(|| {
                ClientError::InvalidType(format!(
                    "unknown type id {} for column {}",
                    col.type_id, col.name
                ))
            })?;
        let data_type = DataType::new(id, col.type_size)?;
        builder = builder.add_column(data_type, &col.name)?;
    }
    Schema::new(builder.build())
}

/// Request/response operations of the multilog store.
///
/// Every method is a blocking round trip. Implementations report failures of
/// the channel as [`ClientError::TransportError`] and failures raised by the
/// store as [`ClientError::ServerError`]. Continuation pages of query results
/// are fetched through the [`PageFetcher`] supertrait.
pub trait RpcService: PageFetcher {
    /// Opens the transport to `host:port`.
    fn open(&mut self, host: &str, port: u16) -> Result<()>;

    /// Closes the transport.
    fn close(&mut self) -> Result<()>;

    /// Registers this connection's handler with the server.
    fn register_handler(&mut self) -> Result<()>;

    /// Deregisters this connection's handler.
    fn deregister_handler(&mut self) -> Result<()>;

    /// Creates a multilog and returns its id.
    fn create_atomic_multilog(
        &mut self,
        name: &str,
        schema: &[RpcColumn],
        mode: StorageMode,
    ) -> Result<i64>;

    /// Loads a multilog from persistent storage and returns its id.
    fn load_atomic_multilog(&mut self, name: &str) -> Result<i64>;

    /// Looks up an existing multilog by name.
    fn get_atomic_multilog_info(&mut self, name: &str) -> Result<MultilogInfo>;

    /// Removes a multilog.
    fn remove_atomic_multilog(&mut self, multilog_id: i64) -> Result<()>;

    /// Adds an index on a field.
    fn add_index(&mut self, multilog_id: i64, field_name: &str, bucket_size: f64) -> Result<()>;

    /// Removes the index on a field.
    fn remove_index(&mut self, multilog_id: i64, field_name: &str) -> Result<()>;

    /// Adds a named filter.
    fn add_filter(&mut self, multilog_id: i64, filter_name: &str, filter_expr: &str)
        -> Result<()>;

    /// Removes a named filter.
    fn remove_filter(&mut self, multilog_id: i64, filter_name: &str) -> Result<()>;

    /// Adds a named aggregate over a filter.
    fn add_aggregate(
        &mut self,
        multilog_id: i64,
        aggregate_name: &str,
        filter_name: &str,
        aggregate_expr: &str,
    ) -> Result<()>;

    /// Removes a named aggregate.
    fn remove_aggregate(&mut self, multilog_id: i64, aggregate_name: &str) -> Result<()>;

    /// Installs a named trigger.
    fn add_trigger(
        &mut self,
        multilog_id: i64,
        trigger_name: &str,
        trigger_expr: &str,
    ) -> Result<()>;

    /// Removes a named trigger.
    fn remove_trigger(&mut self, multilog_id: i64, trigger_name: &str) -> Result<()>;

    /// Archives the multilog up to `offset`, or entirely for `-1`.
    fn archive(&mut self, multilog_id: i64, offset: i64) -> Result<()>;

    /// Appends one packed record and returns its log offset.
    fn append(&mut self, multilog_id: i64, data: &[u8]) -> Result<i64>;

    /// Appends a batch and returns the log offset of its first record.
    fn append_batch(&mut self, multilog_id: i64, batch: &RecordBatch) -> Result<i64>;

    /// Reads up to `nrecords` packed records starting at `offset`.
    fn read(&mut self, multilog_id: i64, offset: i64, nrecords: u64) -> Result<Vec<u8>>;

    /// Evaluates a named aggregate over a time window.
    fn query_aggregate(
        &mut self,
        multilog_id: i64,
        aggregate_name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<String>;

    /// Evaluates an ad-hoc aggregate over the records matching a filter.
    fn adhoc_aggregate(
        &mut self,
        multilog_id: i64,
        aggregate_expr: &str,
        filter_expr: &str,
    ) -> Result<String>;

    /// Runs an ad-hoc filter and returns the first page of matches.
    fn adhoc_filter(&mut self, multilog_id: i64, filter_expr: &str) -> Result<StreamHandle>;

    /// Queries a named filter over a time window.
    fn predef_filter(
        &mut self,
        multilog_id: i64,
        filter_name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<StreamHandle>;

    /// Queries a named filter refined by an extra expression.
    fn combined_filter(
        &mut self,
        multilog_id: i64,
        filter_name: &str,
        filter_expr: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<StreamHandle>;

    /// Returns the first page of alerts raised in a time window.
    fn alerts_by_time(&mut self, multilog_id: i64, begin_ms: i64, end_ms: i64)
        -> Result<StreamHandle>;

    /// Returns the first page of alerts raised by one trigger in a time window.
    fn alerts_by_trigger_and_time(
        &mut self,
        multilog_id: i64,
        trigger_name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<StreamHandle>;

    /// Returns the number of records in the multilog.
    fn num_records(&mut self, multilog_id: i64) -> Result<i64>;
}
