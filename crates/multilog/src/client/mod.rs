//! Client façade over an [`RpcService`].
//!
//! The client owns the transport and routes each operation to the matching
//! RPC. Operations address a multilog through an explicit [`MultilogHandle`]
//! returned by [`Client::create_multilog`], [`Client::load_multilog`] or
//! [`Client::select_multilog`].
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ClientConfig::default().with_host("10.0.0.7").with_port(9191);
//! let mut client = Client::connect(transport, config)?;
//! let log = client.select_multilog("events")?;
//!
//! for alert in client.get_alerts(&log, 0, i64::MAX)? {
//!     println!("{}", alert?);
//! }
//! client.disconnect()?;
//! ```

use crate::batch::{RecordBatch, RecordBatchBuilder};
use crate::error::{ClientError, Result};
use crate::rpc::{convert_to_rpc_schema, convert_to_schema, RpcService, StorageMode};
use crate::schema::{Record, Schema};
use crate::stream::{AlertStream, RecordStream};
use crate::types::Value;
use tracing::{debug, info, warn};

/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default server port.
pub const DEFAULT_PORT: u16 = 9090;

/// Default bucket size for new indexes.
pub const DEFAULT_INDEX_BUCKET_SIZE: f64 = 1.0;

/// Configuration for a [`Client`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Storage mode used by [`Client::create_multilog`].
    pub storage_mode: StorageMode,
    /// Bucket size used by [`Client::add_index`].
    pub index_bucket_size: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage_mode: StorageMode::default(),
            index_bucket_size: DEFAULT_INDEX_BUCKET_SIZE,
        }
    }
}

impl ClientConfig {
    /// Sets the server host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the default storage mode for new multilogs.
    pub fn with_storage_mode(mut self, mode: StorageMode) -> Self {
        self.storage_mode = mode;
        self
    }

    /// Sets the default index bucket size.
    pub fn with_index_bucket_size(mut self, bucket_size: f64) -> Self {
        self.index_bucket_size = bucket_size;
        self
    }
}

/// A selected multilog: its server id, name and schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MultilogHandle {
    id: i64,
    name: String,
    schema: Schema,
}

impl MultilogHandle {
    /// Returns the server-assigned id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the multilog name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the record layout.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// A connected client.
///
/// Disconnects on drop if [`disconnect`](Self::disconnect) was not called.
pub struct Client<S: RpcService> {
    service: S,
    config: ClientConfig,
    connected: bool,
}

impl<S: RpcService> Client<S> {
    /// Opens the transport and registers a handler with the server.
    ///
    /// The transport is closed again if registration fails.
    pub fn connect(mut service: S, config: ClientConfig) -> Result<Self> {
        service.open(&config.host, config.port)?;
        if let Err(e) = service.register_handler() {
            if let Err(close_err) = service.close() {
                warn!("Failed to close transport after failed registration: {:?}", close_err);
            }
            return Err(e);
        }
        info!("Connected to {}:{}", config.host, config.port);
        Ok(Self {
            service,
            config,
            connected: true,
        })
    }

    /// Deregisters the handler and closes the transport.
    ///
    /// A deregistration failure is logged and the transport is still closed.
    /// Calling this on a disconnected client does nothing.
    pub fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        if let Err(e) = self.service.deregister_handler() {
            warn!("Failed to deregister handler: {:?}", e);
        }
        self.service.close()?;
        info!("Disconnected from {}:{}", self.config.host, self.config.port);
        Ok(())
    }

    /// Returns true until [`disconnect`](Self::disconnect) is called.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    fn rpc(&mut self) -> Result<&mut S> {
        if !self.connected {
            return Err(ClientError::PreconditionError(
                "client is disconnected".to_string(),
            ));
        }
        Ok(&mut self.service)
    }

    /// Creates a multilog with the configured storage mode.
    pub fn create_multilog(&mut self, name: &str, schema: &Schema) -> Result<MultilogHandle> {
        let mode = self.config.storage_mode;
        self.create_multilog_with_mode(name, schema, mode)
    }

    /// Creates a multilog with an explicit storage mode.
    pub fn create_multilog_with_mode(
        &mut self,
        name: &str,
        schema: &Schema,
        mode: StorageMode,
    ) -> Result<MultilogHandle> {
        let rpc_schema = convert_to_rpc_schema(schema);
        let id = self.rpc()?.create_atomic_multilog(name, &rpc_schema, mode)?;
        debug!("Created multilog {} with id {} ({})", name, id, mode);
        Ok(MultilogHandle {
            id,
            name: name.to_string(),
            schema: schema.clone(),
        })
    }

    /// Loads a multilog from the server's persistent storage.
    pub fn load_multilog(&mut self, name: &str) -> Result<MultilogHandle> {
        let rpc = self.rpc()?;
        let id = rpc.load_atomic_multilog(name)?;
        let info = rpc.get_atomic_multilog_info(name)?;
        Ok(MultilogHandle {
            id,
            name: name.to_string(),
            schema: convert_to_schema(&info.schema)?,
        })
    }

    /// Looks up an existing multilog.
    pub fn select_multilog(&mut self, name: &str) -> Result<MultilogHandle> {
        let info = self.rpc()?.get_atomic_multilog_info(name)?;
        Ok(MultilogHandle {
            id: info.id,
            name: name.to_string(),
            schema: convert_to_schema(&info.schema)?,
        })
    }

    /// Removes a multilog, consuming its handle.
    pub fn remove_multilog(&mut self, handle: MultilogHandle) -> Result<()> {
        self.rpc()?.remove_atomic_multilog(handle.id)?;
        debug!("Removed multilog {} ({})", handle.name, handle.id);
        Ok(())
    }

    /// Adds an index on `field` with the configured bucket size.
    pub fn add_index(&mut self, handle: &MultilogHandle, field: &str) -> Result<()> {
        let bucket_size = self.config.index_bucket_size;
        self.add_index_with_bucket_size(handle, field, bucket_size)
    }

    /// Adds an index on `field` with an explicit bucket size.
    pub fn add_index_with_bucket_size(
        &mut self,
        handle: &MultilogHandle,
        field: &str,
        bucket_size: f64,
    ) -> Result<()> {
        if bucket_size.is_nan() || bucket_size <= 0.0 {
            return Err(ClientError::InvalidArgument(format!(
                "bucket size must be positive, got {}",
                bucket_size
            )));
        }
        self.rpc()?.add_index(handle.id, field, bucket_size)
    }

    /// Removes the index on `field`.
    pub fn remove_index(&mut self, handle: &MultilogHandle, field: &str) -> Result<()> {
        self.rpc()?.remove_index(handle.id, field)
    }

    /// Adds a named filter.
    pub fn add_filter(&mut self, handle: &MultilogHandle, name: &str, expr: &str) -> Result<()> {
        self.rpc()?.add_filter(handle.id, name, expr)
    }

    /// Removes a named filter.
    pub fn remove_filter(&mut self, handle: &MultilogHandle, name: &str) -> Result<()> {
        self.rpc()?.remove_filter(handle.id, name)
    }

    /// Adds a named aggregate over the filter `filter_name`.
    pub fn add_aggregate(
        &mut self,
        handle: &MultilogHandle,
        name: &str,
        filter_name: &str,
        expr: &str,
    ) -> Result<()> {
        self.rpc()?.add_aggregate(handle.id, name, filter_name, expr)
    }

    /// Removes a named aggregate.
    pub fn remove_aggregate(&mut self, handle: &MultilogHandle, name: &str) -> Result<()> {
        self.rpc()?.remove_aggregate(handle.id, name)
    }

    /// Installs a named trigger.
    pub fn install_trigger(
        &mut self,
        handle: &MultilogHandle,
        name: &str,
        expr: &str,
    ) -> Result<()> {
        self.rpc()?.add_trigger(handle.id, name, expr)
    }

    /// Removes a named trigger.
    pub fn remove_trigger(&mut self, handle: &MultilogHandle, name: &str) -> Result<()> {
        self.rpc()?.remove_trigger(handle.id, name)
    }

    /// Archives the multilog up to `offset`, or entirely if `None`.
    pub fn archive(&mut self, handle: &MultilogHandle, offset: Option<u64>) -> Result<()> {
        let offset = match offset {
            Some(offset) => to_wire_offset(offset)?,
            None => -1,
        };
        self.rpc()?.archive(handle.id, offset)
    }

    /// Appends a packed record and returns its log offset.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if `data` is not exactly one
    /// record long.
    pub fn append_raw(&mut self, handle: &MultilogHandle, data: &[u8]) -> Result<u64> {
        if data.len() != handle.schema.record_size() {
            return Err(ClientError::InvalidArgument(format!(
                "record must be {} bytes, got {}",
                handle.schema.record_size(),
                data.len()
            )));
        }
        let offset = self.rpc()?.append(handle.id, data)?;
        from_wire_offset(offset)
    }

    /// Packs `values` with the multilog's schema and appends the record.
    pub fn append(&mut self, handle: &MultilogHandle, values: &[Value]) -> Result<u64> {
        let data = handle.schema.pack(values)?;
        self.append_raw(handle, &data)
    }

    /// Parses textual values with the multilog's schema and appends the record.
    ///
    /// See [`Schema::pack_strs`] for the accepted arities.
    pub fn append_strs(&mut self, handle: &MultilogHandle, texts: &[&str]) -> Result<u64> {
        let data = handle.schema.pack_strs(texts)?;
        self.append_raw(handle, &data)
    }

    /// Appends a batch and returns the log offset of its first record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the batch fails
    /// [`RecordBatch::validate`] against the multilog's record size. Nothing
    /// is sent in that case.
    pub fn append_batch(&mut self, handle: &MultilogHandle, batch: &RecordBatch) -> Result<u64> {
        batch.validate(handle.schema.record_size())?;
        let offset = self.rpc()?.append_batch(handle.id, batch)?;
        debug!(
            "Appended batch of {} records to multilog {}",
            batch.nrecords, handle.id
        );
        from_wire_offset(offset)
    }

    /// Returns an empty batch builder for the multilog's schema.
    pub fn batch_builder(&self, handle: &MultilogHandle) -> RecordBatchBuilder {
        RecordBatchBuilder::new(&handle.schema)
    }

    /// Reads the packed record at `offset`.
    pub fn read_raw(&mut self, handle: &MultilogHandle, offset: u64) -> Result<Vec<u8>> {
        let data = self.rpc()?.read(handle.id, to_wire_offset(offset)?, 1)?;
        if data.len() != handle.schema.record_size() {
            return Err(ClientError::DecodingError(format!(
                "read at offset {} returned {} bytes, expected {}",
                offset,
                data.len(),
                handle.schema.record_size()
            )));
        }
        Ok(data)
    }

    /// Reads and decodes the record at `offset`.
    pub fn read<'h>(&mut self, handle: &'h MultilogHandle, offset: u64) -> Result<Record<'h>> {
        let data = self.read_raw(handle, offset)?;
        Ok(handle.schema.apply_owned(data)?.with_log_offset(offset))
    }

    /// Reads up to `nrecords` consecutive records starting at `offset`.
    pub fn read_batch<'h>(
        &mut self,
        handle: &'h MultilogHandle,
        offset: u64,
        nrecords: u64,
    ) -> Result<Vec<Record<'h>>> {
        let data = self.rpc()?.read(handle.id, to_wire_offset(offset)?, nrecords)?;
        let schema = &handle.schema;
        if data.len() % schema.record_size() != 0 {
            return Err(ClientError::DecodingError(format!(
                "read returned {} bytes, not a multiple of record size {}",
                data.len(),
                schema.record_size()
            )));
        }
        data.chunks_exact(schema.record_size())
            .enumerate()
            .map(|(i, chunk)| -> Result<Record<'h>> {
                let record_offset = offset + (i * schema.record_size()) as u64;
                Ok(schema
                    .apply_owned(chunk.to_vec())?
                    .with_log_offset(record_offset))
            })
            .collect()
    }

    /// Reads the record at `offset` and renders its fields as text.
    pub fn read_strs(&mut self, handle: &MultilogHandle, offset: u64) -> Result<Vec<String>> {
        self.read(handle, offset)?.to_strings()
    }

    /// Reads up to `nrecords` records starting at `offset`, rendered as text.
    pub fn read_batch_strs(
        &mut self,
        handle: &MultilogHandle,
        offset: u64,
        nrecords: u64,
    ) -> Result<Vec<Vec<String>>> {
        self.read_batch(handle, offset, nrecords)?
            .iter()
            .map(Record::to_strings)
            .collect()
    }

    /// Evaluates a named aggregate over `[begin_ms, end_ms]`.
    pub fn get_aggregate(
        &mut self,
        handle: &MultilogHandle,
        name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<String> {
        check_window(begin_ms, end_ms)?;
        self.rpc()?.query_aggregate(handle.id, name, begin_ms, end_ms)
    }

    /// Evaluates an ad-hoc aggregate over the records matching `filter_expr`.
    pub fn execute_aggregate(
        &mut self,
        handle: &MultilogHandle,
        aggregate_expr: &str,
        filter_expr: &str,
    ) -> Result<String> {
        self.rpc()?.adhoc_aggregate(handle.id, aggregate_expr, filter_expr)
    }

    /// Runs an ad-hoc filter over the whole multilog.
    pub fn execute_filter<'h>(
        &mut self,
        handle: &'h MultilogHandle,
        expr: &str,
    ) -> Result<RecordStream<'h, '_, S>> {
        let rpc = self.rpc()?;
        let first = rpc.adhoc_filter(handle.id, expr)?;
        RecordStream::new(handle.id, &handle.schema, rpc, first)
    }

    /// Queries a named filter over `[begin_ms, end_ms]`.
    pub fn query_filter<'h>(
        &mut self,
        handle: &'h MultilogHandle,
        filter_name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<RecordStream<'h, '_, S>> {
        check_window(begin_ms, end_ms)?;
        let rpc = self.rpc()?;
        let first = rpc.predef_filter(handle.id, filter_name, begin_ms, end_ms)?;
        RecordStream::new(handle.id, &handle.schema, rpc, first)
    }

    /// Queries a named filter over `[begin_ms, end_ms]`, refined by `expr`.
    ///
    /// An empty `expr` behaves like [`query_filter`](Self::query_filter).
    pub fn query_filter_with<'h>(
        &mut self,
        handle: &'h MultilogHandle,
        filter_name: &str,
        expr: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<RecordStream<'h, '_, S>> {
        if expr.trim().is_empty() {
            return self.query_filter(handle, filter_name, begin_ms, end_ms);
        }
        check_window(begin_ms, end_ms)?;
        let rpc = self.rpc()?;
        let first = rpc.combined_filter(handle.id, filter_name, expr, begin_ms, end_ms)?;
        RecordStream::new(handle.id, &handle.schema, rpc, first)
    }

    /// Returns the alerts raised in `[begin_ms, end_ms]`.
    pub fn get_alerts(
        &mut self,
        handle: &MultilogHandle,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<AlertStream<'_, S>> {
        check_window(begin_ms, end_ms)?;
        let rpc = self.rpc()?;
        let first = rpc.alerts_by_time(handle.id, begin_ms, end_ms)?;
        Ok(AlertStream::new(handle.id, rpc, first))
    }

    /// Returns the alerts raised by `trigger_name` in `[begin_ms, end_ms]`.
    pub fn get_alerts_by_trigger(
        &mut self,
        handle: &MultilogHandle,
        trigger_name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<AlertStream<'_, S>> {
        check_window(begin_ms, end_ms)?;
        let rpc = self.rpc()?;
        let first = rpc.alerts_by_trigger_and_time(handle.id, trigger_name, begin_ms, end_ms)?;
        Ok(AlertStream::new(handle.id, rpc, first))
    }

    /// Returns the number of records in the multilog.
    pub fn num_records(&mut self, handle: &MultilogHandle) -> Result<u64> {
        let n = self.rpc()?.num_records(handle.id)?;
        u64::try_from(n)
            .map_err(|_| ClientError::ServerError(format!("negative record count {}", n)))
    }
}

impl<S: RpcService> Drop for Client<S> {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!("Failed to disconnect on drop: {:?}", e);
        }
    }
}

fn check_window(begin_ms: i64, end_ms: i64) -> Result<()> {
    if begin_ms > end_ms {
        return Err(ClientError::InvalidArgument(format!(
            "time window begins at {} after it ends at {}",
            begin_ms, end_ms
        )));
    }
    Ok(())
}

fn to_wire_offset(offset: u64) -> Result<i64> {
    i64::try_from(offset)
        .map_err(|_| ClientError::InvalidArgument(format!("offset {} out of range", offset)))
}

fn from_wire_offset(offset: i64) -> Result<u64> {
    u64::try_from(offset)
        .map_err(|_| ClientError::ServerError(format!("server returned offset {}", offset)))
}
