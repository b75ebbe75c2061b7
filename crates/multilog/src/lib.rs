//! Alopex Multilog - client library for the Alopex multilog store.
//!
//! A multilog is a named, append-only log with a fixed-width record layout.
//! This crate provides the client side of the store's wire contract.
//!
//! # Components
//!
//! - [`DataType`] / [`Value`]: Fixed-width binary encoding of primitive values
//! - [`Schema`] / [`SchemaBuilder`]: Record layout with a leading timestamp column
//! - [`Record`] / [`Field`]: Decoded views over packed record bytes
//! - [`RecordBatchBuilder`]: Time-bucketed batching of packed records
//! - [`RecordStream`] / [`AlertStream`]: Lazy cursors over paginated query results
//! - [`Client`]: Façade routing operations to an [`RpcService`] transport
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_multilog::{Client, ClientConfig, Schema};
//!
//! let mut client = Client::connect(transport, ClientConfig::default())?;
//! let schema = Schema::parse("{ msg: STRING(8), level: INT }")?;
//! let log = client.create_multilog("events", &schema)?;
//!
//! client.append(&log, &["abcdefgh".into(), 3i32.into()])?;
//!
//! let mut stream = client.execute_filter(&log, "level > 2")?;
//! while let Some(record) = stream.next_record()? {
//!     println!("{:?}", record.values()?);
//! }
//! ```

#![deny(missing_docs)]

pub mod batch;
pub mod client;
pub mod error;
pub mod rpc;
pub mod schema;
pub mod stream;
pub mod types;

pub use batch::{RecordBatch, RecordBatchBuilder, RecordBlock, TIME_BLOCK_WIDTH};
pub use client::{Client, ClientConfig, MultilogHandle};
pub use error::{ClientError, Result};
pub use rpc::{MultilogInfo, RpcColumn, RpcService, StorageMode};
pub use schema::{Column, Field, Record, Schema, SchemaBuilder};
pub use stream::{
    AlertStream, IteratorDescriptor, PageFetcher, RecordStream, StreamHandle, StreamState,
};
pub use types::{DataType, TypeId, Value};
