//! Time-bucketed batching of packed records.
//!
//! A [`RecordBatchBuilder`] groups packed records by a coarse time window so
//! that one round trip carries many records. Each bucket becomes one
//! [`RecordBlock`] of the resulting [`RecordBatch`].
//!
//! ```text
//! add_record(ts=100)       ─┐
//! add_record(ts=200)       ─┼─> block 0: 2 records
//! add_record(ts=1_000_100) ───> block 1: 1 record
//! ```
//!
//! Bucket iteration order is not part of the contract.

use crate::error::{ClientError, Result};
use crate::schema::Schema;
use crate::types::Value;
use std::collections::HashMap;
use tracing::debug;

/// Width of a time block in timestamp units (one second of microseconds).
pub const TIME_BLOCK_WIDTH: u64 = 1_000_000;

/// Size of the leading timestamp of every packed record.
const TIMESTAMP_SIZE: usize = 8;

/// Packed records sharing one time block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBlock {
    /// Bucket key: record timestamp divided by [`TIME_BLOCK_WIDTH`].
    pub time_block: u64,
    /// Concatenated packed records.
    pub data: Vec<u8>,
    /// Number of records in `data`.
    pub nrecords: u64,
}

/// A multi-record append unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    /// Total number of records across all blocks.
    pub nrecords: u64,
    /// One block per distinct time block, in no particular order.
    pub blocks: Vec<RecordBlock>,
}

impl RecordBatch {
    /// Returns true if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.nrecords == 0
    }

    /// Returns the total payload size in bytes.
    pub fn data_size(&self) -> usize {
        self.blocks.iter().map(|b| b.data.len()).sum()
    }

    /// Checks block payloads and record counts against `record_size`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if a block's payload is not
    /// exactly `nrecords` records long, if a block's byte count overflows, or
    /// if `nrecords` differs from the sum of the block counts.
    pub fn validate(&self, record_size: usize) -> Result<()> {
        let mut total: u64 = 0;
        for block in &self.blocks {
            let expected = block.nrecords.checked_mul(record_size as u64).ok_or_else(|| {
                ClientError::InvalidArgument(format!(
                    "block {} count of {} records of {} bytes overflows",
                    block.time_block, block.nrecords, record_size
                ))
            })?;
            if block.data.len() as u64 != expected {
                return Err(ClientError::InvalidArgument(format!(
                    "block {} holds {} bytes for {} records of {} bytes",
                    block.time_block,
                    block.data.len(),
                    block.nrecords,
                    record_size
                )));
            }
            total = total.checked_add(block.nrecords).ok_or_else(|| {
                ClientError::InvalidArgument("batch record count overflows".to_string())
            })?;
        }
        if total != self.nrecords {
            return Err(ClientError::InvalidArgument(format!(
                "batch claims {} records but its blocks hold {}",
                self.nrecords, total
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BlockBuffer {
    data: Vec<u8>,
    nrecords: u64,
}

/// Accumulates packed records into per-time-block buffers.
///
/// Not safe for concurrent producers; shard one builder per producer.
#[derive(Debug)]
pub struct RecordBatchBuilder {
    schema: Schema,
    blocks: HashMap<u64, BlockBuffer>,
    nrecords: u64,
}

impl RecordBatchBuilder {
    /// Creates an empty builder for records of `schema`.
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema: schema.clone(),
            blocks: HashMap::new(),
            nrecords: 0,
        }
    }

    /// Returns the time block of a timestamp.
    pub fn time_block(timestamp: u64) -> u64 {
        timestamp / TIME_BLOCK_WIDTH
    }

    /// Adds one packed record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the buffer is shorter than
    /// the timestamp or not exactly one record long. The builder is left
    /// untouched on error.
    pub fn add_record(&mut self, record: &[u8]) -> Result<()> {
        if record.len() < TIMESTAMP_SIZE {
            return Err(ClientError::InvalidArgument(format!(
                "record of {} bytes is shorter than its {}-byte timestamp",
                record.len(),
                TIMESTAMP_SIZE
            )));
        }
        if record.len() != self.schema.record_size() {
            return Err(ClientError::InvalidArgument(format!(
                "record must be {} bytes, got {}",
                self.schema.record_size(),
                record.len()
            )));
        }

        let mut ts = [0u8; TIMESTAMP_SIZE];
        ts.copy_from_slice(&record[..TIMESTAMP_SIZE]);
        let time_block = Self::time_block(u64::from_ne_bytes(ts));

        let block = self.blocks.entry(time_block).or_default();
        block.data.extend_from_slice(record);
        block.nrecords += 1;
        self.nrecords += 1;
        Ok(())
    }

    /// Packs `values` with the builder's schema and adds the record.
    pub fn add(&mut self, values: &[Value]) -> Result<()> {
        let record = self.schema.pack(values)?;
        self.add_record(&record)
    }

    /// Returns the number of records added since the last batch.
    pub fn num_records(&self) -> u64 {
        self.nrecords
    }

    /// Returns true if no records were added since the last batch.
    pub fn is_empty(&self) -> bool {
        self.nrecords == 0
    }

    /// Materializes the accumulated records into a batch and clears the builder.
    pub fn get_batch(&mut self) -> RecordBatch {
        let blocks = std::mem::take(&mut self.blocks);
        let nrecords = std::mem::take(&mut self.nrecords);

        let blocks: Vec<RecordBlock> = blocks
            .into_iter()
            .map(|(time_block, buf)| RecordBlock {
                time_block,
                data: buf.data,
                nrecords: buf.nrecords,
            })
            .collect();

        debug!(
            "Materialized batch of {} records in {} time blocks",
            nrecords,
            blocks.len()
        );

        RecordBatch { nrecords, blocks }
    }

    /// Discards all accumulated records.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.nrecords = 0;
    }
}
