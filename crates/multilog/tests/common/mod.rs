//! Shared test doubles for integration tests.

#![allow(dead_code)]

use alopex_multilog::rpc::{MultilogInfo, RpcColumn, RpcService, StorageMode};
use alopex_multilog::{
    ClientError, IteratorDescriptor, PageFetcher, RecordBatch, Result, StreamHandle,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

/// Shared log of the RPCs a [`FakeStore`] received, formatted as strings.
pub type CallLog = Rc<RefCell<Vec<String>>>;

struct FakeLog {
    name: String,
    schema: Vec<RpcColumn>,
    record_size: usize,
    data: Vec<u8>,
}

/// In-memory multilog store that paginates query results.
///
/// Filters are not evaluated: every filter query returns all records of the
/// multilog, split into pages of `page_records` records. Alert queries return
/// `alerts` split into pages of `alert_page_bytes` bytes, so lines may straddle
/// page boundaries.
pub struct FakeStore {
    calls: CallLog,
    logs: HashMap<i64, FakeLog>,
    next_id: i64,
    cursors: HashMap<i64, VecDeque<Vec<u8>>>,
    next_iterator: i64,
    pub page_records: usize,
    pub alerts: String,
    pub alert_page_bytes: usize,
    pub refuse_connections: bool,
    pub fail_register: bool,
    pub fail_deregister: bool,
    pub fetches: usize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            logs: HashMap::new(),
            next_id: 1,
            cursors: HashMap::new(),
            next_iterator: 100,
            page_records: 2,
            alerts: String::new(),
            alert_page_bytes: 4,
            refuse_connections: false,
            fail_register: false,
            fail_deregister: false,
            fetches: 0,
        }
    }

    pub fn calls(&self) -> CallLog {
        Rc::clone(&self.calls)
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn log(&mut self, multilog_id: i64) -> Result<&mut FakeLog> {
        self.logs
            .get_mut(&multilog_id)
            .ok_or_else(|| ClientError::ServerError(format!("no multilog with id {}", multilog_id)))
    }

    fn id_of(&self, name: &str) -> Result<i64> {
        self.logs
            .iter()
            .find(|(_, log)| log.name == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| ClientError::ServerError(format!("no multilog named {}", name)))
    }

    fn paginate(&mut self, data: Vec<u8>, page_size: usize) -> StreamHandle {
        let mut pages: VecDeque<Vec<u8>> = data
            .chunks(page_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();
        let first = pages.pop_front().unwrap_or_default();
        let id = self.next_iterator;
        self.next_iterator += 1;
        let has_more = !pages.is_empty();
        self.cursors.insert(id, pages);
        let descriptor = IteratorDescriptor {
            id,
            ..Default::default()
        };
        StreamHandle::new(descriptor, first, has_more)
    }

    fn filter_all(&mut self, multilog_id: i64) -> Result<StreamHandle> {
        let page_records = self.page_records;
        let log = self.log(multilog_id)?;
        let page_size = log.record_size * page_records;
        let data = log.data.clone();
        Ok(self.paginate(data, page_size))
    }

    fn all_alerts(&mut self) -> StreamHandle {
        let data = self.alerts.clone().into_bytes();
        let page_size = self.alert_page_bytes;
        self.paginate(data, page_size)
    }
}

impl PageFetcher for FakeStore {
    fn get_more(
        &mut self,
        multilog_id: i64,
        descriptor: &IteratorDescriptor,
    ) -> Result<StreamHandle> {
        self.record(format!("get_more {} {}", multilog_id, descriptor.id));
        self.fetches += 1;
        let pages = self.cursors.get_mut(&descriptor.id).ok_or_else(|| {
            ClientError::TransportError(format!("unknown iterator {}", descriptor.id))
        })?;
        let page = pages.pop_front().unwrap_or_default();
        let has_more = !pages.is_empty();
        Ok(StreamHandle::new(descriptor.clone(), page, has_more))
    }
}

impl RpcService for FakeStore {
    fn open(&mut self, host: &str, port: u16) -> Result<()> {
        self.record(format!("open {}:{}", host, port));
        if self.refuse_connections {
            let err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
            return Err(err.into());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.record("close".to_string());
        Ok(())
    }

    fn register_handler(&mut self) -> Result<()> {
        self.record("register_handler".to_string());
        if self.fail_register {
            return Err(ClientError::ServerError("handler limit reached".to_string()));
        }
        Ok(())
    }

    fn deregister_handler(&mut self) -> Result<()> {
        self.record("deregister_handler".to_string());
        if self.fail_deregister {
            return Err(ClientError::TransportError("broken pipe".to_string()));
        }
        Ok(())
    }

    fn create_atomic_multilog(
        &mut self,
        name: &str,
        schema: &[RpcColumn],
        mode: StorageMode,
    ) -> Result<i64> {
        self.record(format!("create_atomic_multilog {} {}", name, mode));
        if self.id_of(name).is_ok() {
            return Err(ClientError::ServerError(format!("{} already exists", name)));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.logs.insert(
            id,
            FakeLog {
                name: name.to_string(),
                schema: schema.to_vec(),
                record_size: schema.iter().map(|c| c.type_size as usize).sum(),
                data: Vec::new(),
            },
        );
        Ok(id)
    }

    fn load_atomic_multilog(&mut self, name: &str) -> Result<i64> {
        self.record(format!("load_atomic_multilog {}", name));
        self.id_of(name)
    }

    fn get_atomic_multilog_info(&mut self, name: &str) -> Result<MultilogInfo> {
        self.record(format!("get_atomic_multilog_info {}", name));
        let id = self.id_of(name)?;
        let schema = self.log(id)?.schema.clone();
        Ok(MultilogInfo { id, schema })
    }

    fn remove_atomic_multilog(&mut self, multilog_id: i64) -> Result<()> {
        self.record(format!("remove_atomic_multilog {}", multilog_id));
        self.logs
            .remove(&multilog_id)
            .map(|_| ())
            .ok_or_else(|| ClientError::ServerError(format!("no multilog with id {}", multilog_id)))
    }

    fn add_index(&mut self, multilog_id: i64, field_name: &str, bucket_size: f64) -> Result<()> {
        self.record(format!("add_index {} {} {}", multilog_id, field_name, bucket_size));
        Ok(())
    }

    fn remove_index(&mut self, multilog_id: i64, field_name: &str) -> Result<()> {
        self.record(format!("remove_index {} {}", multilog_id, field_name));
        Ok(())
    }

    fn add_filter(&mut self, multilog_id: i64, filter_name: &str, filter_expr: &str) -> Result<()> {
        self.record(format!("add_filter {} {} {}", multilog_id, filter_name, filter_expr));
        Ok(())
    }

    fn remove_filter(&mut self, multilog_id: i64, filter_name: &str) -> Result<()> {
        self.record(format!("remove_filter {} {}", multilog_id, filter_name));
        Ok(())
    }

    fn add_aggregate(
        &mut self,
        multilog_id: i64,
        aggregate_name: &str,
        filter_name: &str,
        aggregate_expr: &str,
    ) -> Result<()> {
        self.record(format!(
            "add_aggregate {} {} {} {}",
            multilog_id, aggregate_name, filter_name, aggregate_expr
        ));
        Ok(())
    }

    fn remove_aggregate(&mut self, multilog_id: i64, aggregate_name: &str) -> Result<()> {
        self.record(format!("remove_aggregate {} {}", multilog_id, aggregate_name));
        Ok(())
    }

    fn add_trigger(
        &mut self,
        multilog_id: i64,
        trigger_name: &str,
        trigger_expr: &str,
    ) -> Result<()> {
        self.record(format!("add_trigger {} {} {}", multilog_id, trigger_name, trigger_expr));
        Ok(())
    }

    fn remove_trigger(&mut self, multilog_id: i64, trigger_name: &str) -> Result<()> {
        self.record(format!("remove_trigger {} {}", multilog_id, trigger_name));
        Ok(())
    }

    fn archive(&mut self, multilog_id: i64, offset: i64) -> Result<()> {
        self.record(format!("archive {} {}", multilog_id, offset));
        Ok(())
    }

    fn append(&mut self, multilog_id: i64, data: &[u8]) -> Result<i64> {
        self.record(format!("append {} {}", multilog_id, data.len()));
        let log = self.log(multilog_id)?;
        let offset = log.data.len() as i64;
        log.data.extend_from_slice(data);
        Ok(offset)
    }

    fn append_batch(&mut self, multilog_id: i64, batch: &RecordBatch) -> Result<i64> {
        self.record(format!("append_batch {} {}", multilog_id, batch.nrecords));
        let log = self.log(multilog_id)?;
        let offset = log.data.len() as i64;
        for block in &batch.blocks {
            log.data.extend_from_slice(&block.data);
        }
        Ok(offset)
    }

    fn read(&mut self, multilog_id: i64, offset: i64, nrecords: u64) -> Result<Vec<u8>> {
        self.record(format!("read {} {} {}", multilog_id, offset, nrecords));
        let log = self.log(multilog_id)?;
        let start = offset as usize;
        if start >= log.data.len() {
            return Err(ClientError::ServerError(format!("offset {} not yet written", offset)));
        }
        let end = (start + nrecords as usize * log.record_size).min(log.data.len());
        Ok(log.data[start..end].to_vec())
    }

    fn query_aggregate(
        &mut self,
        multilog_id: i64,
        aggregate_name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<String> {
        self.record(format!(
            "query_aggregate {} {} {} {}",
            multilog_id, aggregate_name, begin_ms, end_ms
        ));
        Ok("double(42.000000)".to_string())
    }

    fn adhoc_aggregate(
        &mut self,
        multilog_id: i64,
        aggregate_expr: &str,
        filter_expr: &str,
    ) -> Result<String> {
        self.record(format!(
            "adhoc_aggregate {} {} {}",
            multilog_id, aggregate_expr, filter_expr
        ));
        Ok("long(7)".to_string())
    }

    fn adhoc_filter(&mut self, multilog_id: i64, filter_expr: &str) -> Result<StreamHandle> {
        self.record(format!("adhoc_filter {} {}", multilog_id, filter_expr));
        self.filter_all(multilog_id)
    }

    fn predef_filter(
        &mut self,
        multilog_id: i64,
        filter_name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<StreamHandle> {
        self.record(format!(
            "predef_filter {} {} {} {}",
            multilog_id, filter_name, begin_ms, end_ms
        ));
        self.filter_all(multilog_id)
    }

    fn combined_filter(
        &mut self,
        multilog_id: i64,
        filter_name: &str,
        filter_expr: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<StreamHandle> {
        self.record(format!(
            "combined_filter {} {} {} {} {}",
            multilog_id, filter_name, filter_expr, begin_ms, end_ms
        ));
        self.filter_all(multilog_id)
    }

    fn alerts_by_time(
        &mut self,
        multilog_id: i64,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<StreamHandle> {
        self.record(format!("alerts_by_time {} {} {}", multilog_id, begin_ms, end_ms));
        Ok(self.all_alerts())
    }

    fn alerts_by_trigger_and_time(
        &mut self,
        multilog_id: i64,
        trigger_name: &str,
        begin_ms: i64,
        end_ms: i64,
    ) -> Result<StreamHandle> {
        self.record(format!(
            "alerts_by_trigger_and_time {} {} {} {}",
            multilog_id, trigger_name, begin_ms, end_ms
        ));
        Ok(self.all_alerts())
    }

    fn num_records(&mut self, multilog_id: i64) -> Result<i64> {
        self.record(format!("num_records {}", multilog_id));
        let log = self.log(multilog_id)?;
        Ok((log.data.len() / log.record_size) as i64)
    }
}

/// Serves a fixed sequence of continuation pages and counts fetches.
///
/// Each served page carries the incoming descriptor with its id advanced by
/// one. Once the script is empty every fetch fails with a `TransportError`
/// reading "iterator exhausted".
pub struct ScriptedPages {
    pages: VecDeque<(Vec<u8>, bool)>,
    pub fetches: usize,
}

impl ScriptedPages {
    pub fn new(pages: Vec<(Vec<u8>, bool)>) -> Self {
        Self {
            pages: pages.into(),
            fetches: 0,
        }
    }
}

impl PageFetcher for ScriptedPages {
    fn get_more(
        &mut self,
        _multilog_id: i64,
        descriptor: &IteratorDescriptor,
    ) -> Result<StreamHandle> {
        self.fetches += 1;
        let (data, has_more) = self
            .pages
            .pop_front()
            .ok_or_else(|| ClientError::TransportError("iterator exhausted".to_string()))?;
        let next = IteratorDescriptor {
            id: descriptor.id + 1,
            ..descriptor.clone()
        };
        Ok(StreamHandle::new(next, data, has_more))
    }
}

/// Builds the first page of a result.
pub fn first_page(data: Vec<u8>, has_more: bool) -> StreamHandle {
    StreamHandle::new(IteratorDescriptor::default(), data, has_more)
}
