//! Shared test utilities for cellplan integration tests.
//!
//! [`ScriptedTransport`] wraps an in-memory cell store and injects a
//! scripted sequence of failures in front of it, counting every call so
//! tests can assert exact attempt numbers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use cellplan_sheets::{CellRef, CellTransport, MemoryTransport, RemoteError};

/// Which trait method a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Get,
    Set,
}

/// In-memory transport with fault injection.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    inner: MemoryTransport,
    get_failures: Mutex<VecDeque<RemoteError>>,
    set_failures: Mutex<VecDeque<RemoteError>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `value` already stored in `cell`.
    pub fn with_cell(cell: &CellRef, value: impl Into<String>) -> Self {
        Self {
            inner: MemoryTransport::with_cell(cell, value),
            ..Self::default()
        }
    }

    /// Queue `err` to be returned by the next un-failed call of `op`.
    pub async fn fail_next(&self, op: Op, err: RemoteError) {
        self.queue(op).lock().await.push_back(err);
    }

    /// Queue `err` `times` times in a row.
    pub async fn fail_times(&self, op: Op, times: usize, err: RemoteError) {
        let mut queue = self.queue(op).lock().await;
        for _ in 0..times {
            queue.push_back(err.clone());
        }
    }

    /// Number of `get_cell` invocations so far, including failed ones.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set_cell` invocations so far, including failed ones.
    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Stored value, bypassing counters and scripted failures.
    pub async fn stored(&self, cell: &CellRef) -> Option<String> {
        self.inner.snapshot(cell).await
    }

    /// Overwrite a cell behind the store's back (simulates another writer).
    pub async fn overwrite(&self, cell: &CellRef, value: &str) {
        // MemoryTransport never fails.
        let _ = self.inner.set_cell(cell, value).await;
    }

    fn queue(&self, op: Op) -> &Mutex<VecDeque<RemoteError>> {
        match op {
            Op::Get => &self.get_failures,
            Op::Set => &self.set_failures,
        }
    }
}

#[async_trait]
impl CellTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get_cell(&self, cell: &CellRef) -> Result<String, RemoteError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.get_failures.lock().await.pop_front() {
            return Err(err);
        }
        self.inner.get_cell(cell).await
    }

    async fn set_cell(&self, cell: &CellRef, value: &str) -> Result<(), RemoteError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.set_failures.lock().await.pop_front() {
            return Err(err);
        }
        self.inner.set_cell(cell, value).await
    }
}
