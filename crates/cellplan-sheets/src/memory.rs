use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::cell_ref::CellRef;
use crate::error::RemoteError;
use crate::transport::CellTransport;

/// In-process cell store. Never fails.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    cells: Mutex<HashMap<CellRef, String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cell before handing the transport to a store.
    pub fn with_cell(cell: &CellRef, value: impl Into<String>) -> Self {
        let mut cells = HashMap::new();
        cells.insert(cell.clone(), value.into());
        Self {
            cells: Mutex::new(cells),
        }
    }

    /// Current contents of a cell without going through the trait.
    pub async fn snapshot(&self, cell: &CellRef) -> Option<String> {
        self.cells.lock().await.get(cell).cloned()
    }
}

#[async_trait]
impl CellTransport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_cell(&self, cell: &CellRef) -> Result<String, RemoteError> {
        Ok(self.cells.lock().await.get(cell).cloned().unwrap_or_default())
    }

    async fn set_cell(&self, cell: &CellRef, value: &str) -> Result<(), RemoteError> {
        self.cells.lock().await.insert(cell.clone(), value.to_owned());
        Ok(())
    }
}
