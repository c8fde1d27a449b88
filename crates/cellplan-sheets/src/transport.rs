//! The `CellTransport` trait -- the single remote capability the plan
//! store depends on.
//!
//! Each backend (the spreadsheet REST API, a local JSON file, an
//! in-memory map) implements this trait. It is object-safe so callers can
//! hold an `Arc<dyn CellTransport>` and swap backends at runtime.

use async_trait::async_trait;

use crate::cell_ref::CellRef;
use crate::error::RemoteError;

/// Read or overwrite the text contents of one named cell.
///
/// Implementations perform exactly one remote call per method invocation;
/// retrying belongs to [`crate::ResilientCell`].
#[async_trait]
pub trait CellTransport: Send + Sync {
    /// Short backend name used in logs (e.g. "sheets", "file").
    fn name(&self) -> &str;

    /// Return the cell's text. An unset cell reads as an empty string.
    async fn get_cell(&self, cell: &CellRef) -> Result<String, RemoteError>;

    /// Replace the cell's text entirely.
    async fn set_cell(&self, cell: &CellRef, value: &str) -> Result<(), RemoteError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn CellTransport) {}
};
