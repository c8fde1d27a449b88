//! Remote cell access for cellplan.
//!
//! The plan lives in one spreadsheet cell. This crate provides the single
//! read/overwrite primitive ([`CellTransport`]) and the resilient layer
//! around it ([`ResilientCell`]):
//!
//! ```text
//! PlanStore
//!     |
//!     v
//! ResilientCell --rate limit--> with_retry --> &dyn CellTransport
//!                                                  |
//!                     +----------------------------+-------------+
//!                     v                            v             v
//!               SheetsClient                 FileTransport  MemoryTransport
//!            (values REST API)              (local JSON)    (in-process)
//! ```

pub mod cell_ref;
pub mod client;
pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod rate_limit;
pub mod resilient;
pub mod retry;
pub mod transport;

pub use cell_ref::{CellRef, CellRefError};
pub use client::SheetsClient;
pub use config::{RetrySettings, SheetsConfig};
pub use error::{NetworkCode, RETRYABLE_STATUSES, RemoteError};
pub use file::FileTransport;
pub use memory::MemoryTransport;
pub use rate_limit::RateLimiter;
pub use resilient::ResilientCell;
pub use retry::{RetryPolicy, with_retry};
pub use transport::CellTransport;
