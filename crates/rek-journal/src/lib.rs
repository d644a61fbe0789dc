//! Write-ahead journal for the rek stock ledger.
//!
//! Every committed ledger operation is serialized as one framed record and
//! appended here before any in-memory state changes. On restart the journal
//! is read front-to-back and replayed, so the stock rows, documents and the
//! audit log survive the process. A torn final frame (crash mid-write) is
//! discarded whole, which keeps multi-line operations all-or-nothing on disk.

pub mod error;
pub mod journal;

pub use error::{JournalError, Result};
pub use journal::{Journal, JournalConfig, Recovered, SyncMode};
