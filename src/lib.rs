//! Interprocess-locked store of deduplicated JSON records.
//!
//! Many independent processes can record results into one shared file. Each
//! opens a [`RecordSession`], which holds an exclusive lock on a sibling
//! `.lock` file, loads the records, accepts identity-keyed upserts and writes
//! the file back on close only if something changed.
//!
//! The JSON payload may be wrapped in caller-supplied header and footer bytes
//! so it can live inside a larger host document.

pub mod codec;
pub mod config;
mod error;
pub mod lock;
mod paths;
mod schema;
mod session;
mod store;
pub mod table;

pub use config::{EnvConfig, StoreConfig};
pub use error::RecordStoreError;
pub use lock::InterProcessLock;
pub use paths::{lock_path, table_path};
pub use schema::{IdentityKeys, Record, DESC_KEY};
pub use session::{RecordFile, RecordSession};
pub use store::{PutOutcome, RecordStore};
pub use table::{export_table, render_table};
