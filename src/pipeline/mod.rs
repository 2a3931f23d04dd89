//! Pipeline entry points for changelog ingestion.
//!
//! - `sync`: reconcile produced entries with the content store
//! - `load`: run every configured changelog through its adapter
//! - `watch`: reload local changelogs when they change

pub mod load;
pub mod sync;
pub mod watch;

pub use load::{LoadSummary, Loader};
pub use sync::{SyncEngine, SyncPolicy, SyncReport};
pub use watch::watch;
