//! Single-file JSON backend for the set-aside ledger.
//!
//! The whole ledger lives in one [`LedgerSnapshot`](setaside_core::LedgerSnapshot)
//! document. Every mutation rewrites the file through a temporary sibling and
//! a rename, so a crash mid-write leaves the previous version intact.

pub mod factory;
pub mod repository;

pub use factory::JsonRepositoryFactory;
pub use repository::JsonFileRepository;
