//! SQLite backend for the set-aside ledger.
//!
//! Money and rates are stored as TEXT so decimal scale survives a round
//! trip. Ids are stored as hyphenated UUID strings.

mod decimal;
pub mod factory;
pub mod repository;

pub use factory::{SqliteRepositoryFactory, connection_url};
pub use repository::SqliteRepository;
