//! Tax set-aside engine for freelancers.
//!
//! * [`models`]: plain records (income, tax payments, profile, brackets).
//! * [`calculations`]: pure arithmetic, from bracket tax to monthly
//!   tax-record regeneration.
//! * [`db`]: the [`LedgerRepository`] port, backend registry and an
//!   in-memory backend.
//! * [`store`]: the command/query service used by front ends.

pub mod calculations;
pub mod db;
pub mod input;
pub mod models;
pub mod store;

pub use db::repository::{LedgerRepository, RepositoryError};
pub use models::*;
pub use store::{LedgerStore, StoreError};
