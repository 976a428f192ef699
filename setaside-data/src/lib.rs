//! CSV import for bracket schedules and income history.

pub mod loader;

pub use loader::{
    BracketRecord, BracketScheduleLoader, IncomeCsvLoader, IncomeCsvRecord, LoaderError,
};
