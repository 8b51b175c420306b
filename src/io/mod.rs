//! I/O module
//!
//! Handles CSV output.
//!
//! # Components
//!
//! - `csv_format` - Account table and demo result serialization

pub mod csv_format;

pub use csv_format::{write_accounts_csv, write_transfer_results_csv};
