//! Declarative MongoDB index reconciliation for the run tracking collections.
//!
//! The desired indexes of every collection are declared in [`schema`]; the
//! [`reconciler`] diffs them against what the database reports through an
//! [`core::client::database::IndexCatalog`] and applies the minimal set of
//! drops and creates. Re-running against a reconciled database changes nothing.

pub mod cli;
pub mod commands;
pub mod core;
pub mod error;
pub mod reconciler;
pub mod schema;
pub mod types;
pub mod utils;


pub use error::{ReconcilerError, ReconcilerResult};
