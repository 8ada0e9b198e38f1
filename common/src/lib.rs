//! Common error types for the herd project.

pub mod error;

pub use error::{HerdError, Result};
