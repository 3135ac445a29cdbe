//! Utility types shared across the engine.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
