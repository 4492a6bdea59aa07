//! Shared utility helpers.

pub mod error;
pub(crate) mod fs;

pub use error::{SymMatchError, SymMatchResult};
