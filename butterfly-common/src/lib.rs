//! Common utilities for the butterfly-osm toolkit

pub mod error;
pub mod suggest;

pub use error::{Error, Result};
pub use suggest::suggest_correction;
