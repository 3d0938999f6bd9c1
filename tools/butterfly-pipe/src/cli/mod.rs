//! CLI-only helpers for butterfly-pipe
//!
//! Kept apart from the library so that library users never pull in terminal output.

pub mod progress;

pub use progress::ProgressManager;
