//! Error types for butterfly-osm toolkit
//!
//! Domain errors raised by readers, writers and graph builders. The pipeline core
//! wraps them with the name of the switch that was running.

use thiserror::Error;

/// Main error type for butterfly-osm operations
#[derive(Debug, Error)]
pub enum Error {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A binary file failed its structural or checksum checks
    #[error("Corrupt {format} data: {message}")]
    CorruptData {
        format: &'static str,
        message: String,
    },

    /// OSM PBF decoding or encoding failure
    #[error("PBF error: {0}")]
    PbfError(String),

    /// Shapefile decoding failure
    #[error("Shapefile error: {0}")]
    ShapefileError(String),
}

impl Error {
    pub fn corrupt(format: &'static str, message: impl Into<String>) -> Self {
        Error::CorruptData {
            format,
            message: message.into(),
        }
    }
}

#[cfg(feature = "pbf")]
impl From<osmpbf::Error> for Error {
    fn from(err: osmpbf::Error) -> Self {
        Error::PbfError(err.to_string())
    }
}

#[cfg(feature = "shape")]
impl From<shapefile::Error> for Error {
    fn from(err: shapefile::Error) -> Self {
        Error::ShapefileError(err.to_string())
    }
}

/// Convenience result type for butterfly-osm operations
pub type Result<T> = std::result::Result<T, Error>;
