//! File formats read and written by the pipeline switches

pub mod crc;
pub mod pbf;
pub mod routerdb;
pub mod shape;

pub use pbf::{PbfEntities, PbfWriter};
