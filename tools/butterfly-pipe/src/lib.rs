//! # Butterfly-pipe
//!
//! Builds OpenStreetMap processing pipelines from a chain of command-line
//! switches. Each switch takes processors off a stack and pushes new ones;
//! the final stack holds the sinks that run the pipeline.
//!
//! ```no_run
//! use butterfly_pipe::{ExecuteOptions, Pipeline, SwitchRegistry};
//!
//! let args = ["--read-pbf", "belgium.osm.pbf", "--create-routerdb", "--write-routerdb", "belgium.routerdb"];
//! let pipeline = Pipeline::build(args, SwitchRegistry::builtin())?;
//! pipeline.execute(&ExecuteOptions::default())?;
//! # Ok::<(), butterfly_pipe::PipelineError>(())
//! ```

pub mod error;
pub mod formats;
pub mod geo;
pub mod graph;
pub mod help;
pub mod machine;
pub mod osm;
pub mod pipeline;
pub mod processor;
pub mod registry;
pub mod schema;
pub mod switches;
pub mod tokenize;
pub mod validate;
pub mod vehicles;

pub use error::{PipelineError, Result};
pub use graph::RoutingGraph;
pub use machine::{interpret, StackMachine, Stage};
pub use pipeline::{execute, Pipeline};
pub use processor::{
    Capability, CapabilitySet, Deferred, EntitySource, ExecuteOptions, ProgressCallback,
    Processor, Sink, SinkReport,
};
pub use registry::{SwitchDefinition, SwitchRegistry};
pub use tokenize::{tokenize, Invocation};
pub use validate::{validate, ParamValue, Params};
pub use vehicles::Vehicle;
