//! Processors: the capability-tagged results that live on the pipeline stack
//!
//! A processor exposes exactly what a downstream switch may ask of it (its
//! capabilities) and an opaque payload. Work is deferred: entity sources open
//! their input only when pulled, routing graphs are built only when forced,
//! and sinks do nothing until executed.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use butterfly_common::Result;

use crate::graph::RoutingGraph;
use crate::osm::OsmEntity;

/// A declared ability of a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Lazy, single-pass, finite sequence of OSM entities
    EntityStream,
    /// Routing graph built on demand
    RoutingGraph,
    /// Terminal stage that drives its inputs to completion
    Sink,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::EntityStream,
        Capability::RoutingGraph,
        Capability::Sink,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::EntityStream => "entity-stream",
            Capability::RoutingGraph => "routing-graph",
            Capability::Sink => "sink",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Capability::EntityStream => 1 << 0,
            Capability::RoutingGraph => 1 << 1,
            Capability::Sink => 1 << 2,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Zero or more capability markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    pub fn with(self, capability: Capability) -> Self {
        CapabilitySet(self.0 | capability.bit())
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl From<Capability> for CapabilitySet {
    fn from(capability: Capability) -> Self {
        CapabilitySet::EMPTY.with(capability)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|c| c.name()).collect();
        f.write_str(&names.join("+"))
    }
}

/// Boxed single-pass stream of entities
pub type EntityStream = Box<dyn Iterator<Item = Result<OsmEntity>>>;

/// A source of OSM entities that has not been opened yet
pub trait EntitySource {
    /// Short human-readable description for plans and logs.
    fn describe(&self) -> String;

    /// Open the source. Consumes it: a stream can be pulled only once.
    fn open(self: Box<Self>) -> Result<EntityStream>;
}

/// Progress callback: receives the number of items processed so far
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Options for executing sinks
#[derive(Default, Clone)]
pub struct ExecuteOptions {
    /// Optional progress callback
    pub progress: Option<ProgressCallback>,
}

impl ExecuteOptions {
    pub(crate) fn report(&self, count: u64) {
        if let Some(progress) = &self.progress {
            progress(count);
        }
    }
}

/// What a sink did when it ran
#[derive(Debug, Clone, PartialEq)]
pub struct SinkReport {
    pub path: PathBuf,
    /// Number of entities, or graph edges, written
    pub items: u64,
}

/// A terminal stage with a side effect
pub trait Sink {
    fn describe(&self) -> String;

    /// Drive the upstream chain to completion.
    fn execute(self: Box<Self>, options: &ExecuteOptions) -> Result<SinkReport>;
}

type Thunk<T> = Box<dyn FnOnce() -> Result<T>>;

/// A value that is either already computed or knows how to compute itself
pub enum Deferred<T> {
    Pending(Thunk<T>),
    Ready(T),
}

impl<T> Deferred<T> {
    pub fn new(thunk: impl FnOnce() -> Result<T> + 'static) -> Self {
        Deferred::Pending(Box::new(thunk))
    }

    pub fn ready(value: T) -> Self {
        Deferred::Ready(value)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Deferred::Ready(_))
    }

    /// Force the computation and take the value.
    pub fn pull(self) -> Result<T> {
        match self {
            Deferred::Pending(thunk) => thunk(),
            Deferred::Ready(value) => Ok(value),
        }
    }

    /// Compose a further step without forcing anything.
    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> Result<U> + 'static) -> Deferred<U>
    where
        T: 'static,
    {
        Deferred::new(move || f(self.pull()?))
    }
}

/// A pipeline stage result
pub enum Processor {
    EntityStream(Box<dyn EntitySource>),
    RoutingGraph(Deferred<RoutingGraph>),
    Sink(Box<dyn Sink>),
}

impl Processor {
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            Processor::EntityStream(_) => Capability::EntityStream.into(),
            Processor::RoutingGraph(_) => Capability::RoutingGraph.into(),
            Processor::Sink(_) => Capability::Sink.into(),
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    pub fn describe(&self) -> String {
        match self {
            Processor::EntityStream(source) => source.describe(),
            Processor::RoutingGraph(graph) if graph.is_ready() => "routing graph".to_string(),
            Processor::RoutingGraph(_) => "routing graph (deferred)".to_string(),
            Processor::Sink(sink) => sink.describe(),
        }
    }

    pub fn into_entity_stream(self) -> Option<Box<dyn EntitySource>> {
        match self {
            Processor::EntityStream(source) => Some(source),
            _ => None,
        }
    }

    pub fn into_routing_graph(self) -> Option<Deferred<RoutingGraph>> {
        match self {
            Processor::RoutingGraph(graph) => Some(graph),
            _ => None,
        }
    }

    pub fn into_sink(self) -> Option<Box<dyn Sink>> {
        match self {
            Processor::Sink(sink) => Some(sink),
            _ => None,
        }
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("capabilities", &self.capabilities().to_string())
            .field("describe", &self.describe())
            .finish()
    }
}
