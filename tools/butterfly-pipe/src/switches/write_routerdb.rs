use std::path::PathBuf;

use butterfly_common::Result;

use super::{routing_graph_input, ScopedOutput};
use crate::formats::routerdb;
use crate::graph::RoutingGraph;
use crate::processor::{Capability, Deferred, ExecuteOptions, Processor, Sink, SinkReport};
use crate::registry::SwitchDefinition;
use crate::schema::ParamSpec;
use crate::validate::Params;

pub const DEFINITION: SwitchDefinition = SwitchDefinition {
    names: &["--write-routerdb", "--wr"],
    about: "Write the routing graph to a routerdb file",
    schema: &[ParamSpec::required(&["file"], "Output routerdb path").bare()],
    stable: true,
    consumes: &[Capability::RoutingGraph],
    produces: Capability::Sink,
    parse,
};

struct RouterDbSink {
    graph: Deferred<RoutingGraph>,
    path: PathBuf,
}

impl Sink for RouterDbSink {
    fn describe(&self) -> String {
        format!("routing graph -> {}", self.path.display())
    }

    fn execute(self: Box<Self>, options: &ExecuteOptions) -> Result<SinkReport> {
        let RouterDbSink { graph, path } = *self;
        let graph = graph.pull()?;
        log::info!(
            "routing graph has {} vertices and {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );

        let output = ScopedOutput::create(&path)?;
        let bytes = routerdb::write(output.writer(), &graph)?;
        output.commit()?;
        log::debug!("{bytes} bytes written to {}", path.display());

        let items = graph.edge_count() as u64;
        options.report(items);
        Ok(SinkReport { path, items })
    }
}

fn parse(params: &Params, inputs: Vec<Processor>) -> Result<Vec<Processor>> {
    let graph = routing_graph_input(inputs)?;
    let path = PathBuf::from(params.text("file")?);
    Ok(vec![Processor::Sink(Box::new(RouterDbSink { graph, path }))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_build_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.routerdb");
        let sink = Box::new(RouterDbSink {
            graph: Deferred::new(|| Err(butterfly_common::Error::InvalidInput("no data".into()))),
            path: path.clone(),
        });
        assert!(sink.execute(&ExecuteOptions::default()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_writes_ready_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.routerdb");
        let sink = Box::new(RouterDbSink {
            graph: Deferred::ready(RoutingGraph::new(vec![crate::vehicles::Vehicle::Car])),
            path: path.clone(),
        });
        let report = sink.execute(&ExecuteOptions::default()).unwrap();
        assert_eq!(report.items, 0);
        assert_eq!(routerdb::read_file(&path).unwrap().profiles().len(), 1);
    }
}
