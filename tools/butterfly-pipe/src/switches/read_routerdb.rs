use butterfly_common::Result;

use super::existing_file;
use crate::formats::routerdb;
use crate::processor::{Capability, Deferred, Processor};
use crate::registry::SwitchDefinition;
use crate::schema::ParamSpec;
use crate::validate::Params;

pub const DEFINITION: SwitchDefinition = SwitchDefinition {
    names: &["--read-routerdb", "--rr"],
    about: "Load a routing graph from a routerdb file",
    schema: &[ParamSpec::required(&["file"], "Path to the routerdb file").bare()],
    stable: true,
    consumes: &[],
    produces: Capability::RoutingGraph,
    parse,
};

fn parse(params: &Params, _inputs: Vec<Processor>) -> Result<Vec<Processor>> {
    let path = existing_file(params.text("file")?)?;
    let graph = Deferred::new(move || {
        log::info!("loading {}", path.display());
        routerdb::read_file(&path)
    });
    Ok(vec![Processor::RoutingGraph(graph)])
}
