use butterfly_common::Result;

use super::entity_stream_input;
use crate::graph::{build_from_entities, BuildOptions};
use crate::processor::{Capability, Deferred, Processor};
use crate::registry::SwitchDefinition;
use crate::schema::{ParamKind, ParamSpec};
use crate::validate::Params;

pub const DEFINITION: SwitchDefinition = SwitchDefinition {
    names: &["--create-routerdb"],
    about: "Build a routing graph from the entity stream",
    schema: &[
        ParamSpec::optional(
            &["vehicles", "vehicle"],
            "Comma-separated vehicle profiles, or all / motorvehicles",
            "car",
        )
        .kind(ParamKind::VehicleList),
        ParamSpec::optional(&["allcore"], "Make every routable node a vertex", "false")
            .kind(ParamKind::Bool)
            .bare(),
        ParamSpec::optional(&["keepwayids"], "Store the OSM way id on each edge", "false")
            .kind(ParamKind::Bool)
            .bare(),
    ],
    stable: true,
    consumes: &[Capability::EntityStream],
    produces: Capability::RoutingGraph,
    parse,
};

fn parse(params: &Params, inputs: Vec<Processor>) -> Result<Vec<Processor>> {
    let profiles = params.vehicles("vehicles")?.to_vec();
    let options = BuildOptions {
        all_core: params.flag("allcore"),
        keep_way_ids: params.flag("keepwayids"),
    };
    let source = entity_stream_input(inputs)?;

    let graph = Deferred::new(move || {
        log::info!(
            "building routing graph from {} for {}",
            source.describe(),
            profiles.iter().map(|v| v.name()).collect::<Vec<_>>().join(",")
        );
        build_from_entities(source.open()?, &profiles, options)
    });
    Ok(vec![Processor::RoutingGraph(graph)])
}
