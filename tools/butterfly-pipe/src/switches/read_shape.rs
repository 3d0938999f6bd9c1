use butterfly_common::Result;

use super::existing_file;
use crate::formats::shape;
use crate::graph::build_from_shapes;
use crate::processor::{Capability, Deferred, Processor};
use crate::registry::SwitchDefinition;
use crate::schema::{ParamKind, ParamSpec};
use crate::validate::Params;

pub const DEFINITION: SwitchDefinition = SwitchDefinition {
    names: &["--read-shape", "--rs"],
    about: "Build a routing graph from a line shapefile",
    schema: &[
        ParamSpec::required(&["file"], "Path to the .shp file"),
        ParamSpec::required(&["vehicle", "vehicles"], "Vehicle profiles to evaluate attributes with")
            .kind(ParamKind::VehicleList),
        ParamSpec::required(&["svc"], "Attribute holding the source vertex id"),
        ParamSpec::required(&["tvc"], "Attribute holding the target vertex id"),
    ],
    stable: true,
    consumes: &[],
    produces: Capability::RoutingGraph,
    parse,
};

fn parse(params: &Params, _inputs: Vec<Processor>) -> Result<Vec<Processor>> {
    let path = existing_file(params.text("file")?)?;
    let profiles = params.vehicles("vehicle")?.to_vec();
    // attribute names are matched lower-cased
    let source_key = params.text("svc")?.to_lowercase();
    let target_key = params.text("tvc")?.to_lowercase();

    let graph = Deferred::new(move || {
        log::info!("building routing graph from {}", path.display());
        shape::with_records(&path, |records| {
            build_from_shapes(records, &profiles, &source_key, &target_key)
        })
    });
    Ok(vec![Processor::RoutingGraph(graph)])
}
