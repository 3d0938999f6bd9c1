use std::collections::HashMap;

use butterfly_common::{Error, Result};

use super::{AccessMask, Coordinate, Edge, RoutingGraph};
use crate::geo::polyline_length;
use crate::osm::{tag, OsmEntity, Tags, Way};
use crate::processor::EntityStream;
use crate::vehicles::Vehicle;

/// Attribute recorded for edges without a `highway` tag
const UNKNOWN_ATTRIBUTE: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Every routable node becomes a vertex, not only junctions and way ends
    pub all_core: bool,
    /// Record the source way id on each edge
    pub keep_way_ids: bool,
}

/// Access masks for a tag set, `None` when no profile can use it in any direction.
fn access(profiles: &[Vehicle], tags: &[(String, String)]) -> Option<(AccessMask, AccessMask)> {
    let mut forward = 0;
    let mut backward = 0;
    for (i, vehicle) in profiles.iter().enumerate() {
        if let Some(result) = vehicle.evaluate(tags) {
            if result.forward {
                forward |= 1 << i;
            }
            if result.backward {
                backward |= 1 << i;
            }
        }
    }
    (forward | backward != 0).then_some((forward, backward))
}

fn check_profiles(profiles: &[Vehicle]) -> Result<()> {
    if profiles.is_empty() {
        return Err(Error::InvalidInput("no vehicle profiles given".to_string()));
    }
    if profiles.len() > AccessMask::BITS as usize {
        return Err(Error::InvalidInput(format!(
            "at most {} vehicle profiles per graph, got {}",
            AccessMask::BITS,
            profiles.len()
        )));
    }
    Ok(())
}

struct RoutableWay {
    way: Way,
    forward: AccessMask,
    backward: AccessMask,
}

/// Build a sorted routing graph from an entity stream.
pub fn build_from_entities(
    stream: EntityStream,
    profiles: &[Vehicle],
    options: BuildOptions,
) -> Result<RoutingGraph> {
    check_profiles(profiles)?;

    let mut coordinates: HashMap<i64, Coordinate> = HashMap::new();
    let mut ways: Vec<RoutableWay> = Vec::new();
    let mut skipped = 0usize;

    for entity in stream {
        match entity? {
            OsmEntity::Node(node) => {
                coordinates.insert(node.id, Coordinate::new(node.lat, node.lon));
            }
            OsmEntity::Way(way) => match access(profiles, &way.tags) {
                Some((forward, backward)) => ways.push(RoutableWay {
                    way,
                    forward,
                    backward,
                }),
                None => skipped += 1,
            },
            OsmEntity::Relation(_) => {}
        }
    }
    log::debug!(
        "{} nodes, {} routable ways, {} ways skipped",
        coordinates.len(),
        ways.len(),
        skipped
    );

    // Drop references to nodes the stream never delivered
    for routable in &mut ways {
        routable.way.nodes.retain(|id| coordinates.contains_key(id));
    }
    ways.retain(|r| r.way.nodes.len() >= 2);

    let mut uses: HashMap<i64, u32> = HashMap::new();
    for routable in &ways {
        for id in &routable.way.nodes {
            *uses.entry(*id).or_default() += 1;
        }
    }
    let is_vertex = |id: i64, position: usize, len: usize| {
        options.all_core || position == 0 || position + 1 == len || uses.get(&id).copied().unwrap_or(0) > 1
    };

    let mut graph = RoutingGraph::new(profiles.to_vec());
    let mut vertex_of: HashMap<i64, u32> = HashMap::new();
    let mut vertex = |graph: &mut RoutingGraph, id: i64| -> u32 {
        *vertex_of
            .entry(id)
            .or_insert_with(|| graph.add_vertex(coordinates[&id]))
    };

    for routable in ways {
        let RoutableWay {
            way,
            forward,
            backward,
        } = routable;
        let attribute = graph.intern_attribute(tag(&way.tags, "highway").unwrap_or(UNKNOWN_ATTRIBUTE));
        let len = way.nodes.len();

        let mut start = vertex(&mut graph, way.nodes[0]);
        let mut points = vec![coordinates[&way.nodes[0]]];
        for (position, &id) in way.nodes.iter().enumerate().skip(1) {
            points.push(coordinates[&id]);
            if !is_vertex(id, position, len) {
                continue;
            }

            let end = vertex(&mut graph, id);
            let latlon: Vec<(f64, f64)> = points.iter().map(|c| (c.lat, c.lon)).collect();
            let distance = polyline_length(&latlon);
            let shape = points[1..points.len() - 1].to_vec();
            if start != end || !shape.is_empty() {
                graph.add_edge(Edge {
                    from: start,
                    to: end,
                    distance,
                    attribute,
                    forward,
                    backward,
                    shape,
                    way_id: options.keep_way_ids.then_some(way.id),
                });
            }

            start = end;
            points = vec![coordinates[&id]];
        }
    }

    graph.sort();
    log::debug!(
        "routing graph: {} vertices, {} edges",
        graph.vertex_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// One polyline from a shapefile with its attribute row as tags
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    /// (lat, lon) points, all parts concatenated
    pub points: Vec<(f64, f64)>,
    pub tags: Tags,
}

/// Build a sorted routing graph from shapefile polylines.
///
/// Vertices are identified by the values of the `source_key` and `target_key`
/// attributes rather than by coordinates.
pub fn build_from_shapes<I>(
    records: I,
    profiles: &[Vehicle],
    source_key: &str,
    target_key: &str,
) -> Result<RoutingGraph>
where
    I: IntoIterator<Item = Result<ShapeRecord>>,
{
    check_profiles(profiles)?;

    let mut graph = RoutingGraph::new(profiles.to_vec());
    let mut vertex_of: HashMap<String, u32> = HashMap::new();
    let mut skipped = 0usize;

    for (row, record) in records.into_iter().enumerate() {
        let record = record?;
        let Some((forward, backward)) = access(profiles, &record.tags) else {
            skipped += 1;
            continue;
        };
        let (Some(&first), Some(&last)) = (record.points.first(), record.points.last()) else {
            skipped += 1;
            continue;
        };

        let key = |name: &str| {
            tag(&record.tags, name).map(str::to_string).ok_or_else(|| {
                Error::InvalidInput(format!("shape record {row} has no '{name}' attribute"))
            })
        };
        let source = key(source_key)?;
        let target = key(target_key)?;

        let from = *vertex_of
            .entry(source)
            .or_insert_with(|| graph.add_vertex(Coordinate::new(first.0, first.1)));
        let to = *vertex_of
            .entry(target)
            .or_insert_with(|| graph.add_vertex(Coordinate::new(last.0, last.1)));

        let attribute = graph.intern_attribute(tag(&record.tags, "highway").unwrap_or(UNKNOWN_ATTRIBUTE));
        let shape = if record.points.len() > 2 {
            record.points[1..record.points.len() - 1]
                .iter()
                .map(|&(lat, lon)| Coordinate::new(lat, lon))
                .collect()
        } else {
            Vec::new()
        };

        graph.add_edge(Edge {
            from,
            to,
            distance: polyline_length(&record.points),
            attribute,
            forward,
            backward,
            shape,
            way_id: None,
        });
    }

    if skipped > 0 {
        log::debug!("{skipped} shape record(s) not routable");
    }
    graph.sort();
    Ok(graph)
}
