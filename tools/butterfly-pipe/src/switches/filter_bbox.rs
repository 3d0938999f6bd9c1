use std::collections::HashSet;

use butterfly_common::{Error, Result};

use super::entity_stream_input;
use crate::osm::{MemberKind, OsmEntity};
use crate::processor::{Capability, EntitySource, EntityStream, Processor};
use crate::registry::SwitchDefinition;
use crate::schema::{ParamKind, ParamSpec};
use crate::validate::Params;

pub const DEFINITION: SwitchDefinition = SwitchDefinition {
    names: &["--filter-bounding-box", "--bb"],
    about: "Keep only the data inside a bounding box",
    schema: &[
        ParamSpec::required(&["left"], "Western longitude").kind(ParamKind::Number),
        ParamSpec::required(&["right"], "Eastern longitude").kind(ParamKind::Number),
        ParamSpec::required(&["top"], "Northern latitude").kind(ParamKind::Number),
        ParamSpec::required(&["bottom"], "Southern latitude").kind(ParamKind::Number),
    ],
    stable: true,
    consumes: &[Capability::EntityStream],
    produces: Capability::EntityStream,
    parse,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&left) || !(-180.0..=180.0).contains(&right) {
            return Err(Error::InvalidInput(format!(
                "longitudes must be within [-180, 180], got left={left} right={right}"
            )));
        }
        if !(-90.0..=90.0).contains(&bottom) || !(-90.0..=90.0).contains(&top) {
            return Err(Error::InvalidInput(format!(
                "latitudes must be within [-90, 90], got bottom={bottom} top={top}"
            )));
        }
        if left >= right {
            return Err(Error::InvalidInput(format!(
                "left ({left}) must be less than right ({right})"
            )));
        }
        if bottom >= top {
            return Err(Error::InvalidInput(format!(
                "bottom ({bottom}) must be less than top ({top})"
            )));
        }
        Ok(Self {
            left,
            right,
            top,
            bottom,
        })
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.bottom..=self.top).contains(&lat) && (self.left..=self.right).contains(&lon)
    }
}

/// Keeps nodes inside the box, ways with at least one kept node, and
/// relations with at least one kept member. Relies on the usual
/// nodes-ways-relations order of OSM streams.
struct BoundingBoxFilter {
    upstream: Box<dyn EntitySource>,
    bbox: BoundingBox,
}

impl EntitySource for BoundingBoxFilter {
    fn describe(&self) -> String {
        let b = &self.bbox;
        format!(
            "{} | bbox [{}, {}, {}, {}]",
            self.upstream.describe(),
            b.left,
            b.bottom,
            b.right,
            b.top
        )
    }

    fn open(self: Box<Self>) -> Result<EntityStream> {
        let bbox = self.bbox;
        let mut nodes = HashSet::new();
        let mut ways = HashSet::new();
        let mut relations = HashSet::new();

        let stream = self.upstream.open()?.filter(move |entity| {
            let Ok(entity) = entity else {
                return true;
            };
            match entity {
                OsmEntity::Node(n) => {
                    let keep = bbox.contains(n.lat, n.lon);
                    if keep {
                        nodes.insert(n.id);
                    }
                    keep
                }
                OsmEntity::Way(w) => {
                    let keep = w.nodes.iter().any(|id| nodes.contains(id));
                    if keep {
                        ways.insert(w.id);
                    }
                    keep
                }
                OsmEntity::Relation(r) => {
                    let keep = r.members.iter().any(|m| match m.kind {
                        MemberKind::Node => nodes.contains(&m.ref_id),
                        MemberKind::Way => ways.contains(&m.ref_id),
                        MemberKind::Relation => relations.contains(&m.ref_id),
                    });
                    if keep {
                        relations.insert(r.id);
                    }
                    keep
                }
            }
        });
        Ok(Box::new(stream))
    }
}

fn parse(params: &Params, inputs: Vec<Processor>) -> Result<Vec<Processor>> {
    let bbox = BoundingBox::new(
        params.number("left")?,
        params.number("right")?,
        params.number("top")?,
        params.number("bottom")?,
    )?;
    let upstream = entity_stream_input(inputs)?;
    Ok(vec![Processor::EntityStream(Box::new(BoundingBoxFilter {
        upstream,
        bbox,
    }))])
}
