//! Routing graph: vertices, edges with per-profile access, and the builders
//! that turn entity streams or shapefile records into one.

mod builder;

pub use builder::{build_from_entities, build_from_shapes, BuildOptions, ShapeRecord};

use std::collections::HashMap;

use crate::geo::hilbert_index;
use crate::vehicles::Vehicle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Bit `i` is set when profile `i` of the graph may use the edge.
pub type AccessMask = u8;

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: u32,
    pub to: u32,
    /// Metres
    pub distance: f64,
    /// Index into the attribute table
    pub attribute: u32,
    pub forward: AccessMask,
    pub backward: AccessMask,
    /// Intermediate points between `from` and `to`
    pub shape: Vec<Coordinate>,
    pub way_id: Option<i64>,
}

/// A routable network for a fixed set of vehicle profiles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingGraph {
    profiles: Vec<Vehicle>,
    attributes: Vec<String>,
    attribute_index: HashMap<String, u32>,
    vertices: Vec<Coordinate>,
    edges: Vec<Edge>,
}

impl RoutingGraph {
    pub fn new(profiles: Vec<Vehicle>) -> Self {
        Self {
            profiles,
            ..Self::default()
        }
    }

    pub fn profiles(&self) -> &[Vehicle] {
        &self.profiles
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_way_ids(&self) -> bool {
        self.edges.iter().any(|e| e.way_id.is_some())
    }

    /// Id of an attribute string, adding it on first use.
    pub fn intern_attribute(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.attribute_index.get(value) {
            return id;
        }
        let id = self.attributes.len() as u32;
        self.attributes.push(value.to_string());
        self.attribute_index.insert(value.to_string(), id);
        id
    }

    pub fn add_vertex(&mut self, coordinate: Coordinate) -> u32 {
        self.vertices.push(coordinate);
        (self.vertices.len() - 1) as u32
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Reassemble a graph from its parts, as stored on disk.
    pub(crate) fn from_parts(
        profiles: Vec<Vehicle>,
        attributes: Vec<String>,
        vertices: Vec<Coordinate>,
        edges: Vec<Edge>,
    ) -> Self {
        let attribute_index = attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i as u32))
            .collect();
        Self {
            profiles,
            attributes,
            attribute_index,
            vertices,
            edges,
        }
    }

    /// Order vertices along a Hilbert curve and edges by (from, to).
    pub fn sort(&mut self) {
        let mut order: Vec<u32> = (0..self.vertices.len() as u32).collect();
        order.sort_by_key(|&v| {
            let c = self.vertices[v as usize];
            (hilbert_index(c.lat, c.lon), v)
        });

        let mut remap = vec![0u32; order.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old as usize] = new as u32;
        }

        self.vertices = order.iter().map(|&old| self.vertices[old as usize]).collect();
        for edge in &mut self.edges {
            edge.from = remap[edge.from as usize];
            edge.to = remap[edge.to as usize];
        }
        self.edges.sort_by_key(|e| (e.from, e.to));
    }

    pub fn is_sorted(&self) -> bool {
        let vertices_sorted = self
            .vertices
            .windows(2)
            .all(|w| hilbert_index(w[0].lat, w[0].lon) <= hilbert_index(w[1].lat, w[1].lon));
        let edges_sorted = self
            .edges
            .windows(2)
            .all(|w| (w[0].from, w[0].to) <= (w[1].from, w[1].to));
        vertices_sorted && edges_sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: u32, to: u32) -> Edge {
        Edge {
            from,
            to,
            distance: 1.0,
            attribute: 0,
            forward: 1,
            backward: 1,
            shape: Vec::new(),
            way_id: None,
        }
    }

    #[test]
    fn test_intern_attribute() {
        let mut graph = RoutingGraph::new(vec![Vehicle::Car]);
        let a = graph.intern_attribute("primary");
        let b = graph.intern_attribute("residential");
        assert_eq!(graph.intern_attribute("primary"), a);
        assert_ne!(a, b);
        assert_eq!(graph.attributes(), &["primary".to_string(), "residential".to_string()]);
    }

    #[test]
    fn test_sort_keeps_topology() {
        let mut graph = RoutingGraph::new(vec![Vehicle::Car]);
        let sydney = graph.add_vertex(Coordinate::new(-33.9, 151.2));
        let brussels = graph.add_vertex(Coordinate::new(50.85, 4.35));
        let ghent = graph.add_vertex(Coordinate::new(51.05, 3.72));
        graph.add_edge(edge(ghent, brussels));
        graph.add_edge(edge(sydney, ghent));

        graph.sort();
        assert!(graph.is_sorted());

        let position = |lat: f64| {
            graph
                .vertices()
                .iter()
                .position(|c| c.lat == lat)
                .unwrap() as u32
        };
        let pairs: Vec<(u32, u32)> = graph.edges().iter().map(|e| (e.from, e.to)).collect();
        assert!(pairs.contains(&(position(51.05), position(50.85))));
        assert!(pairs.contains(&(position(-33.9), position(51.05))));
    }

    #[test]
    fn test_way_ids_flag() {
        let mut graph = RoutingGraph::new(vec![Vehicle::Car]);
        graph.add_vertex(Coordinate::new(0.0, 0.0));
        graph.add_edge(edge(0, 0));
        assert!(!graph.has_way_ids());
        graph.add_edge(Edge {
            way_id: Some(7),
            ..edge(0, 0)
        });
        assert!(graph.has_way_ids());
    }
}
