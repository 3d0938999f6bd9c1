//! routerdb format - a sorted routing graph with a CRC-64 footer
//!
//! Layout (little-endian):
//! - header: magic "RTDB", version u16, flags u16, profile count u32,
//!   attribute count u32, vertex count u64, edge count u64
//! - profile names and attribute strings, each u16 length + UTF-8 bytes
//! - vertices: lat f64, lon f64
//! - edges: from u32, to u32, distance f64, attribute u32, forward u8,
//!   backward u8, shape count u32, shape points (lat f64, lon f64),
//!   way id i64 when flag bit 0 is set
//! - footer: CRC-64 of everything above

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use butterfly_common::{Error, Result};

use super::crc::{verify_footer, ChecksumWriter};
use crate::graph::{Coordinate, Edge, RoutingGraph};
use crate::vehicles::Vehicle;

const MAGIC: [u8; 4] = *b"RTDB";
const VERSION: u16 = 1;
const FLAG_WAY_IDS: u16 = 1;
const HEADER_LEN: usize = 32;
const FORMAT: &str = "routerdb";

fn corrupt(message: impl Into<String>) -> Error {
    Error::corrupt(FORMAT, message)
}

fn write_str<W: Write>(out: &mut W, s: &str) -> Result<()> {
    let len = u16::try_from(s.len())
        .map_err(|_| Error::InvalidInput(format!("string of {} bytes is too long for a routerdb", s.len())))?;
    out.write_all(&len.to_le_bytes())?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

/// Write `graph` to `out`, returning the number of bytes written including the footer.
pub fn write<W: Write>(out: W, graph: &RoutingGraph) -> Result<u64> {
    let mut out = ChecksumWriter::new(out);
    let way_ids = graph.has_way_ids();
    let flags = if way_ids { FLAG_WAY_IDS } else { 0 };

    out.write_all(&MAGIC)?;
    out.write_all(&VERSION.to_le_bytes())?;
    out.write_all(&flags.to_le_bytes())?;
    out.write_all(&(graph.profiles().len() as u32).to_le_bytes())?;
    out.write_all(&(graph.attributes().len() as u32).to_le_bytes())?;
    out.write_all(&(graph.vertex_count() as u64).to_le_bytes())?;
    out.write_all(&(graph.edge_count() as u64).to_le_bytes())?;

    for profile in graph.profiles() {
        write_str(&mut out, profile.name())?;
    }
    for attribute in graph.attributes() {
        write_str(&mut out, attribute)?;
    }
    for vertex in graph.vertices() {
        out.write_all(&vertex.lat.to_le_bytes())?;
        out.write_all(&vertex.lon.to_le_bytes())?;
    }
    for edge in graph.edges() {
        out.write_all(&edge.from.to_le_bytes())?;
        out.write_all(&edge.to.to_le_bytes())?;
        out.write_all(&edge.distance.to_le_bytes())?;
        out.write_all(&edge.attribute.to_le_bytes())?;
        out.write_all(&[edge.forward, edge.backward])?;
        out.write_all(&(edge.shape.len() as u32).to_le_bytes())?;
        for point in &edge.shape {
            out.write_all(&point.lat.to_le_bytes())?;
            out.write_all(&point.lon.to_le_bytes())?;
        }
        if way_ids {
            // edges without an id get 0, which no OSM way uses
            out.write_all(&edge.way_id.unwrap_or(0).to_le_bytes())?;
        }
    }

    let body = out.bytes_written();
    out.finish()?;
    Ok(body + 8)
}

pub fn write_file<P: AsRef<Path>>(path: P, graph: &RoutingGraph) -> Result<u64> {
    let file = File::create(path.as_ref())?;
    write(BufWriter::new(file), graph)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| corrupt(format!("unexpected end of data at byte {}", self.pos)))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    fn coordinate(&mut self) -> Result<Coordinate> {
        Ok(Coordinate::new(self.f64()?, self.f64()?))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| corrupt("string is not valid UTF-8"))
    }

    /// Bound a declared count by the bytes left, so a corrupt count cannot
    /// trigger a huge allocation.
    fn count(&self, declared: u64, min_item_len: usize) -> Result<usize> {
        let left = (self.data.len() - self.pos) / min_item_len.max(1);
        usize::try_from(declared)
            .ok()
            .filter(|&n| n <= left)
            .ok_or_else(|| corrupt(format!("declared count {declared} exceeds file size")))
    }
}

/// Parse a routerdb from memory.
pub fn read(data: &[u8]) -> Result<RoutingGraph> {
    if data.len() < HEADER_LEN + 8 {
        return Err(corrupt(format!("{} bytes is too short", data.len())));
    }
    if data[..4] != MAGIC {
        return Err(corrupt("bad magic, not a routerdb file"));
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != VERSION {
        return Err(corrupt(format!(
            "unsupported version {version}, expected {VERSION}"
        )));
    }
    let body = verify_footer(data).map_err(corrupt)?;

    let mut cursor = Cursor { data: body, pos: 6 };
    let flags = cursor.u16()?;
    let profile_count = cursor.u32()?;
    let attribute_count = cursor.u32()?;
    let vertex_count = cursor.u64()?;
    let edge_count = cursor.u64()?;

    let mut profiles = Vec::new();
    for _ in 0..cursor.count(u64::from(profile_count), 2)? {
        let name = cursor.string()?;
        let vehicle =
            Vehicle::from_name(&name).ok_or_else(|| corrupt(format!("unknown profile '{name}'")))?;
        profiles.push(vehicle);
    }

    let mut attributes = Vec::new();
    for _ in 0..cursor.count(u64::from(attribute_count), 2)? {
        attributes.push(cursor.string()?);
    }

    let vertex_count = cursor.count(vertex_count, 16)?;
    let mut vertices = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        vertices.push(cursor.coordinate()?);
    }

    let way_ids = flags & FLAG_WAY_IDS != 0;
    let edge_count = cursor.count(edge_count, 26)?;
    let mut edges = Vec::with_capacity(edge_count);
    for i in 0..edge_count {
        let from = cursor.u32()?;
        let to = cursor.u32()?;
        let distance = cursor.f64()?;
        let attribute = cursor.u32()?;
        let forward = cursor.u8()?;
        let backward = cursor.u8()?;
        let shape_len = cursor.u32()?;
        let mut shape = Vec::new();
        for _ in 0..cursor.count(u64::from(shape_len), 16)? {
            shape.push(cursor.coordinate()?);
        }
        let way_id = if way_ids {
            Some(cursor.i64()?).filter(|&id| id != 0)
        } else {
            None
        };

        if from as usize >= vertices.len() || to as usize >= vertices.len() {
            return Err(corrupt(format!("edge {i} references a missing vertex")));
        }
        if attribute as usize >= attributes.len() {
            return Err(corrupt(format!("edge {i} references a missing attribute")));
        }

        edges.push(Edge {
            from,
            to,
            distance,
            attribute,
            forward,
            backward,
            shape,
            way_id,
        });
    }

    if cursor.pos != body.len() {
        return Err(corrupt(format!(
            "{} trailing bytes after the last edge",
            body.len() - cursor.pos
        )));
    }

    Ok(RoutingGraph::from_parts(profiles, attributes, vertices, edges))
}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<RoutingGraph> {
    let data = std::fs::read(path.as_ref())?;
    read(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(with_ids: bool) -> RoutingGraph {
        let mut graph = RoutingGraph::new(vec![Vehicle::Car, Vehicle::Bicycle]);
        let residential = graph.intern_attribute("residential");
        let a = graph.add_vertex(Coordinate::new(50.85, 4.35));
        let b = graph.add_vertex(Coordinate::new(50.86, 4.36));
        graph.add_edge(Edge {
            from: a,
            to: b,
            distance: 1320.5,
            attribute: residential,
            forward: 0b11,
            backward: 0b10,
            shape: vec![Coordinate::new(50.855, 4.351)],
            way_id: with_ids.then_some(42),
        });
        graph.sort();
        graph
    }

    fn bytes(graph: &RoutingGraph) -> Vec<u8> {
        let mut out = Vec::new();
        let len = write(&mut out, graph).unwrap();
        assert_eq!(len as usize, out.len());
        out
    }

    #[test]
    fn test_graph_survives_write_and_read() {
        for with_ids in [false, true] {
            let graph = sample(with_ids);
            let read_back = read(&bytes(&graph)).unwrap();
            assert_eq!(read_back, graph);
            assert_eq!(read_back.has_way_ids(), with_ids);
        }
    }

    #[test]
    fn test_flipped_byte_is_corrupt() {
        let mut data = bytes(&sample(false));
        let middle = data.len() / 2;
        data[middle] ^= 0x40;
        let err = read(&data).unwrap_err();
        assert!(matches!(err, Error::CorruptData { format: "routerdb", .. }), "{err}");
    }

    #[test]
    fn test_bad_magic_and_version() {
        let mut data = bytes(&sample(false));
        data[0] = b'X';
        assert!(read(&data).unwrap_err().to_string().contains("magic"));

        let mut data = bytes(&sample(false));
        data[4] = 9;
        assert!(read(&data).unwrap_err().to_string().contains("version"));

        assert!(matches!(read(b"RTDB"), Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.routerdb");
        let graph = sample(true);
        write_file(&path, &graph).unwrap();
        assert_eq!(read_file(&path).unwrap(), graph);
    }
}
