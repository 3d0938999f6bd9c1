//! OSM PBF reading (through `osmpbf`) and writing
//!
//! The writer emits an `OSMHeader` blob followed by zlib-compressed `OSMData`
//! blobs of at most [`ENTITIES_PER_BLOCK`] entities. Each block carries its own
//! string table; nodes are written as plain nodes, way refs and relation member
//! ids are delta-coded.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use butterfly_common::{Error, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use osmpbf::{BlobDecode, BlobReader, Element, PrimitiveBlock, RelMemberType};
use prost::Message;

use crate::osm::{owned_tags, Member, MemberKind, Node, OsmEntity, Relation, Way};

pub const ENTITIES_PER_BLOCK: usize = 8000;

/// Nanodegrees per coordinate unit
const GRANULARITY: i32 = 100;

const REQUIRED_FEATURES: &[&str] = &["OsmSchema-V0.6"];
const WRITING_PROGRAM: &str = concat!("butterfly-pipe ", env!("CARGO_PKG_VERSION"));

// --- Reading ---

/// Lazy entity iterator over a PBF file, decoding one block at a time
pub struct PbfEntities {
    blobs: BlobReader<BufReader<File>>,
    buffer: std::vec::IntoIter<OsmEntity>,
    failed: bool,
}

impl PbfEntities {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            blobs: BlobReader::from_path(path)?,
            buffer: Vec::new().into_iter(),
            failed: false,
        })
    }
}

impl Iterator for PbfEntities {
    type Item = Result<OsmEntity>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entity) = self.buffer.next() {
                return Some(Ok(entity));
            }
            if self.failed {
                return None;
            }

            let blob = match self.blobs.next()? {
                Ok(blob) => blob,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e.into()));
                }
            };
            let decoded = match blob.decode() {
                Ok(BlobDecode::OsmData(block)) => decode_block(&block),
                Ok(_) => Ok(Vec::new()),
                Err(e) => Err(e.into()),
            };

            match decoded {
                Ok(entities) => self.buffer = entities.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn decode_block(block: &PrimitiveBlock) -> Result<Vec<OsmEntity>> {
    let mut entities = Vec::new();
    for element in block.elements() {
        let entity = match element {
            Element::Node(n) => OsmEntity::Node(Node {
                id: n.id(),
                lat: n.lat(),
                lon: n.lon(),
                tags: owned_tags(n.tags()),
            }),
            Element::DenseNode(n) => OsmEntity::Node(Node {
                id: n.id(),
                lat: n.lat(),
                lon: n.lon(),
                tags: owned_tags(n.tags()),
            }),
            Element::Way(w) => OsmEntity::Way(Way {
                id: w.id(),
                nodes: w.refs().collect(),
                tags: owned_tags(w.tags()),
            }),
            Element::Relation(r) => {
                let mut members = Vec::new();
                for m in r.members() {
                    members.push(Member {
                        role: m.role()?.to_string(),
                        kind: match m.member_type {
                            RelMemberType::Node => MemberKind::Node,
                            RelMemberType::Way => MemberKind::Way,
                            RelMemberType::Relation => MemberKind::Relation,
                        },
                        ref_id: m.member_id,
                    });
                }
                OsmEntity::Relation(Relation {
                    id: r.id(),
                    members,
                    tags: owned_tags(r.tags()),
                })
            }
        };
        entities.push(entity);
    }
    Ok(entities)
}

// --- Wire messages (fileformat.proto / osmformat.proto subset) ---

#[derive(Clone, PartialEq, Message)]
struct BlobHeader {
    #[prost(string, required, tag = "1")]
    r#type: String,
    #[prost(int32, required, tag = "3")]
    datasize: i32,
}

#[derive(Clone, PartialEq, Message)]
struct Blob {
    #[prost(int32, optional, tag = "2")]
    raw_size: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    zlib_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
struct HeaderBlock {
    #[prost(string, repeated, tag = "4")]
    required_features: Vec<String>,
    #[prost(string, optional, tag = "16")]
    writingprogram: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
struct StringTable {
    #[prost(bytes = "vec", repeated, tag = "1")]
    s: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
struct PbfPrimitiveBlock {
    #[prost(message, optional, tag = "1")]
    stringtable: Option<StringTable>,
    #[prost(message, repeated, tag = "2")]
    primitivegroup: Vec<PrimitiveGroup>,
    #[prost(int32, optional, tag = "17")]
    granularity: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
struct PrimitiveGroup {
    #[prost(message, repeated, tag = "1")]
    nodes: Vec<PbfNode>,
    #[prost(message, repeated, tag = "3")]
    ways: Vec<PbfWay>,
    #[prost(message, repeated, tag = "4")]
    relations: Vec<PbfRelation>,
}

#[derive(Clone, PartialEq, Message)]
struct PbfNode {
    #[prost(sint64, required, tag = "1")]
    id: i64,
    #[prost(uint32, repeated, packed = "true", tag = "2")]
    keys: Vec<u32>,
    #[prost(uint32, repeated, packed = "true", tag = "3")]
    vals: Vec<u32>,
    #[prost(sint64, required, tag = "8")]
    lat: i64,
    #[prost(sint64, required, tag = "9")]
    lon: i64,
}

#[derive(Clone, PartialEq, Message)]
struct PbfWay {
    #[prost(int64, required, tag = "1")]
    id: i64,
    #[prost(uint32, repeated, packed = "true", tag = "2")]
    keys: Vec<u32>,
    #[prost(uint32, repeated, packed = "true", tag = "3")]
    vals: Vec<u32>,
    #[prost(sint64, repeated, packed = "true", tag = "8")]
    refs: Vec<i64>,
}

#[derive(Clone, PartialEq, Message)]
struct PbfRelation {
    #[prost(int64, required, tag = "1")]
    id: i64,
    #[prost(uint32, repeated, packed = "true", tag = "2")]
    keys: Vec<u32>,
    #[prost(uint32, repeated, packed = "true", tag = "3")]
    vals: Vec<u32>,
    #[prost(int32, repeated, packed = "true", tag = "8")]
    roles_sid: Vec<i32>,
    #[prost(sint64, repeated, packed = "true", tag = "9")]
    memids: Vec<i64>,
    /// 0 node, 1 way, 2 relation
    #[prost(int32, repeated, packed = "true", tag = "10")]
    types: Vec<i32>,
}

// --- Writing ---

struct Strings {
    table: Vec<Vec<u8>>,
    index: HashMap<String, u32>,
}

impl Strings {
    fn new() -> Self {
        // index 0 is the empty string
        Self {
            table: vec![Vec::new()],
            index: HashMap::from([(String::new(), 0)]),
        }
    }

    fn id(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.table.len() as u32;
        self.table.push(s.as_bytes().to_vec());
        self.index.insert(s.to_string(), id);
        id
    }

    fn tags(&mut self, tags: &[(String, String)]) -> (Vec<u32>, Vec<u32>) {
        tags.iter().map(|(k, v)| (self.id(k), self.id(v))).unzip()
    }
}

fn delta(values: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut last = 0;
    values
        .map(|v| {
            let d = v - last;
            last = v;
            d
        })
        .collect()
}

fn to_units(degrees: f64) -> i64 {
    (degrees * 1e9 / f64::from(GRANULARITY)).round() as i64
}

fn kind_of(entity: &OsmEntity) -> u8 {
    match entity {
        OsmEntity::Node(_) => 0,
        OsmEntity::Way(_) => 1,
        OsmEntity::Relation(_) => 2,
    }
}

fn encode_block(entities: &[OsmEntity]) -> PbfPrimitiveBlock {
    let mut strings = Strings::new();
    let mut groups: Vec<PrimitiveGroup> = Vec::new();
    let mut last_kind = None;

    for entity in entities {
        // a group holds one entity kind only
        if last_kind != Some(kind_of(entity)) {
            groups.push(PrimitiveGroup::default());
            last_kind = Some(kind_of(entity));
        }
        let Some(group) = groups.last_mut() else {
            continue;
        };

        match entity {
            OsmEntity::Node(n) => {
                let (keys, vals) = strings.tags(&n.tags);
                group.nodes.push(PbfNode {
                    id: n.id,
                    keys,
                    vals,
                    lat: to_units(n.lat),
                    lon: to_units(n.lon),
                });
            }
            OsmEntity::Way(w) => {
                let (keys, vals) = strings.tags(&w.tags);
                group.ways.push(PbfWay {
                    id: w.id,
                    keys,
                    vals,
                    refs: delta(w.nodes.iter().copied()),
                });
            }
            OsmEntity::Relation(r) => {
                let (keys, vals) = strings.tags(&r.tags);
                group.relations.push(PbfRelation {
                    id: r.id,
                    keys,
                    vals,
                    roles_sid: r.members.iter().map(|m| strings.id(&m.role) as i32).collect(),
                    memids: delta(r.members.iter().map(|m| m.ref_id)),
                    types: r
                        .members
                        .iter()
                        .map(|m| match m.kind {
                            MemberKind::Node => 0,
                            MemberKind::Way => 1,
                            MemberKind::Relation => 2,
                        })
                        .collect(),
                });
            }
        }
    }

    PbfPrimitiveBlock {
        stringtable: Some(StringTable { s: strings.table }),
        primitivegroup: groups,
        granularity: Some(GRANULARITY),
    }
}

/// Streaming `.osm.pbf` writer
pub struct PbfWriter<W: Write> {
    out: W,
    pending: Vec<OsmEntity>,
    written: u64,
}

impl PbfWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> PbfWriter<W> {
    /// Wrap `out` and write the file header.
    pub fn new(out: W) -> Result<Self> {
        let mut writer = Self {
            out,
            pending: Vec::with_capacity(ENTITIES_PER_BLOCK),
            written: 0,
        };
        let header = HeaderBlock {
            required_features: REQUIRED_FEATURES.iter().map(|f| f.to_string()).collect(),
            writingprogram: Some(WRITING_PROGRAM.to_string()),
        };
        writer.write_blob("OSMHeader", &header.encode_to_vec())?;
        Ok(writer)
    }

    pub fn write(&mut self, entity: OsmEntity) -> Result<()> {
        self.pending.push(entity);
        if self.pending.len() >= ENTITIES_PER_BLOCK {
            self.flush_block()?;
        }
        Ok(())
    }

    /// Entities written so far, including those still buffered
    pub fn count(&self) -> u64 {
        self.written + self.pending.len() as u64
    }

    /// Flush the last block and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.flush_block()?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let block = encode_block(&self.pending);
        self.write_blob("OSMData", &block.encode_to_vec())?;
        self.written += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }

    fn write_blob(&mut self, kind: &str, raw: &[u8]) -> Result<()> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw)?;
        let blob = Blob {
            raw_size: Some(len_i32(raw.len())?),
            zlib_data: Some(encoder.finish()?),
        }
        .encode_to_vec();

        let header = BlobHeader {
            r#type: kind.to_string(),
            datasize: len_i32(blob.len())?,
        }
        .encode_to_vec();

        let header_len = u32::try_from(header.len())
            .map_err(|_| Error::PbfError("blob header too large".to_string()))?;
        self.out.write_all(&header_len.to_be_bytes())?;
        self.out.write_all(&header)?;
        self.out.write_all(&blob)?;
        Ok(())
    }
}

fn len_i32(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::PbfError(format!("blob of {len} bytes is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample() -> Vec<OsmEntity> {
        vec![
            OsmEntity::Node(Node {
                id: 1,
                lat: 50.8503,
                lon: 4.3517,
                tags: tags(&[("name", "Brussel")]),
            }),
            OsmEntity::Node(Node {
                id: 2,
                lat: -33.8688,
                lon: 151.2093,
                tags: Vec::new(),
            }),
            OsmEntity::Way(Way {
                id: 10,
                nodes: vec![2, 1, 2],
                tags: tags(&[("highway", "residential")]),
            }),
            OsmEntity::Relation(Relation {
                id: 100,
                members: vec![
                    Member {
                        role: "outer".to_string(),
                        kind: MemberKind::Way,
                        ref_id: 10,
                    },
                    Member {
                        role: String::new(),
                        kind: MemberKind::Node,
                        ref_id: 1,
                    },
                ],
                tags: tags(&[("type", "multipolygon")]),
            }),
        ]
    }

    #[test]
    fn test_written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.osm.pbf");

        let mut writer = PbfWriter::create(&path).unwrap();
        for entity in sample() {
            writer.write(entity).unwrap();
        }
        assert_eq!(writer.count(), 4);
        writer.finish().unwrap();

        let read: Vec<OsmEntity> = PbfEntities::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(read.len(), 4);

        match &read[0] {
            OsmEntity::Node(n) => {
                assert_eq!(n.id, 1);
                assert!((n.lat - 50.8503).abs() < 1e-7);
                assert!((n.lon - 4.3517).abs() < 1e-7);
                assert_eq!(n.tags, tags(&[("name", "Brussel")]));
            }
            other => panic!("expected node, got {other:?}"),
        }
        match &read[2] {
            OsmEntity::Way(w) => assert_eq!(w.nodes, vec![2, 1, 2]),
            other => panic!("expected way, got {other:?}"),
        }
        assert_eq!(read[3], sample()[3]);
    }

    #[test]
    fn test_large_input_spans_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("many.osm.pbf");

        let total = ENTITIES_PER_BLOCK as i64 * 2 + 17;
        let mut writer = PbfWriter::create(&path).unwrap();
        for id in 1..=total {
            writer
                .write(OsmEntity::Node(Node {
                    id,
                    lat: 0.0,
                    lon: id as f64 * 1e-4,
                    tags: Vec::new(),
                }))
                .unwrap();
        }
        writer.finish().unwrap();

        let ids: Vec<i64> = PbfEntities::open(&path)
            .unwrap()
            .map(|e| e.unwrap().id())
            .collect();
        assert_eq!(ids.len() as i64, total);
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&total));
    }

    #[test]
    fn test_garbage_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.osm.pbf");
        std::fs::write(&path, b"\x00\x00\x00\x05not a pbf file").unwrap();

        let results: Vec<Result<OsmEntity>> = PbfEntities::open(&path).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_delta_coding() {
        assert_eq!(delta([5, 7, 3].into_iter()), vec![5, 2, -4]);
        assert!(delta(std::iter::empty()).is_empty());
    }
}
