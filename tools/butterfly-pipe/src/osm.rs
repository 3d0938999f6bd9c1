//! Owned OSM entities as they flow between pipeline stages

pub type Tags = Vec<(String, String)>;

/// Look up a tag value by key
pub fn tag<'a>(tags: &'a [(String, String)], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub role: String,
    pub kind: MemberKind,
    pub ref_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OsmEntity {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl OsmEntity {
    pub fn id(&self) -> i64 {
        match self {
            OsmEntity::Node(n) => n.id,
            OsmEntity::Way(w) => w.id,
            OsmEntity::Relation(r) => r.id,
        }
    }

    pub fn tags(&self) -> &[(String, String)] {
        match self {
            OsmEntity::Node(n) => &n.tags,
            OsmEntity::Way(w) => &w.tags,
            OsmEntity::Relation(r) => &r.tags,
        }
    }
}

/// Build an owned tag list from borrowed pairs
pub(crate) fn owned_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Tags {
    tags.map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lookup() {
        let tags = vec![
            ("highway".to_string(), "primary".to_string()),
            ("oneway".to_string(), "yes".to_string()),
        ];
        assert_eq!(tag(&tags, "oneway"), Some("yes"));
        assert_eq!(tag(&tags, "maxspeed"), None);
    }
}
