use std::path::PathBuf;

use butterfly_common::Result;

use super::existing_file;
use crate::formats::PbfEntities;
use crate::processor::{Capability, EntitySource, EntityStream, Processor};
use crate::registry::SwitchDefinition;
use crate::schema::ParamSpec;
use crate::validate::Params;

pub const DEFINITION: SwitchDefinition = SwitchDefinition {
    names: &["--read-pbf", "--rb"],
    about: "Read an OpenStreetMap .osm.pbf file",
    schema: &[ParamSpec::required(&["file"], "Path to the .osm.pbf file").bare()],
    stable: true,
    consumes: &[],
    produces: Capability::EntityStream,
    parse,
};

struct PbfSource {
    path: PathBuf,
}

impl EntitySource for PbfSource {
    fn describe(&self) -> String {
        format!("read {}", self.path.display())
    }

    fn open(self: Box<Self>) -> Result<EntityStream> {
        log::debug!("opening {}", self.path.display());
        Ok(Box::new(PbfEntities::open(&self.path)?))
    }
}

fn parse(params: &Params, _inputs: Vec<Processor>) -> Result<Vec<Processor>> {
    let path = existing_file(params.text("file")?)?;
    Ok(vec![Processor::EntityStream(Box::new(PbfSource { path }))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;

    #[test]
    fn test_missing_input_fails_at_parse_time() {
        let params = validate("--read-pbf", DEFINITION.schema, &["nope.osm.pbf".to_string()]).unwrap();
        let err = parse(&params, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("nope.osm.pbf"));
    }

    #[test]
    fn test_source_is_lazy() {
        // Only existence is checked up front; an empty file yields no entities
        let file = tempfile::NamedTempFile::new().unwrap();
        let arg = format!("file={}", file.path().display());
        let params = validate("--read-pbf", DEFINITION.schema, &[arg]).unwrap();

        let mut produced = parse(&params, Vec::new()).unwrap();
        assert_eq!(produced.len(), 1);
        let source = produced.pop().and_then(Processor::into_entity_stream).unwrap();
        assert!(source.describe().starts_with("read "));
        let entities: Vec<_> = source.open().unwrap().collect();
        assert!(entities.is_empty());
    }
}
