use std::path::PathBuf;

use butterfly_common::Result;

use super::{entity_stream_input, ScopedOutput, REPORT_EVERY};
use crate::formats::PbfWriter;
use crate::processor::{Capability, EntitySource, ExecuteOptions, Processor, Sink, SinkReport};
use crate::registry::SwitchDefinition;
use crate::schema::ParamSpec;
use crate::validate::Params;

pub const DEFINITION: SwitchDefinition = SwitchDefinition {
    names: &["--write-pbf", "--wb"],
    about: "Write the entity stream to an .osm.pbf file",
    schema: &[ParamSpec::required(&["file"], "Output .osm.pbf path").bare()],
    stable: true,
    consumes: &[Capability::EntityStream],
    produces: Capability::Sink,
    parse,
};

struct PbfSink {
    source: Box<dyn EntitySource>,
    path: PathBuf,
}

impl Sink for PbfSink {
    fn describe(&self) -> String {
        format!("{} -> {}", self.source.describe(), self.path.display())
    }

    fn execute(self: Box<Self>, options: &ExecuteOptions) -> Result<SinkReport> {
        let PbfSink { source, path } = *self;
        let output = ScopedOutput::create(&path)?;

        let mut writer = PbfWriter::new(output.writer())?;
        for entity in source.open()? {
            writer.write(entity?)?;
            if writer.count() % REPORT_EVERY == 0 {
                options.report(writer.count());
            }
        }
        let items = writer.count();
        writer.finish()?;
        output.commit()?;
        options.report(items);
        Ok(SinkReport { path, items })
    }
}

fn parse(params: &Params, inputs: Vec<Processor>) -> Result<Vec<Processor>> {
    let source = entity_stream_input(inputs)?;
    let path = PathBuf::from(params.text("file")?);
    Ok(vec![Processor::Sink(Box::new(PbfSink { source, path }))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::{Node, OsmEntity};
    use crate::processor::EntityStream;

    struct Failing;

    impl EntitySource for Failing {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        fn open(self: Box<Self>) -> Result<EntityStream> {
            let node = OsmEntity::Node(Node {
                id: 1,
                lat: 0.0,
                lon: 0.0,
                tags: Vec::new(),
            });
            Ok(Box::new(
                vec![
                    Ok(node),
                    Err(butterfly_common::Error::PbfError("truncated".to_string())),
                ]
                .into_iter(),
            ))
        }
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.osm.pbf");
        let sink = Box::new(PbfSink {
            source: Box::new(Failing),
            path: path.clone(),
        });

        assert!(sink.execute(&ExecuteOptions::default()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_write_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.osm.pbf");
        std::fs::write(&path, b"previous run").unwrap();
        let sink = Box::new(PbfSink {
            source: Box::new(Failing),
            path: path.clone(),
        });

        assert!(sink.execute(&ExecuteOptions::default()).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"previous run");
    }
}
