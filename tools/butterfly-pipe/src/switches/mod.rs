//! Built-in switches
//!
//! Each module declares one [`SwitchDefinition`] and the processors it creates.
//! Transforms only wire processors together; files are read or written when a
//! sink executes.

mod create_routerdb;
mod filter_bbox;
mod read_pbf;
mod read_routerdb;
mod read_shape;
mod write_pbf;
mod write_routerdb;

pub use filter_bbox::BoundingBox;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use butterfly_common::{Error, Result};
use tempfile::NamedTempFile;

use crate::graph::RoutingGraph;
use crate::processor::{Deferred, EntitySource, Processor};
use crate::registry::SwitchDefinition;

/// The switch vocabulary, in help order
pub const BUILTIN: &[SwitchDefinition] = &[
    read_pbf::DEFINITION,
    write_pbf::DEFINITION,
    filter_bbox::DEFINITION,
    create_routerdb::DEFINITION,
    read_shape::DEFINITION,
    write_routerdb::DEFINITION,
    read_routerdb::DEFINITION,
];

/// Emit a progress report every this many items
const REPORT_EVERY: u64 = 10_000;

/// An input path that must exist when the pipeline is built
fn existing_file(value: &str) -> Result<PathBuf> {
    let path = PathBuf::from(value);
    if !path.is_file() {
        return Err(Error::InvalidInput(format!("file not found: {}", path.display())));
    }
    Ok(path)
}

fn entity_stream_input(inputs: Vec<Processor>) -> Result<Box<dyn EntitySource>> {
    inputs
        .into_iter()
        .last()
        .and_then(Processor::into_entity_stream)
        .ok_or_else(|| Error::InvalidInput("expected an entity stream input".to_string()))
}

fn routing_graph_input(inputs: Vec<Processor>) -> Result<Deferred<RoutingGraph>> {
    inputs
        .into_iter()
        .last()
        .and_then(Processor::into_routing_graph)
        .ok_or_else(|| Error::InvalidInput("expected a routing graph input".to_string()))
}

/// Output staged in a temporary file beside its target
///
/// The target is replaced only on `commit`. Dropping an uncommitted output
/// discards the staged file and leaves any existing target untouched. The
/// target may be the file the sink's own input is read from.
struct ScopedOutput {
    target: PathBuf,
    staged: NamedTempFile,
}

impl ScopedOutput {
    fn create(target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Ok(Self {
            target: target.to_path_buf(),
            staged: NamedTempFile::new_in(dir)?,
        })
    }

    fn writer(&self) -> BufWriter<&File> {
        BufWriter::new(self.staged.as_file())
    }

    /// Move the staged file over the target.
    fn commit(self) -> Result<()> {
        log::debug!("moving staged output to {}", self.target.display());
        self.staged
            .persist(&self.target)
            .map_err(|e| Error::IoError(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(existing_file(path).unwrap(), file.path());
        assert!(existing_file("/nonexistent/input.osm.pbf").is_err());
    }

    #[test]
    fn test_uncommitted_output_keeps_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        fs::write(&target, b"previous").unwrap();

        let output = ScopedOutput::create(&target).unwrap();
        output.writer().write_all(b"half").unwrap();
        drop(output);

        assert_eq!(fs::read(&target).unwrap(), b"previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_commit_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        fs::write(&target, b"previous").unwrap();

        let output = ScopedOutput::create(&target).unwrap();
        output.writer().write_all(b"fresh").unwrap();
        output.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"fresh");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
