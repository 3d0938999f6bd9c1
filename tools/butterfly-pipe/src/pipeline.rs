//! Building and running a pipeline from raw arguments

use crate::error::{PipelineError, Result};
use crate::machine::{interpret, Stage};
use crate::processor::{ExecuteOptions, Processor, SinkReport};
use crate::registry::SwitchRegistry;
use crate::tokenize::tokenize;

/// A type-checked pipeline that has not run yet
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Tokenize and interpret `args` against `registry`.
    pub fn build<I, S>(args: I, registry: &SwitchRegistry) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocations = tokenize(args)?;
        log::debug!("{} invocation(s)", invocations.len());
        let stages = interpret(invocations, registry)?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// One line per stage, bottom of the stack first.
    pub fn plan(&self) -> Vec<String> {
        self.stages
            .iter()
            .map(|stage| {
                format!(
                    "{} [{}] {}",
                    stage.switch,
                    stage.processor.capabilities(),
                    stage.processor.describe()
                )
            })
            .collect()
    }

    pub fn execute(self, options: &ExecuteOptions) -> Result<Vec<SinkReport>> {
        execute(self.stages, options)
    }
}

/// Run every sink on the final stack, bottom to top.
///
/// A stack without a sink is incomplete. Other leftovers are dropped unused.
pub fn execute(stack: Vec<Stage>, options: &ExecuteOptions) -> Result<Vec<SinkReport>> {
    if stack.is_empty() {
        return Err(PipelineError::Incomplete {
            detail: "no switches given".to_string(),
        });
    }

    let mut sinks = Vec::new();
    for stage in stack {
        match stage.processor {
            Processor::Sink(sink) => sinks.push((stage.switch, sink)),
            other => log::warn!(
                "{}: {} is never consumed and will be dropped",
                stage.switch,
                other.describe()
            ),
        }
    }

    if sinks.is_empty() {
        return Err(PipelineError::Incomplete {
            detail: "the last switch must write something, e.g. --write-pbf or --write-routerdb"
                .to_string(),
        });
    }

    let mut reports = Vec::with_capacity(sinks.len());
    for (switch, sink) in sinks {
        log::info!("{switch}: executing {}", sink.describe());
        let report = sink
            .execute(options)
            .map_err(|e| PipelineError::domain(switch, e))?;
        log::info!("{switch}: wrote {} item(s) to {}", report.items, report.path.display());
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{Deferred, Sink};
    use std::path::PathBuf;

    struct Recording(&'static str);

    impl Sink for Recording {
        fn describe(&self) -> String {
            format!("record {}", self.0)
        }

        fn execute(self: Box<Self>, options: &ExecuteOptions) -> butterfly_common::Result<SinkReport> {
            options.report(1);
            Ok(SinkReport {
                path: PathBuf::from(self.0),
                items: 1,
            })
        }
    }

    struct Broken;

    impl Sink for Broken {
        fn describe(&self) -> String {
            "broken".to_string()
        }

        fn execute(self: Box<Self>, _: &ExecuteOptions) -> butterfly_common::Result<SinkReport> {
            Err(butterfly_common::Error::InvalidInput("disk full".into()))
        }
    }

    fn sink(switch: &'static str, sink: impl Sink + 'static) -> Stage {
        Stage {
            switch,
            processor: Processor::Sink(Box::new(sink)),
        }
    }

    #[test]
    fn test_empty_or_sinkless_stack_is_incomplete() {
        let options = ExecuteOptions::default();
        assert!(matches!(
            execute(Vec::new(), &options),
            Err(PipelineError::Incomplete { .. })
        ));

        let graph_only = vec![Stage {
            switch: "--read-routerdb",
            processor: Processor::RoutingGraph(Deferred::ready(Default::default())),
        }];
        assert!(matches!(
            execute(graph_only, &options),
            Err(PipelineError::Incomplete { .. })
        ));
    }

    #[test]
    fn test_sinks_run_bottom_to_top() {
        let stack = vec![sink("--first", Recording("a")), sink("--second", Recording("b"))];
        let reports = execute(stack, &ExecuteOptions::default()).unwrap();
        let paths: Vec<PathBuf> = reports.into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_sink_failure_names_producing_switch() {
        let stack = vec![sink("--write-pbf", Broken)];
        let err = execute(stack, &ExecuteOptions::default()).unwrap_err();
        assert_eq!(err.switch(), Some("--write-pbf"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_progress_callback_is_invoked() {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::sync::Arc;

        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        let options = ExecuteOptions {
            progress: Some(Arc::new(move |n| counter.store(n, Ordering::SeqCst))),
        };
        execute(vec![sink("--first", Recording("a"))], &options).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_reports_first_failure() {
        let err = Pipeline::build(["--write-pfb", "x.pbf"], SwitchRegistry::builtin()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownSwitch { .. }));
    }
}
