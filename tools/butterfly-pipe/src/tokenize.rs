//! Argument tokenizer
//!
//! Splits a flat argument vector into invocations: every `--name` token opens a
//! new invocation and collects the tokens that follow it until the next one.

use crate::error::{PipelineError, Result};

/// Prefix that marks an operation name.
pub const SWITCH_PREFIX: &str = "--";

/// One occurrence of a switch with its raw parameter tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

pub fn is_switch_name(token: &str) -> bool {
    token.len() > SWITCH_PREFIX.len() && token.starts_with(SWITCH_PREFIX)
}

/// Tokenize raw CLI arguments (program name excluded)
pub fn tokenize<I, S>(args: I) -> Result<Vec<Invocation>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut invocations: Vec<Invocation> = Vec::new();
    let mut dangling = Vec::new();

    for token in args {
        let token = token.into();
        if is_switch_name(&token) {
            invocations.push(Invocation::new(token, Vec::new()));
        } else if let Some(current) = invocations.last_mut() {
            current.args.push(token);
        } else {
            dangling.push(token);
        }
    }

    if !dangling.is_empty() {
        return Err(PipelineError::DanglingArguments { tokens: dangling });
    }

    Ok(invocations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_groups_arguments() {
        let invocations = tokenize(["--a", "k=v", "--b"]).unwrap();
        assert_eq!(
            invocations,
            vec![
                Invocation::new("--a", vec!["k=v".to_string()]),
                Invocation::new("--b", vec![]),
            ]
        );
    }

    #[test]
    fn test_tokenize_preserves_order() {
        let invocations = tokenize([
            "--read-pbf",
            "file=in.osm.pbf",
            "--bb",
            "left=1",
            "right=2",
            "top=4",
            "bottom=3",
            "--write-pbf",
            "out.osm.pbf",
        ])
        .unwrap();

        let names: Vec<&str> = invocations.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["--read-pbf", "--bb", "--write-pbf"]);
        assert_eq!(invocations[1].args, vec!["left=1", "right=2", "top=4", "bottom=3"]);
        assert_eq!(invocations[2].args, vec!["out.osm.pbf"]);
    }

    #[test]
    fn test_tokenize_rejects_leading_arguments() {
        let err = tokenize(["file=a.osm.pbf", "--read-pbf"]).unwrap_err();
        match err {
            PipelineError::DanglingArguments { tokens } => {
                assert_eq!(tokens, vec!["file=a.osm.pbf".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tokenize_empty_and_bare_prefix() {
        assert!(tokenize(Vec::<String>::new()).unwrap().is_empty());
        // A lone "--" is not a switch name
        assert!(matches!(
            tokenize(["--"]),
            Err(PipelineError::DanglingArguments { .. })
        ));
        assert!(!is_switch_name("-v"));
        assert!(is_switch_name("--rb"));
    }
}
