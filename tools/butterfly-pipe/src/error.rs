//! Error types for pipeline construction and execution
//!
//! Every structural failure names the switch (and parameter, where applicable)
//! that caused it. Domain failures from readers and writers are wrapped, not interpreted.

use thiserror::Error;

use crate::processor::{Capability, CapabilitySet};

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Arguments appeared before the first switch
    #[error("arguments {tokens:?} appear before any switch; every argument must follow a switch such as --read-pbf")]
    DanglingArguments { tokens: Vec<String> },

    #[error("{name}: unknown switch{}", did_you_mean(.suggestion))]
    UnknownSwitch {
        name: String,
        suggestion: Option<String>,
    },

    #[error("{switch}: unknown parameter '{key}'{}", did_you_mean(.suggestion))]
    UnknownParameter {
        switch: String,
        key: String,
        suggestion: Option<String>,
    },

    #[error("{switch}: missing required parameter '{name}'")]
    MissingRequiredParameter { switch: String, name: String },

    #[error("{switch}: malformed argument '{token}', expected key=value")]
    MalformedArgument { switch: String, token: String },

    #[error("{switch}: invalid value '{value}' for parameter '{parameter}'")]
    InvalidParameterValue {
        switch: String,
        parameter: String,
        value: String,
    },

    #[error("{switch}: parameter '{name}' given more than once")]
    DuplicateParameter { switch: String, name: String },

    #[error("{switch}: needs {required} processor(s) on the stack, found {available}")]
    InsufficientStackDepth {
        switch: String,
        required: usize,
        available: usize,
    },

    #[error("{switch}: input {slot} must be {expected}, found {actual}")]
    CapabilityMismatch {
        switch: String,
        slot: usize,
        expected: Capability,
        actual: CapabilitySet,
    },

    /// A switch produced output that does not match its declaration
    #[error("{switch}: {reason}")]
    ContractViolation { switch: String, reason: String },

    #[error("{switch}: {source}")]
    DomainOperationFailed {
        switch: String,
        #[source]
        source: butterfly_common::Error,
    },

    /// The final stack has nothing to execute
    #[error("pipeline is incomplete: {detail}")]
    Incomplete { detail: String },
}

impl PipelineError {
    /// Name of the switch the error is attributed to, if any.
    pub fn switch(&self) -> Option<&str> {
        match self {
            PipelineError::DanglingArguments { .. } | PipelineError::Incomplete { .. } => None,
            PipelineError::UnknownSwitch { name, .. } => Some(name),
            PipelineError::UnknownParameter { switch, .. }
            | PipelineError::MissingRequiredParameter { switch, .. }
            | PipelineError::MalformedArgument { switch, .. }
            | PipelineError::InvalidParameterValue { switch, .. }
            | PipelineError::DuplicateParameter { switch, .. }
            | PipelineError::InsufficientStackDepth { switch, .. }
            | PipelineError::CapabilityMismatch { switch, .. }
            | PipelineError::ContractViolation { switch, .. }
            | PipelineError::DomainOperationFailed { switch, .. } => Some(switch),
        }
    }

    pub(crate) fn domain(switch: &str, source: butterfly_common::Error) -> Self {
        PipelineError::DomainOperationFailed {
            switch: switch.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_switch() {
        let err = PipelineError::MissingRequiredParameter {
            switch: "--write-pbf".to_string(),
            name: "file".to_string(),
        };
        assert_eq!(err.to_string(), "--write-pbf: missing required parameter 'file'");
        assert_eq!(err.switch(), Some("--write-pbf"));
    }

    #[test]
    fn test_suggestion_is_rendered() {
        let err = PipelineError::UnknownSwitch {
            name: "--write-pfb".to_string(),
            suggestion: Some("--write-pbf".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "--write-pfb: unknown switch (did you mean '--write-pbf'?)"
        );

        let err = PipelineError::UnknownSwitch {
            name: "--nope".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "--nope: unknown switch");
    }

    #[test]
    fn test_capability_mismatch_message() {
        let err = PipelineError::CapabilityMismatch {
            switch: "--write-pbf".to_string(),
            slot: 0,
            expected: Capability::EntityStream,
            actual: Capability::RoutingGraph.into(),
        };
        assert_eq!(
            err.to_string(),
            "--write-pbf: input 0 must be entity-stream, found routing-graph"
        );
    }
}
