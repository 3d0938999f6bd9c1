//! Processor stack machine
//!
//! Folds invocations, in order, into a stack of processors. Each step resolves
//! the switch, validates its parameters, checks the stack prefix it consumes,
//! runs the transform and pushes what it produced. The first failure aborts.

use crate::error::{PipelineError, Result};
use crate::processor::Processor;
use crate::registry::SwitchRegistry;
use crate::tokenize::Invocation;
use crate::validate::validate;

/// A processor together with the switch that produced it
#[derive(Debug)]
pub struct Stage {
    pub switch: &'static str,
    pub processor: Processor,
}

pub struct StackMachine<'r> {
    registry: &'r SwitchRegistry,
    stack: Vec<Stage>,
}

impl<'r> StackMachine<'r> {
    pub fn new(registry: &'r SwitchRegistry) -> Self {
        Self {
            registry,
            stack: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &[Stage] {
        &self.stack
    }

    /// Process one invocation.
    ///
    /// Depth and capability checks happen before the transform runs, so a
    /// structural fault never reaches domain code.
    pub fn apply(&mut self, invocation: Invocation) -> Result<()> {
        let definition = self.registry.resolve(&invocation.name)?;
        let switch = definition.name();
        let params = validate(switch, definition.schema, &invocation.args)?;

        let required = definition.consumed_count();
        let available = self.stack.len();
        if required > available {
            return Err(PipelineError::InsufficientStackDepth {
                switch: switch.to_string(),
                required,
                available,
            });
        }

        let base = available - required;
        for (slot, expected) in definition.consumes.iter().enumerate() {
            let actual = self.stack[base + slot].processor.capabilities();
            if !actual.contains(*expected) {
                return Err(PipelineError::CapabilityMismatch {
                    switch: switch.to_string(),
                    slot,
                    expected: *expected,
                    actual,
                });
            }
        }

        log::debug!(
            "{switch}: params {params:?}, depth {available} -> consuming {required}"
        );

        let inputs: Vec<Processor> = self
            .stack
            .split_off(base)
            .into_iter()
            .map(|stage| stage.processor)
            .collect();

        let outputs =
            (definition.parse)(&params, inputs).map_err(|e| PipelineError::domain(switch, e))?;

        if outputs.is_empty() {
            return Err(PipelineError::ContractViolation {
                switch: switch.to_string(),
                reason: "produced no processor".to_string(),
            });
        }
        if let Some(wrong) = outputs.iter().find(|p| !p.has(definition.produces)) {
            return Err(PipelineError::ContractViolation {
                switch: switch.to_string(),
                reason: format!(
                    "declared {} output but produced {}",
                    definition.produces,
                    wrong.capabilities()
                ),
            });
        }

        self.stack.extend(outputs.into_iter().map(|processor| Stage { switch, processor }));
        log::debug!("{switch}: depth now {}", self.stack.len());
        Ok(())
    }

    /// Take the final stack.
    pub fn finish(self) -> Vec<Stage> {
        self.stack
    }
}

/// Fold a whole invocation sequence into the final stack.
///
/// An empty sequence yields an empty stack.
pub fn interpret<I>(invocations: I, registry: &SwitchRegistry) -> Result<Vec<Stage>>
where
    I: IntoIterator<Item = Invocation>,
{
    let mut machine = StackMachine::new(registry);
    for invocation in invocations {
        machine.apply(invocation)?;
    }
    Ok(machine.finish())
}
