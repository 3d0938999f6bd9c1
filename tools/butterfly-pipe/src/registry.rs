//! Switch registry
//!
//! An immutable table from every operation name and alias to its switch
//! definition. The built-in table is assembled once, on first use, and is
//! never mutated afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use butterfly_common::suggest_correction;
use thiserror::Error;

use crate::error::{PipelineError, Result};
use crate::processor::{Capability, Processor};
use crate::schema::{self, ParameterSchema};
use crate::validate::Params;

/// Domain transform: validated parameters plus the consumed processors
/// (deepest first) to the produced processors.
pub type ParseFn = fn(&Params, Vec<Processor>) -> butterfly_common::Result<Vec<Processor>>;

/// Static description of one switch
#[derive(Clone, Copy)]
pub struct SwitchDefinition {
    /// Canonical name first, then aliases
    pub names: &'static [&'static str],
    pub about: &'static str,
    pub schema: ParameterSchema,
    /// Unstable switches may change their grammar between versions
    pub stable: bool,
    /// Required input capability per consumed slot, deepest first
    pub consumes: &'static [Capability],
    pub produces: Capability,
    pub parse: ParseFn,
}

impl SwitchDefinition {
    pub fn name(&self) -> &'static str {
        self.names.first().copied().unwrap_or("")
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        self.names.get(1..).unwrap_or(&[])
    }

    pub fn consumed_count(&self) -> usize {
        self.consumes.len()
    }
}

impl fmt::Debug for SwitchDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchDefinition")
            .field("names", &self.names)
            .field("stable", &self.stable)
            .field("consumes", &self.consumes)
            .field("produces", &self.produces)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("switch name '{name}' is registered twice")]
    DuplicateAlias { name: String },

    #[error("switch '{switch}' has an invalid schema: {reason}")]
    InvalidSchema { switch: String, reason: String },
}

#[derive(Debug, Default)]
pub struct SwitchRegistry {
    definitions: Vec<SwitchDefinition>,
    index: HashMap<String, usize>,
}

impl SwitchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition under every one of its names.
    ///
    /// Nothing is added when any name collides.
    pub fn register(&mut self, definition: SwitchDefinition) -> std::result::Result<(), RegistryError> {
        schema::check(definition.schema).map_err(|reason| RegistryError::InvalidSchema {
            switch: definition.name().to_string(),
            reason,
        })?;

        let names: Vec<String> = definition.names.iter().map(|n| n.to_lowercase()).collect();
        for (i, name) in names.iter().enumerate() {
            if self.index.contains_key(name) || names[..i].contains(name) {
                return Err(RegistryError::DuplicateAlias { name: name.clone() });
            }
        }

        let slot = self.definitions.len();
        self.definitions.push(definition);
        for name in names {
            self.index.insert(name, slot);
        }
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&SwitchDefinition> {
        self.index
            .get(&name.to_lowercase())
            .map(|&slot| &self.definitions[slot])
            .ok_or_else(|| PipelineError::UnknownSwitch {
                name: name.to_string(),
                suggestion: suggest_correction(
                    name,
                    self.definitions.iter().flat_map(|d| d.names.iter().copied()),
                ),
            })
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &SwitchDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The built-in switch vocabulary.
    ///
    /// # Panics
    /// When two built-in switches share a name or a schema repeats a key.
    pub fn builtin() -> &'static SwitchRegistry {
        static BUILTIN: OnceLock<SwitchRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut registry = SwitchRegistry::new();
            for definition in crate::switches::BUILTIN {
                if let Err(e) = registry.register(*definition) {
                    panic!("built-in switch table is inconsistent: {e}");
                }
            }
            registry
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamSpec;

    fn noop(_: &Params, inputs: Vec<Processor>) -> butterfly_common::Result<Vec<Processor>> {
        Ok(inputs)
    }

    const SOURCE: SwitchDefinition = SwitchDefinition {
        names: &["--source", "--src"],
        about: "test source",
        schema: &[],
        stable: true,
        consumes: &[],
        produces: Capability::EntityStream,
        parse: noop,
    };

    #[test]
    fn test_resolve_by_any_alias_case_insensitive() {
        let mut registry = SwitchRegistry::new();
        registry.register(SOURCE).unwrap();

        assert_eq!(registry.resolve("--source").unwrap().name(), "--source");
        assert_eq!(registry.resolve("--SRC").unwrap().name(), "--source");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let mut registry = SwitchRegistry::new();
        registry.register(SOURCE).unwrap();

        let clash = SwitchDefinition {
            names: &["--other", "--Src"],
            ..SOURCE
        };
        assert_eq!(
            registry.register(clash),
            Err(RegistryError::DuplicateAlias {
                name: "--src".to_string()
            })
        );
        // Nothing from the rejected definition is visible
        assert!(registry.resolve("--other").is_err());
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        const BAD: &[ParamSpec] = &[
            ParamSpec::required(&["file"], "a"),
            ParamSpec::required(&["FILE"], "b"),
        ];
        let mut registry = SwitchRegistry::new();
        let err = registry
            .register(SwitchDefinition {
                schema: BAD,
                ..SOURCE
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSchema { .. }));
    }

    #[test]
    fn test_unknown_switch_suggestion() {
        let err = SwitchRegistry::builtin().resolve("--write-pfb").unwrap_err();
        match err {
            PipelineError::UnknownSwitch { name, suggestion } => {
                assert_eq!(name, "--write-pfb");
                assert_eq!(suggestion.as_deref(), Some("--write-pbf"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builtin_vocabulary() {
        let registry = SwitchRegistry::builtin();
        let names: Vec<&str> = registry.definitions().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec![
                "--read-pbf",
                "--write-pbf",
                "--filter-bounding-box",
                "--create-routerdb",
                "--read-shape",
                "--write-routerdb",
                "--read-routerdb",
            ]
        );
        assert_eq!(registry.resolve("--rb").unwrap().name(), "--read-pbf");
        assert_eq!(registry.resolve("--bb").unwrap().name(), "--filter-bounding-box");
        assert_eq!(registry.resolve("--wr").unwrap().produces, Capability::Sink);
    }
}
