//! Parameter schemas: the declared keys a switch accepts

use std::collections::HashSet;

/// How a raw parameter value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamKind {
    Text,
    /// Permissive boolean: `true`, `yes` and `1` (any case) are true, anything else is false
    Bool,
    Number,
    /// Comma-separated vehicle profile names or aggregates
    VehicleList,
}

/// One logical parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Aliases; the first one is the canonical name
    pub keys: &'static [&'static str],
    pub required: bool,
    pub description: &'static str,
    pub default: Option<&'static str>,
    pub kind: ParamKind,
    /// Accept a bare token (no `=`) for this parameter
    pub bare: bool,
}

impl ParamSpec {
    pub const fn required(keys: &'static [&'static str], description: &'static str) -> Self {
        Self {
            keys,
            required: true,
            description,
            default: None,
            kind: ParamKind::Text,
            bare: false,
        }
    }

    pub const fn optional(
        keys: &'static [&'static str],
        description: &'static str,
        default: &'static str,
    ) -> Self {
        Self {
            keys,
            required: false,
            description,
            default: Some(default),
            kind: ParamKind::Text,
            bare: false,
        }
    }

    pub const fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    /// Allow a bare token: a positional value, or for booleans the key itself as a flag.
    pub const fn bare(mut self) -> Self {
        self.bare = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.keys.first().copied().unwrap_or("")
    }

    pub fn matches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }
}

/// Ordered list of parameters for one switch
pub type ParameterSchema = &'static [ParamSpec];

/// Find aliases used by more than one entry (or an entry without any key).
pub fn check(schema: &[ParamSpec]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for spec in schema {
        if spec.keys.is_empty() {
            return Err("parameter without a key".to_string());
        }
        for key in spec.keys {
            if !seen.insert(key.to_lowercase()) {
                return Err(format!("parameter key '{key}' declared twice"));
            }
        }
    }
    Ok(())
}
