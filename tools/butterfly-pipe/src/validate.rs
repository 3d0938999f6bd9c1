//! Parameter validator
//!
//! Matches an invocation's raw tokens against a switch's schema and produces a
//! total mapping from canonical parameter name to typed value. Switch transforms
//! never see raw strings.

use std::collections::HashMap;

use butterfly_common::{suggest_correction, Error};

use crate::error::{PipelineError, Result};
use crate::schema::{ParamKind, ParamSpec};
use crate::vehicles::{self, Vehicle};

/// Values accepted as true; comparison is case-insensitive.
const TRUTHY: [&str; 3] = ["true", "yes", "1"];

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Bool(bool),
    Number(f64),
    Vehicles(Vec<Vehicle>),
}

/// Resolved parameters, keyed by canonical name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: HashMap<&'static str, ParamValue>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn text(&self, name: &str) -> butterfly_common::Result<&str> {
        match self.values.get(name) {
            Some(ParamValue::Text(s)) => Ok(s),
            _ => Err(missing(name, "text")),
        }
    }

    /// Unset flags read as false.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ParamValue::Bool(true)))
    }

    pub fn number(&self, name: &str) -> butterfly_common::Result<f64> {
        match self.values.get(name) {
            Some(ParamValue::Number(n)) => Ok(*n),
            _ => Err(missing(name, "number")),
        }
    }

    pub fn vehicles(&self, name: &str) -> butterfly_common::Result<&[Vehicle]> {
        match self.values.get(name) {
            Some(ParamValue::Vehicles(v)) => Ok(v),
            _ => Err(missing(name, "vehicle list")),
        }
    }
}

fn missing(name: &str, kind: &str) -> Error {
    Error::InvalidInput(format!("parameter '{name}' is not a resolved {kind}"))
}

/// Permissive boolean parse: absence of a recognized truthy token means false.
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(value))
}

fn convert(switch: &str, spec: &ParamSpec, raw: &str) -> Result<ParamValue> {
    let invalid = |value: &str| PipelineError::InvalidParameterValue {
        switch: switch.to_string(),
        parameter: spec.name().to_string(),
        value: value.to_string(),
    };

    match spec.kind {
        ParamKind::Text => Ok(ParamValue::Text(raw.to_string())),
        ParamKind::Bool => Ok(ParamValue::Bool(is_truthy(raw))),
        ParamKind::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(ParamValue::Number)
            .ok_or_else(|| invalid(raw)),
        ParamKind::VehicleList => {
            let list = vehicles::resolve_list(raw).map_err(|element| invalid(&element))?;
            if list.is_empty() {
                return Err(invalid(raw));
            }
            Ok(ParamValue::Vehicles(list))
        }
    }
}

/// Validate raw tokens against a schema
pub fn validate(switch: &str, schema: &[ParamSpec], args: &[String]) -> Result<Params> {
    let mut raw: Vec<Option<String>> = vec![None; schema.len()];

    for token in args {
        let index = match token.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(PipelineError::MalformedArgument {
                        switch: switch.to_string(),
                        token: token.clone(),
                    });
                }
                let index = schema
                    .iter()
                    .position(|spec| spec.matches(key))
                    .ok_or_else(|| PipelineError::UnknownParameter {
                        switch: switch.to_string(),
                        key: key.to_string(),
                        suggestion: suggest_correction(
                            key,
                            schema.iter().flat_map(|s| s.keys.iter().copied()),
                        ),
                    })?;
                set(switch, schema, &mut raw, index, value.to_string())?;
                index
            }
            None => bare_token(switch, schema, &mut raw, token)?,
        };
        log::trace!("{switch}: '{token}' -> {}", schema[index].name());
    }

    let mut params = Params::default();
    for (spec, value) in schema.iter().zip(raw) {
        let value = match (value, spec.default) {
            (Some(v), _) => v,
            (None, _) if spec.required => {
                return Err(PipelineError::MissingRequiredParameter {
                    switch: switch.to_string(),
                    name: spec.name().to_string(),
                });
            }
            (None, Some(default)) => default.to_string(),
            (None, None) => continue,
        };
        params.values.insert(spec.name(), convert(switch, spec, &value)?);
    }

    Ok(params)
}

fn set(
    switch: &str,
    schema: &[ParamSpec],
    raw: &mut [Option<String>],
    index: usize,
    value: String,
) -> Result<()> {
    if raw[index].is_some() {
        return Err(PipelineError::DuplicateParameter {
            switch: switch.to_string(),
            name: schema[index].name().to_string(),
        });
    }
    raw[index] = Some(value);
    Ok(())
}

/// A token without `=`: a boolean flag by name, or the next positional value.
fn bare_token(
    switch: &str,
    schema: &[ParamSpec],
    raw: &mut [Option<String>],
    token: &str,
) -> Result<usize> {
    let flag = schema
        .iter()
        .position(|s| s.bare && s.kind == ParamKind::Bool && s.matches(token));
    if let Some(index) = flag {
        set(switch, schema, raw, index, "true".to_string())?;
        return Ok(index);
    }

    let positional = schema
        .iter()
        .enumerate()
        .position(|(i, s)| s.bare && s.kind != ParamKind::Bool && raw[i].is_none());
    match positional {
        Some(index) => {
            raw[index] = Some(token.to_string());
            Ok(index)
        }
        None => Err(PipelineError::MalformedArgument {
            switch: switch.to_string(),
            token: token.to_string(),
        }),
    }
}
