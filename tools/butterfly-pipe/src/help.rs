//! Structured help data for the switch vocabulary

use std::fmt::Write;

use serde::Serialize;

use crate::processor::Capability;
use crate::registry::SwitchRegistry;
use crate::schema::ParamKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterHelp {
    pub keys: Vec<&'static str>,
    pub required: bool,
    pub kind: ParamKind,
    pub default: Option<&'static str>,
    pub description: &'static str,
    pub bare: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchHelp {
    pub names: Vec<&'static str>,
    pub about: &'static str,
    pub stable: bool,
    pub consumes: Vec<Capability>,
    pub produces: Capability,
    pub parameters: Vec<ParameterHelp>,
}

/// Help records for every registered switch, in registration order
pub fn catalog(registry: &SwitchRegistry) -> Vec<SwitchHelp> {
    registry
        .definitions()
        .map(|d| SwitchHelp {
            names: d.names.to_vec(),
            about: d.about,
            stable: d.stable,
            consumes: d.consumes.to_vec(),
            produces: d.produces,
            parameters: d
                .schema
                .iter()
                .map(|p| ParameterHelp {
                    keys: p.keys.to_vec(),
                    required: p.required,
                    kind: p.kind,
                    default: p.default,
                    description: p.description,
                    bare: p.bare,
                })
                .collect(),
        })
        .collect()
}

pub fn render_text(switches: &[SwitchHelp]) -> String {
    let mut out = String::new();
    for switch in switches {
        let _ = write!(out, "{}", switch.names.join(", "));
        if !switch.stable {
            out.push_str(" (unstable)");
        }
        let inputs: Vec<&str> = switch.consumes.iter().map(|c| c.name()).collect();
        let inputs = if inputs.is_empty() {
            "-".to_string()
        } else {
            inputs.join(", ")
        };
        let _ = writeln!(out, "\n    {}", switch.about);
        let _ = writeln!(out, "    stack: {} -> {}", inputs, switch.produces);

        for p in &switch.parameters {
            let mut line = format!("      {}", p.keys.join("|"));
            if p.required {
                line.push_str(" (required)");
            }
            if let Some(default) = p.default {
                let _ = write!(line, " [default: {default}]");
            }
            let _ = writeln!(out, "{line}  {}", p.description);
        }
        out.push('\n');
    }
    out
}

pub fn render_json(switches: &[SwitchHelp]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(switches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_mirrors_registry() {
        let help = catalog(SwitchRegistry::builtin());
        assert_eq!(help.len(), SwitchRegistry::builtin().len());

        let create = help
            .iter()
            .find(|s| s.names[0] == "--create-routerdb")
            .unwrap();
        assert_eq!(create.consumes, vec![Capability::EntityStream]);
        assert_eq!(create.produces, Capability::RoutingGraph);
        let vehicles = &create.parameters[0];
        assert_eq!(vehicles.keys, vec!["vehicles", "vehicle"]);
        assert_eq!(vehicles.default, Some("car"));
    }

    #[test]
    fn test_text_rendering() {
        let text = render_text(&catalog(SwitchRegistry::builtin()));
        assert!(text.contains("--read-pbf, --rb"));
        assert!(text.contains("stack: entity-stream -> sink"));
        assert!(text.contains("--read-shape, --rs\n"));
        assert!(!text.contains("(unstable)"));
        assert!(text.contains("file (required)"));
    }

    #[test]
    fn test_unstable_switch_is_marked() {
        let mut help = catalog(SwitchRegistry::builtin());
        help.truncate(1);
        help[0].stable = false;
        assert!(render_text(&help).starts_with("--read-pbf, --rb (unstable)\n"));
    }

    #[test]
    fn test_json_rendering() {
        let json = render_json(&catalog(SwitchRegistry::builtin())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["names"][0], "--read-pbf");
        assert_eq!(value[0]["produces"], "entity-stream");
        assert_eq!(value[3]["parameters"][0]["kind"], "vehicle-list");
    }
}
