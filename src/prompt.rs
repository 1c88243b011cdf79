//! Requirement parsing and prompt construction for assumption generation.

use anyhow::{bail, Context, Result};
use serde_yaml::{Mapping, Value};

pub const ASSUMPTIONS_SYSTEM_PROMPT: &str =
    "You are a WMS solution architect. Write crisp assumptions & gaps given requirement and KB snippets.";

/// Shown in place of generated assumptions when no backend is available.
pub const ASSUMPTIONS_UNAVAILABLE: &str =
    "Assumptions auto-generated not available; please review.";

/// Parse a requirement document. The top level must be a mapping.
pub fn parse_requirement(yaml: &str) -> Result<Mapping> {
    let value: Value = serde_yaml::from_str(yaml).context("YAML parse error")?;
    match value {
        Value::Mapping(m) => Ok(m),
        _ => bail!("YAML parse error: requirement must be a mapping at the top level"),
    }
}

/// Retrieval query for a requirement: `"{module} WMS design "` followed by
/// the top-level string and number values, space separated.
pub fn build_query(module: &str, requirement: &Mapping) -> String {
    let values: Vec<String> = requirement
        .values()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect();
    format!("{} WMS design {}", module, values.join(" "))
}

/// User prompt carrying the raw requirement text and retrieved context.
pub fn assumptions_user_prompt(requirement_yaml: &str, context: &str) -> String {
    format!(
        "Requirement:\n{}\n\nKB snippets:\n{}",
        requirement_yaml, context
    )
}
