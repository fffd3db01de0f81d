//! Prompt templates with `{name}` placeholders

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"))
}

/// A prompt template
///
/// Placeholders are substituted in a single pass, so values containing
/// `{...}` are inserted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Placeholder names in order of first appearance
    pub fn variables(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for caps in placeholder_pattern().captures_iter(&self.template) {
            let name = caps[1].to_string();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Check that the template uses every one of `required`
    ///
    /// `label` names the template in the error message.
    pub fn require(&self, label: &str, required: &[&str]) -> Result<()> {
        let variables = self.variables();
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|r| !variables.iter().any(|v| v == r))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "{} is missing placeholder(s): {}",
                label,
                missing
                    .iter()
                    .map(|m| format!("{{{}}}", m))
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    /// Fill the placeholders; every placeholder must have a value
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        let values: HashMap<&str, &str> = values.iter().copied().collect();

        let missing: Vec<String> = self
            .variables()
            .into_iter()
            .filter(|v| !values.contains_key(v.as_str()))
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!(
                "No value for prompt variable(s): {}",
                missing.join(", ")
            )));
        }

        Ok(placeholder_pattern()
            .replace_all(&self.template, |caps: &Captures| {
                values.get(&caps[1]).copied().unwrap_or_default().to_string()
            })
            .into_owned())
    }
}
