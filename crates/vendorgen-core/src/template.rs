//! Strict `{{.Name}}` template rendering.
//!
//! Wrapper templates and the checked-in config header templates use Go
//! template placeholder syntax. Only plain variable references are supported;
//! anything else between `{{` and `}}`, an unterminated placeholder, or a
//! reference to an unset variable fails with [`VendorError::Template`].

use std::collections::BTreeMap;

use crate::error::{Result, VendorError};

/// Variables available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Render `source`, naming the template `name` in any error.
pub fn render(name: &str, source: &str, vars: &TemplateVars) -> Result<String> {
    let fail = |detail: String| VendorError::Template {
        name: name.to_string(),
        detail,
    };

    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after.find("}}").ok_or_else(|| {
            fail(format!(
                "unterminated placeholder at line {}",
                line_of(source, source.len() - rest.len() + open)
            ))
        })?;
        let action = after[..close].trim();
        let var = action
            .strip_prefix('.')
            .filter(|v| is_identifier(v))
            .ok_or_else(|| fail(format!("unsupported placeholder `{{{{{action}}}}}`")))?;
        let value = vars
            .get(var)
            .ok_or_else(|| fail(format!("undefined variable `{var}`")))?;
        out.push_str(value);
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}
