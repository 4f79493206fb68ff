//! Rendering of published variables for the calling run-control script.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

/// Ordered `KEY=value` pairs to hand back to the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exports {
    vars: Vec<(&'static str, String)>,
}

impl Exports {
    pub fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.vars.push((key, value.into()));
    }

    #[allow(dead_code)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `export KEY='value'` lines, safe to `eval` in a POSIX shell.
    pub fn to_shell(&self) -> String {
        self.vars
            .iter()
            .map(|(key, value)| format!("export {}={}\n", key, shell_quote(value)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        let map: BTreeMap<&str, &str> = self.vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        serde_json::to_string_pretty(&map).context("Failed to serialize exports")
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_output_quotes_values() {
        let mut exports = Exports::default();
        exports.push("NAME", "app@host");
        exports.push("COOKIE", "it's");
        assert_eq!(
            exports.to_shell(),
            "export NAME='app@host'\nexport COOKIE='it'\\''s'\n"
        );
    }

    #[test]
    fn test_json_output() {
        let mut exports = Exports::default();
        exports.push("VMARGS_PATH", "/var/vm.args");
        let json: serde_json::Value = serde_json::from_str(&exports.to_json().unwrap()).unwrap();
        assert_eq!(json["VMARGS_PATH"], "/var/vm.args");
        assert_eq!(exports.get("VMARGS_PATH"), Some("/var/vm.args"));
        assert_eq!(exports.get("NAME"), None);
    }
}
