//! Node naming and cookie directives in vm.args.

use std::fs;
use std::path::Path;

use serde::Serialize;

use super::error::{ConfigureError, ConfigureResult};

/// Whether the node uses long (`-name`) or short (`-sname`) names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NameType {
    Long,
    Short,
}

impl NameType {
    pub fn as_flag(self) -> &'static str {
        match self {
            NameType::Long => "-name",
            NameType::Short => "-sname",
        }
    }

    /// Directive fields are matched by prefix, so `-namefoo` counts as `-name`.
    fn from_flag(flag: &str) -> Option<Self> {
        if flag.starts_with("-sname") {
            Some(NameType::Short)
        } else if flag.starts_with("-name") {
            Some(NameType::Long)
        } else {
            None
        }
    }
}

/// The `-name`/`-sname` line as written in vm.args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameDirective {
    pub line: String,
    pub name_type: NameType,
    pub name: String,
}

impl NameDirective {
    /// Names without `@host` need a generated host part.
    pub fn needs_host(&self) -> bool {
        !self.name.contains('@')
    }

    pub fn qualify(self, host: Option<&str>) -> NodeIdentity {
        let name = match host {
            Some(host) if self.needs_host() => format!("{}@{}", self.name, host),
            _ => self.name,
        };
        NodeIdentity {
            name_arg: self.line,
            name_type: self.name_type,
            name,
        }
    }
}

/// Fully qualified identity of the node the release will boot as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeIdentity {
    pub name_arg: String,
    pub name_type: NameType,
    pub name: String,
}

/// The last line whose first field passes `accept`, split into fields.
fn last_directive<'a>(contents: &'a str, accept: impl Fn(&str) -> bool) -> Option<(&'a str, Vec<&'a str>)> {
    contents
        .lines()
        .filter(|line| line.starts_with('-'))
        .map(|line| (line, line.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, fields)| fields.first().is_some_and(|flag| accept(flag)))
        .last()
}

pub fn parse_name_directive(contents: &str) -> ConfigureResult<NameDirective> {
    let (line, fields) = last_directive(contents, |flag| NameType::from_flag(flag).is_some())
        .ok_or(ConfigureError::MissingNodeName)?;
    let name_type = NameType::from_flag(fields[0]).ok_or(ConfigureError::MissingNodeName)?;
    let name = fields.get(1).ok_or(ConfigureError::MissingNodeName)?;

    Ok(NameDirective {
        line: line.trim_end().to_string(),
        name_type,
        name: name.to_string(),
    })
}

pub fn read_name_directive(vm_args: &Path) -> ConfigureResult<NameDirective> {
    let contents = fs::read_to_string(vm_args).map_err(|e| ConfigureError::io(vm_args, e))?;
    parse_name_directive(&contents)
}

/// Value of the last `-setcookie` line, if it has one.
pub fn parse_cookie_directive(contents: &str) -> Option<String> {
    let (_, fields) = last_directive(contents, |flag| flag == "-setcookie")?;
    fields.get(1).map(|cookie| cookie.to_string())
}
