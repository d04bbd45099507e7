use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sweep_core::errors::{ErrorInfo, SweepError};
use sweep_grid::{Axis, Combination, ParameterGrid};

use crate::shell;

/// Piece of a template argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied verbatim.
    Literal(String),
    /// `{name}`: replaced by the value of parameter `name`.
    Placeholder(String),
}

/// Command line for the target executable, executable first.
///
/// Arguments may embed `{name}` placeholders (`{{` and `}}` escape literal
/// braces). Every grid parameter that no placeholder mentions is passed as a
/// trailing `--name=value` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandTemplate {
    raw: Vec<String>,
    args: Vec<Vec<Segment>>,
}

impl TryFrom<Vec<String>> for CommandTemplate {
    type Error = SweepError;

    fn try_from(raw: Vec<String>) -> Result<Self, Self::Error> {
        CommandTemplate::new(raw)
    }
}

impl From<CommandTemplate> for Vec<String> {
    fn from(template: CommandTemplate) -> Self {
        template.raw
    }
}

impl CommandTemplate {
    /// Parses the argument list.
    pub fn new(raw: Vec<String>) -> Result<Self, SweepError> {
        if raw.is_empty() {
            return Err(SweepError::InvalidSpec(
                ErrorInfo::new("template_empty", "command template names no executable")
                    .with_hint("pass the target command after `--`"),
            ));
        }
        if let Some(arg) = raw.iter().find(|arg| arg.contains(['\n', '\r'])) {
            return Err(SweepError::InvalidSpec(
                ErrorInfo::new("template_newline", "command arguments must be single-line")
                    .with_context("argument", arg.as_str()),
            ));
        }
        let args = raw
            .iter()
            .map(|arg| parse_arg(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { raw, args })
    }

    /// Arguments as written.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Parsed arguments.
    pub fn args(&self) -> &[Vec<Segment>] {
        &self.args
    }

    /// Names referenced by placeholders.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.args
            .iter()
            .flatten()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Fails when a placeholder names no grid parameter.
    pub fn check(&self, grid: &ParameterGrid) -> Result<(), SweepError> {
        for name in self.placeholders() {
            if grid.axis(name).is_none() {
                return Err(SweepError::InvalidSpec(
                    ErrorInfo::new(
                        "template_placeholder",
                        format!("placeholder {{{name}}} names no parameter"),
                    )
                    .with_context("parameter", name),
                ));
            }
        }
        Ok(())
    }

    /// Axes passed as trailing `--name=value` flags, in declaration order.
    pub fn flag_axes<'g>(&self, grid: &'g ParameterGrid) -> Vec<&'g Axis> {
        let referenced = self.placeholders();
        grid.axes()
            .iter()
            .filter(|axis| !referenced.contains(axis.name()))
            .collect()
    }

    /// Argument vector for one grid point, mirroring what the emitted script runs.
    pub fn render(&self, combination: &Combination) -> Result<Vec<String>, SweepError> {
        let mut argv = Vec::with_capacity(self.args.len() + combination.len());
        for arg in &self.args {
            let mut rendered = String::new();
            for segment in arg {
                match segment {
                    Segment::Literal(text) => rendered.push_str(text),
                    Segment::Placeholder(name) => {
                        let value = combination.get(name).ok_or_else(|| {
                            SweepError::InvalidSpec(
                                ErrorInfo::new(
                                    "combination_missing",
                                    "combination lacks a templated parameter",
                                )
                                .with_context("parameter", name.as_str()),
                            )
                        })?;
                        rendered.push_str(&value.to_string());
                    }
                }
            }
            argv.push(rendered);
        }
        let referenced = self.placeholders();
        for (name, value) in combination.iter() {
            if !referenced.contains(name) {
                argv.push(format!("--{name}={value}"));
            }
        }
        Ok(argv)
    }

    /// Shell-quoted rendering of the template as written.
    pub fn display(&self) -> String {
        shell::join(&self.raw)
    }
}

fn parse_arg(arg: &str) -> Result<Vec<Segment>, SweepError> {
    let brace_error = || {
        SweepError::InvalidSpec(
            ErrorInfo::new("template_brace", "unbalanced brace in command template")
                .with_context("argument", arg),
        )
    };
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = arg.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(inner) => name.push(inner),
                        None => return Err(brace_error()),
                    }
                }
                if name.is_empty() || name.contains('{') {
                    return Err(brace_error());
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            '}' => return Err(brace_error()),
            other => literal.push(other),
        }
    }
    if !literal.is_empty() || segments.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
