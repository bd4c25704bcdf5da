//! Post-processors for machine-specific G-code output
//!
//! A post walks the tool-path tree and restates it in one controller's
//! dialect.

use std::collections::HashMap;

use crate::config::Settings;
use crate::error::ExportError;
use crate::path::{Command, Param, PathNode};

pub mod haas;
mod translate;

pub use haas::HaasNgcPost;

/// Post-processor trait - implemented for each controller type
pub trait PostProcessor {
    /// Render the whole program for the given top-level nodes
    fn process(&self, nodes: &[PathNode]) -> Result<String, ExportError>;

    /// Machine/controller name
    fn name(&self) -> &str;

    /// Whether the generated program should be offered for review
    fn show_editor(&self) -> bool {
        false
    }
}

/// A point in the output that can be rewound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    len: usize,
    line_number: u32,
}

/// Append-only program text with optional line numbering
#[derive(Debug, Clone, PartialEq)]
pub struct GCodeOutput {
    pub lines: Vec<String>,
    pub line_number: u32,
    pub step: u32,
    pub numbered: bool,
}

impl GCodeOutput {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            line_number: 10,
            step: 5,
            numbered: false,
        }
    }

    pub fn for_settings(settings: &Settings) -> Self {
        Self {
            lines: Vec::new(),
            line_number: settings.line_number_start,
            step: settings.line_number_step,
            numbered: settings.line_numbers,
        }
    }

    /// Emit a block, prefixed with `N<n>` when numbering is on
    pub fn emit(&mut self, code: &str) {
        if self.numbered {
            self.lines.push(format!("N{} {}", self.line_number, code));
            self.line_number += self.step;
        } else {
            self.lines.push(code.to_string());
        }
    }

    /// Comments are never numbered
    pub fn emit_comment(&mut self, comment: &str) {
        self.lines.push(format!("({})", comment));
    }

    /// Push a line exactly as given
    pub fn emit_raw(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    /// Emit every non-blank line of a user text block
    pub fn emit_block(&mut self, text: &str) {
        for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
            self.emit(line);
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            len: self.lines.len(),
            line_number: self.line_number,
        }
    }

    /// Drop every line after `mark` and hand back their line numbers
    pub fn truncate(&mut self, mark: Mark) {
        self.lines.truncate(mark.len);
        self.line_number = mark.line_number;
    }
}

impl Default for GCodeOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GCodeOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// What the controller last saw within one operation
#[derive(Debug, Clone, PartialEq)]
pub struct ModalState {
    pub last_command: Option<String>,
    pub location: HashMap<Param, f64>,
}

impl ModalState {
    /// Every operation starts from a notional `G0 X-1 Y-1 Z-1 F0`
    pub fn seeded() -> Self {
        let location = [(Param::X, -1.0), (Param::Y, -1.0), (Param::Z, -1.0), (Param::F, 0.0)]
            .into_iter()
            .collect();
        Self {
            last_command: None,
            location,
        }
    }

    pub fn is_unchanged(&self, param: Param, value: f64) -> bool {
        self.location.get(&param) == Some(&value)
    }

    /// Remember a command as emitted, using its untranslated values
    pub fn record(&mut self, command: &Command) {
        self.last_command = Some(command.name.clone());
        self.location.extend(command.params());
    }
}

impl Default for ModalState {
    fn default() -> Self {
        Self::seeded()
    }
}

/// Mutable state of a single export call
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionState {
    pub output: GCodeOutput,
    /// Spindle speed held back from `M3` until the rigid tap cycle
    pub tap_speed: i64,
    pub modal: ModalState,
}

impl EmissionState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            output: GCodeOutput::for_settings(settings),
            tap_speed: 0,
            modal: ModalState::seeded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_numbered_output() {
        let settings = Settings {
            line_numbers: true,
            ..Settings::default()
        };
        let mut out = GCodeOutput::for_settings(&settings);
        out.emit("G17");
        out.emit_comment("BEGIN");
        out.emit("G21");
        out.emit_block("M5\n\nM30\n");

        assert_eq!(out.lines, vec!["N10 G17", "(BEGIN)", "N15 G21", "N20 M5", "N25 M30"]);
        assert_eq!(out.to_string(), "N10 G17\n(BEGIN)\nN15 G21\nN20 M5\nN25 M30\n");
    }

    #[test]
    fn test_unnumbered_output() {
        let mut out = GCodeOutput::for_settings(&Settings::default());
        out.emit("G17");
        out.emit_raw("(TOOL)");
        assert_eq!(out.lines, vec!["G17", "(TOOL)"]);
        assert_eq!(out.line_number, 10);
    }

    #[test]
    fn test_truncate_restores_counter() {
        let mut out = GCodeOutput {
            numbered: true,
            ..GCodeOutput::new()
        };
        out.emit("G0 X1");
        let mark = out.mark();
        out.emit("G1 X2");
        out.emit_comment("NOTE");
        out.emit("G1 X3");
        out.truncate(mark);
        out.emit("G1 X4");
        assert_eq!(out.lines, vec!["N10 G0 X1", "N15 G1 X4"]);
        assert_eq!(out.line_number, 20);
    }

    #[test]
    fn test_modal_seed_and_record() {
        let mut modal = ModalState::seeded();
        assert!(modal.is_unchanged(Param::X, -1.0));
        assert!(modal.is_unchanged(Param::F, 0.0));
        assert!(!modal.is_unchanged(Param::R, 0.0));

        modal.record(&Command::parse("G1 X5 K2").unwrap());
        assert_eq!(modal.last_command.as_deref(), Some("G1"));
        assert!(modal.is_unchanged(Param::X, 5.0));
        assert!(modal.is_unchanged(Param::Y, -1.0));
    }
}
