//! Per-command rewrite rules of the Haas NGC post
//!
//! Modal and duplicate-axis suppression, rigid tapping, tool changes and
//! message handling for the commands of one operation.

use tracing::{debug, warn};

use crate::config::Settings;
use crate::path::{Command, Operation, Param};

use super::{EmissionState, Mark, ModalState};

const RAPID: [&str; 2] = ["G0", "G00"];
const SPINDLE_START: [&str; 2] = ["M3", "M03"];
const DRILL_CYCLES: [&str; 3] = ["G81", "G82", "G83"];
const TOOL_CHANGE: [&str; 2] = ["M6", "M06"];
const CYCLE_CANCEL: &str = "G80";
const MESSAGE: &str = "message";
const FIXTURE: &str = "Fixture";

/// Translates the commands of one operation into the emission state
pub(crate) struct Translator<'a> {
    settings: &'a Settings,
    op: &'a Operation,
}

impl<'a> Translator<'a> {
    pub fn new(settings: &'a Settings, op: &'a Operation) -> Self {
        Self { settings, op }
    }

    pub fn run(&self, state: &mut EmissionState) {
        state.modal = ModalState::seeded();
        let mark = state.output.mark();

        let commands = &self.op.commands;
        for (index, command) in commands.iter().enumerate() {
            let next = commands.get(index + 1).map(|c| c.name.as_str());
            self.translate(command, next, mark, state);
        }
    }

    fn translate(&self, command: &Command, next: Option<&str>, mark: Mark, state: &mut EmissionState) {
        let name = command.name.as_str();

        // Fixture selection carries no real motion
        if self.op.label == FIXTURE && RAPID.contains(&name) {
            return;
        }

        // Taps are rigid tapped: the spindle starts with M29 instead
        if SPINDLE_START.contains(&name) && self.op.has_tap() {
            if let Some(speed) = command.get(Param::S).or(self.op.spindle_speed) {
                state.tap_speed = speed.trunc() as i64;
            }
            debug!(speed = state.tap_speed, "holding spindle start for rigid tap");
            return;
        }

        if DRILL_CYCLES.contains(&name) && self.op.has_tap() {
            self.rigid_tap(command, state);
            return;
        }

        if TOOL_CHANGE.contains(&name) {
            self.tool_change(command, state);
            return;
        }

        let mut words = Vec::new();
        if name == MESSAGE {
            // Without comments the operation restarts from here
            if !self.settings.output_comments {
                state.output.truncate(mark);
                state.modal = ModalState::seeded();
                state.modal.record(command);
                return;
            }
            if let Some(text) = &command.text {
                words.push(text.clone());
            }
        } else {
            let last = state.modal.last_command.as_deref();

            // A G80 between two identical cycles would only break them up
            if name == CYCLE_CANCEL && next.is_some() && last == next {
                return;
            }
            if command.is_comment() && !self.settings.output_comments {
                return;
            }
            if !(self.settings.modal && last == Some(name)) {
                words.push(name.to_string());
            }
        }

        let rapid = RAPID.contains(&name);
        for (param, value) in command.params() {
            if let Some(word) = self.param_word(param, value, rapid, &state.modal) {
                words.push(word);
            }
        }

        state.modal.record(command);
        emit_words(&words, state);
    }

    fn param_word(&self, param: Param, value: f64, rapid: bool, modal: &ModalState) -> Option<String> {
        match param {
            Param::F => {
                // Rapids run at machine speed
                if rapid || self.is_duplicate(param, value, modal) {
                    return None;
                }
                let feed = self.settings.units.feed(value);
                (feed > 0.0).then(|| format!("F{}", self.settings.format_number(feed)))
            }
            Param::T | Param::H | Param::I | Param::J | Param::D | Param::S => {
                Some(format!("{}{}", param, value.trunc() as i64))
            }
            _ => self.length_word(param, value, modal),
        }
    }

    fn length_word(&self, param: Param, value: f64, modal: &ModalState) -> Option<String> {
        if self.is_duplicate(param, value, modal) {
            return None;
        }
        Some(format!("{}{}", param, self.settings.format_length(value)))
    }

    fn is_duplicate(&self, param: Param, value: f64, modal: &ModalState) -> bool {
        self.settings.axis_modal && modal.is_unchanged(param, value)
    }

    /// G81/G82/G83 with a tap becomes a G84 rigid tap sequence
    ///
    /// Duplicate suppression compares against the state from before the
    /// sequence. F is the thread pitch here, so it is converted as a length.
    fn rigid_tap(&self, command: &Command, state: &mut EmissionState) {
        let out = &mut state.output;
        let modal = &state.modal;

        out.emit("G95");

        let position: Vec<String> = [Param::X, Param::Y]
            .into_iter()
            .filter_map(|p| command.get(p).and_then(|v| self.length_word(p, v, modal)))
            .collect();
        if !position.is_empty() {
            out.emit(&format!("G00 {}", position.join(" ")));
        }

        if let Some(speed) = command.get(Param::S) {
            state.tap_speed = speed.trunc() as i64;
        }
        out.emit(&format!("M29 S{}", state.tap_speed));

        let mut cycle = vec!["G84".to_string()];
        cycle.extend(
            [Param::Z, Param::R]
                .into_iter()
                .filter_map(|p| command.get(p).and_then(|v| self.length_word(p, v, modal))),
        );
        cycle.extend([Param::F, Param::P, Param::Q].into_iter().filter_map(|p| {
            command
                .get(p)
                .map(|v| format!("{}{}", p, self.settings.format_length(v)))
        }));
        out.emit(&cycle.join(" "));
        out.emit("G80");
        out.emit("G94");

        debug!(tool = ?self.op.tool.as_ref().map(|t| t.number), "rigid tap from {}", command.name);

        // The controller's F now holds the pitch; force the next feed out
        state.modal.record(command);
        state.modal.location.remove(&Param::F);
        state.modal.last_command = Some("G94".to_string());
    }

    fn tool_change(&self, command: &Command, state: &mut EmissionState) {
        let tool = command
            .get(Param::T)
            .map(|t| t.trunc() as i64)
            .or_else(|| self.op.tool.as_ref().map(|t| i64::from(t.number)));

        // Only the mnemonic and T reach the controller
        state.modal.last_command = Some(command.name.clone());
        if let Some(number) = command.get(Param::T) {
            state.modal.location.insert(Param::T, number);
        }

        let out = &mut state.output;
        out.emit("M5");
        out.emit_block(&self.settings.tool_change);
        match tool {
            Some(number) => {
                out.emit(&format!("M6 T{}", number));
                if self.settings.use_tlo {
                    out.emit(&format!("G43 H{}", number));
                }
            }
            None => {
                warn!(operation = %self.op.label, "tool change without a tool number");
                out.emit("M6");
            }
        }
    }
}

/// Join non-empty words with single spaces; comment lines stay unnumbered
fn emit_words(words: &[String], state: &mut EmissionState) {
    let line = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    if line.is_empty() {
        return;
    }
    if line.starts_with('(') {
        state.output.emit_raw(&line);
    } else {
        state.output.emit(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Operation;
    use crate::tool::{ToolDescriptor, ToolType};
    use pretty_assertions::assert_eq;

    fn commands(blocks: &[&str]) -> Vec<Command> {
        blocks.iter().map(|b| Command::parse(b).unwrap()).collect()
    }

    fn translate_with(settings: &Settings, op: &Operation) -> Vec<String> {
        let mut state = EmissionState::new(settings);
        Translator::new(settings, op).run(&mut state);
        state.output.lines
    }

    fn translate(blocks: &[&str]) -> Vec<String> {
        let op = Operation::new("Profile", commands(blocks));
        translate_with(&Settings::default(), &op)
    }

    fn tap_op(blocks: &[&str]) -> Operation {
        let mut op = Operation::new("Tapping", commands(blocks));
        op.tool = Some(ToolDescriptor::new(4, ToolType::Tap));
        op
    }

    #[test]
    fn test_rapid_then_feed() {
        let lines = translate(&["G0 X10 Y20 Z5", "G1 X10 Y20 Z-5 F100"]);
        assert_eq!(lines, vec!["G0 X10.000 Y20.000 Z5.000", "G1 Z-5.000 F6000.000"]);
    }

    #[test]
    fn test_modal_mnemonic_suppression() {
        let lines = translate(&["G1 X1 F10", "G1 X2", "G1 X2"]);
        // Third block repeats everything: no line at all
        assert_eq!(lines, vec!["G1 X1.000 F600.000", "X2.000"]);
    }

    #[test]
    fn test_no_modal_repeats_mnemonic() {
        let settings = Settings {
            modal: false,
            ..Settings::default()
        };
        let op = Operation::new("Profile", commands(&["G1 X1 F10", "G1 X2", "G1 X2"]));
        assert_eq!(
            translate_with(&settings, &op),
            vec!["G1 X1.000 F600.000", "G1 X2.000", "G1"]
        );
    }

    #[test]
    fn test_no_axis_modal_repeats_values() {
        let settings = Settings {
            axis_modal: false,
            ..Settings::default()
        };
        let op = Operation::new("Profile", commands(&["G1 X1 F10", "G1 X1 F10"]));
        assert_eq!(
            translate_with(&settings, &op),
            vec!["G1 X1.000 F600.000", "X1.000 F600.000"]
        );
    }

    #[test]
    fn test_seed_location_suppresses_minus_one() {
        let lines = translate(&["G0 X-1 Y3"]);
        assert_eq!(lines, vec!["G0 Y3.000"]);
    }

    #[test]
    fn test_feed_rules() {
        // No feed on rapids, and zero feeds are dropped
        let lines = translate(&["G0 X1 F50", "G1 X2 F0", "G1 X3 F-5"]);
        assert_eq!(lines, vec!["G0 X1.000", "G1 X2.000", "X3.000"]);
    }

    #[test]
    fn test_integer_words() {
        let lines = translate(&["G2 X5 Y5 I2.7 J-1.2 F10", "M3 S1200.9", "G41 D3.2"]);
        assert_eq!(
            lines,
            vec!["G2 X5.000 Y5.000 I2 J-1 F600.000", "M3 S1200", "G41 D3"]
        );
    }

    #[test]
    fn test_unknown_letters_ignored() {
        let lines = translate(&["G1 X1 K7 W3 F10"]);
        assert_eq!(lines, vec!["G1 X1.000 F600.000"]);
    }

    #[test]
    fn test_cycle_cancel_between_identical_cycles() {
        let lines = translate(&["G81 X1 Y1 Z-3 R2 F5", "G80", "G81 X4 Y1 Z-3 R2 F5", "G80", "G0 Z10"]);
        assert_eq!(
            lines,
            vec!["G81 X1.000 Y1.000 Z-3.000 F300.000 R2.000", "X4.000", "G80", "G0 Z10.000"]
        );
    }

    #[test]
    fn test_comments() {
        let lines = translate(&["(Profile outside)", "G0 Z5"]);
        assert_eq!(lines, vec!["(PROFILE OUTSIDE)", "G0 Z5.000"]);

        let settings = Settings {
            output_comments: false,
            ..Settings::default()
        };
        let op = Operation::new("Profile", commands(&["(Profile outside)", "G0 Z5"]));
        assert_eq!(translate_with(&settings, &op), vec!["G0 Z5.000"]);
    }

    #[test]
    fn test_comment_lines_not_numbered() {
        let settings = Settings {
            line_numbers: true,
            ..Settings::default()
        };
        let op = Operation::new("Profile", commands(&["(start)", "G0 Z5", "G1 Z1 F2"]));
        assert_eq!(
            translate_with(&settings, &op),
            vec!["(START)", "N10 G0 Z5.000", "N15 G1 Z1.000 F120.000"]
        );
    }

    #[test]
    fn test_message() {
        let mut op = Operation::new("Profile", commands(&["G0 Z5"]));
        op.commands.push(Command::message("check clamps"));
        op.commands.push(Command::parse("G0 Z10").unwrap());

        assert_eq!(
            translate_with(&Settings::default(), &op),
            vec!["G0 Z5.000", "CHECK CLAMPS", "G0 Z10.000"]
        );

        // Without comments the operation output so far is discarded
        let settings = Settings {
            output_comments: false,
            ..Settings::default()
        };
        assert_eq!(translate_with(&settings, &op), vec!["G0 Z10.000"]);
    }

    #[test]
    fn test_message_restarts_position_tracking() {
        let settings = Settings {
            output_comments: false,
            ..Settings::default()
        };
        let mut op = Operation::new("Profile", commands(&["G0 X5 Y5"]));
        op.commands.push(Command::message("note"));
        op.commands.push(Command::parse("G1 X5 Y5 Z-1 F10").unwrap());

        // Z-1 matches the seed location, X5 Y5 no longer count as emitted
        assert_eq!(
            translate_with(&settings, &op),
            vec!["G1 X5.000 Y5.000 F600.000"]
        );
    }

    #[test]
    fn test_message_gives_back_line_numbers() {
        let settings = Settings {
            output_comments: false,
            line_numbers: true,
            ..Settings::default()
        };
        let mut op = Operation::new("Profile", commands(&["G0 X5 Y5", "G0 Z3"]));
        op.commands.push(Command::message("note"));
        op.commands.push(Command::parse("G1 Z-2 F10").unwrap());

        assert_eq!(
            translate_with(&settings, &op),
            vec!["N10 G1 Z-2.000 F600.000"]
        );
    }

    #[test]
    fn test_fixture_rapids_suppressed() {
        let op = Operation::new("Fixture", commands(&["G0 X1", "G54"]));
        assert_eq!(translate_with(&Settings::default(), &op), vec!["G54"]);
    }

    #[test]
    fn test_tool_change() {
        let lines = translate(&["M6 T5 X3"]);
        assert_eq!(lines, vec!["M5", "M6 T5", "G43 H5"]);

        let settings = Settings {
            use_tlo: false,
            tool_change: "G28 G91 Z0\nG90".to_string(),
            ..Settings::default()
        };
        let op = Operation::new("Profile", commands(&["M06 T2"]));
        assert_eq!(
            translate_with(&settings, &op),
            vec!["M5", "G28 G91 Z0", "G90", "M6 T2"]
        );
    }

    #[test]
    fn test_tool_change_ignores_axis_words() {
        let lines = translate(&["M6 T5 X3", "G0 X3"]);
        assert_eq!(lines, vec!["M5", "M6 T5", "G43 H5", "G0 X3.000"]);
    }

    #[test]
    fn test_tool_change_falls_back_to_operation_tool() {
        let mut op = Operation::new("Profile", commands(&["M6"]));
        op.tool = Some(ToolDescriptor::new(9, ToolType::EndMill));
        assert_eq!(
            translate_with(&Settings::default(), &op),
            vec!["M5", "M6 T9", "G43 H9"]
        );

        let op = Operation::new("Profile", commands(&["M6"]));
        assert_eq!(translate_with(&Settings::default(), &op), vec!["M5", "M6"]);
    }

    #[test]
    fn test_rigid_tap() {
        let op = tap_op(&["M3 S500", "G0 X5 Y5", "G83 X5 Y5 Z-10 R2 F1.5 Q2"]);
        let lines = translate_with(&Settings::default(), &op);
        assert_eq!(
            lines,
            vec![
                "G0 X5.000 Y5.000",
                "G95",
                "M29 S500",
                "G84 Z-10.000 R2.000 F1.500 Q2.000",
                "G80",
                "G94",
            ]
        );
        assert!(!lines.iter().any(|l| l.contains("G81") || l.contains("G83") || l.contains("M3")));
    }

    #[test]
    fn test_rigid_tap_positions_and_speed_override() {
        let op = tap_op(&["M3 S500", "G81 X5 Y7 Z-10 F1 S300", "G81 X9 Y7 Z-10 F1"]);
        let lines = translate_with(&Settings::default(), &op);
        assert_eq!(
            lines,
            vec![
                "G95",
                "G00 X5.000 Y7.000",
                "M29 S300",
                "G84 Z-10.000 F1.000",
                "G80",
                "G94",
                "G95",
                "G00 X9.000",
                "M29 S300",
                "G84 F1.000",
                "G80",
                "G94",
            ]
        );
    }

    #[test]
    fn test_tap_speed_from_operation() {
        let mut op = tap_op(&["M3", "G81 Z-4 F0.8"]);
        op.spindle_speed = Some(650.0);
        let lines = translate_with(&Settings::default(), &op);
        assert!(lines.contains(&"M29 S650".to_string()));
    }

    #[test]
    fn test_feed_after_tap_is_reissued() {
        let op = tap_op(&["G81 Z-4 F1", "G1 X3 F1"]);
        let lines = translate_with(&Settings::default(), &op);
        assert_eq!(lines.last().map(String::as_str), Some("G1 X3.000 F60.000"));
    }

    #[test]
    fn test_drill_without_tap_passes_through() {
        let lines = translate(&["M3 S800", "G81 X1 Y2 Z-3 R1 F4"]);
        assert_eq!(
            lines,
            vec!["M3 S800", "G81 X1.000 Y2.000 Z-3.000 F240.000 R1.000"]
        );
    }

    #[test]
    fn test_imperial_output() {
        let settings = Settings::resolve("--inches").unwrap();
        let op = Operation::new("Profile", commands(&["G1 X25.4 Y12.7 F25.4"]));
        assert_eq!(
            translate_with(&settings, &op),
            vec!["G1 X1.0000 Y0.5000 F60.0000"]
        );
    }
}
