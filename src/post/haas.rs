//! Haas Next Generation Control post-processor
//!
//! Haas is Fanuc-compatible. Taps are rigid tapped with M29/G84 and every
//! tool change picks up its length offset with G43.

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::ExportError;
use crate::path::{CoolantMode, Operation, PathNode};
use crate::post::translate::Translator;
use crate::post::{EmissionState, GCodeOutput, PostProcessor};

pub struct HaasNgcPost {
    settings: Settings,
    timestamp: NaiveDateTime,
}

impl HaasNgcPost {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            timestamp: Local::now().naive_local(),
        }
    }

    /// Fix the time written to the header
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn emit_header(&self, out: &mut GCodeOutput) {
        if !self.settings.output_header {
            return;
        }
        out.emit_raw("%");
        out.emit_raw("O");
        out.emit_comment("EXPORTED BY HAASPOST");
        out.emit_comment(&format!("POST PROCESSOR: {}", self.settings.machine_name));
        out.emit_comment(&format!(
            "OUTPUT TIME: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string().to_uppercase()
        ));
    }

    fn emit_preamble(&self, out: &mut GCodeOutput) {
        if self.settings.output_comments {
            out.emit_comment("BEGIN PREAMBLE");
        }
        out.emit_block(&self.settings.preamble);
        out.emit(self.settings.units.gcode());
    }

    fn emit_postamble(&self, out: &mut GCodeOutput) {
        if self.settings.output_comments {
            out.emit_comment("BEGIN POSTAMBLE");
        }
        out.emit_block(&self.settings.postamble);
        out.emit_raw("%");
    }

    fn emit_node(&self, node: &PathNode, state: &mut EmissionState) {
        match node {
            PathNode::Group { children, .. } => {
                for child in children {
                    self.emit_node(child, state);
                }
            }
            PathNode::Operation(op) => self.emit_operation(op, state),
            PathNode::Other { name } => debug!(name = %name, "skipping object without a path"),
        }
    }

    fn emit_operation(&self, op: &Operation, state: &mut EmissionState) {
        if !op.is_active() {
            debug!(operation = %op.label, "skipping inactive operation");
            return;
        }

        let comments = self.settings.output_comments;
        let label = op.label.to_uppercase();
        let coolant = op.coolant();

        if comments {
            state.output.emit_comment(&format!("BEGIN OPERATION: {}", label));
            if let Some(cycle_time) = &op.cycle_time {
                state.output.emit_comment(&format!("CYCLE TIME: {}", cycle_time));
            }
        }
        state.output.emit_block(&self.settings.pre_operation);

        let coolant_on = match coolant {
            CoolantMode::None => None,
            CoolantMode::Flood => Some("M8"),
            CoolantMode::Mist => Some("M7"),
        };
        if let Some(code) = coolant_on {
            if comments {
                state
                    .output
                    .emit_comment(&format!("COOLANT ON:{}", coolant.to_string().to_uppercase()));
            }
            state.output.emit(code);
        }

        Translator::new(&self.settings, op).run(state);

        if coolant_on.is_some() {
            if comments {
                state
                    .output
                    .emit_comment(&format!("COOLANT OFF:{}", coolant.to_string().to_uppercase()));
            }
            state.output.emit("M9");
        }

        state.output.emit_block(&self.settings.post_operation);
        if comments {
            state.output.emit_comment(&format!("FINISH OPERATION: {}", label));
        }
    }
}

impl PostProcessor for HaasNgcPost {
    fn process(&self, nodes: &[PathNode]) -> Result<String, ExportError> {
        if let Some(node) = nodes.iter().find(|n| !n.is_path()) {
            return Err(ExportError::NotAPath(node.name().to_string()));
        }

        info!("postprocessing...");
        let mut state = EmissionState::new(&self.settings);

        self.emit_header(&mut state.output);
        self.emit_preamble(&mut state.output);
        for node in nodes {
            self.emit_node(node, &mut state);
        }
        self.emit_postamble(&mut state.output);

        Ok(state.output.to_string())
    }

    fn name(&self) -> &str {
        "Haas NGC"
    }

    fn show_editor(&self) -> bool {
        self.settings.show_editor
    }
}
