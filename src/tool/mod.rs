//! Tool descriptors attached to operations
//!
//! The host hands over the tool each operation runs with. The post only
//! needs its number and enough classification to spot taps.

use serde::{Deserialize, Serialize};

/// Tool type classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ToolType {
    #[serde(rename = "end_mill", alias = "endmill", alias = "EndMill", alias = "END_MILL")]
    #[default]
    EndMill,
    #[serde(rename = "drill", alias = "Drill", alias = "DRILL")]
    Drill,
    #[serde(rename = "ball_mill", alias = "ballmill", alias = "BallEndMill", alias = "BALL_MILL")]
    BallMill,
    #[serde(rename = "chamfer_mill", alias = "chamfermill", alias = "ChamferMill", alias = "CHAMFER_MILL")]
    ChamferMill,
    #[serde(rename = "face_mill", alias = "facemill", alias = "FaceMill", alias = "FACE_MILL")]
    FaceMill,
    #[serde(rename = "reamer", alias = "Reamer", alias = "REAMER")]
    Reamer,
    #[serde(rename = "tap", alias = "Tap", alias = "TAP")]
    Tap,
    #[serde(rename = "countersink", alias = "CounterSink", alias = "COUNTERSINK")]
    Countersink,
}

/// Tool as seen by the post-processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool number (T-word)
    pub number: u32,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Tool type
    #[serde(rename = "type", default)]
    pub tool_type: ToolType,

    /// Shape file name of a bit-based tool ("tap", "endmill", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_name: Option<String>,
}

impl ToolDescriptor {
    pub fn new(number: u32, tool_type: ToolType) -> Self {
        Self {
            number,
            name: String::new(),
            tool_type,
            shape_name: None,
        }
    }

    pub fn with_shape(mut self, shape: &str) -> Self {
        self.shape_name = Some(shape.to_string());
        self
    }

    /// Taps are recognised either by type or by their shape file
    pub fn is_tap(&self) -> bool {
        self.tool_type == ToolType::Tap
            || self
                .shape_name
                .as_deref()
                .is_some_and(|shape| shape.eq_ignore_ascii_case("tap"))
    }
}
