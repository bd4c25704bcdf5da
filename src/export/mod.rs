//! Export boundary
//!
//! Resolves options, runs a post, offers the text for review and writes it
//! out unless the destination is the `-` sentinel.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Settings;
use crate::error::ExportError;
use crate::path::PathNode;
use crate::post::{HaasNgcPost, PostProcessor};

/// Where the finished program goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Return the text only
    NoFile,
    File(PathBuf),
}

impl From<&str> for Destination {
    fn from(name: &str) -> Self {
        if name == "-" {
            Destination::NoFile
        } else {
            Destination::File(PathBuf::from(name))
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::NoFile => write!(f, "-"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One-shot review of the generated program before it is finalized
pub trait Review {
    /// Returns replacement text, or `None` to keep the program as generated
    fn review(&self, gcode: &str) -> Option<String>;
}

impl<F> Review for F
where
    F: Fn(&str) -> Option<String>,
{
    fn review(&self, gcode: &str) -> Option<String> {
        self(gcode)
    }
}

/// A job file: the path tree plus optional default options
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Job {
    pub nodes: Vec<PathNode>,
    #[serde(default)]
    pub options: String,
}

impl Job {
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a job from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Export with the Haas NGC post
///
/// Nothing is produced when the options fail to parse or a top-level node
/// is not a path.
pub fn export(
    nodes: &[PathNode],
    destination: &Destination,
    args: &str,
    review: Option<&dyn Review>,
) -> Result<String, ExportError> {
    let settings = Settings::resolve(args)?;
    let post = HaasNgcPost::new(settings);
    export_with(&post, nodes, destination, review)
}

/// Export with any post-processor
pub fn export_with<P: PostProcessor>(
    post: &P,
    nodes: &[PathNode],
    destination: &Destination,
    review: Option<&dyn Review>,
) -> Result<String, ExportError> {
    let gcode = post.process(nodes)?;

    let final_text = match review {
        Some(reviewer) if post.show_editor() => reviewer.review(&gcode).unwrap_or(gcode),
        _ => gcode,
    };

    if let Destination::File(path) = destination {
        std::fs::write(path, &final_text)?;
        info!(post = post.name(), "wrote {}", path.display());
    }
    info!("done postprocessing.");

    Ok(final_text)
}
