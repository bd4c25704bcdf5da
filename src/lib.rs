//! Haas NGC post-processor
//!
//! Restates an already computed tool-path tree as a Haas Next Generation
//! Control milling program.

pub mod config;
pub mod error;
pub mod export;
pub mod lexer;
pub mod path;
pub mod post;
pub mod tool;

pub use config::{ConfigParseError, Settings, UnitSystem};
pub use error::ExportError;
pub use export::{export, export_with, Destination, Job, Review};
pub use path::{Command, CoolantMode, Operation, Param, PathNode};
pub use post::{HaasNgcPost, PostProcessor};
pub use tool::{ToolDescriptor, ToolType};

/// Initialize logging
///
/// Logs go to stderr so program text written to stdout stays clean.
/// `RUST_LOG` adjusts the filter.
pub fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    // A subscriber may already be installed by an embedding application
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
