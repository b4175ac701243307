//! Launch plans: how to run a server for a given directory
//!
//! The orchestrator treats the plan as opaque; it only needs a program,
//! its arguments, and the kind to label the resulting record with. The
//! built-in [`ProjectDetector`] covers the common cases and anything
//! fancier can implement [`LaunchPlanner`].

use std::path::Path;

use crate::error::SkyError;
use crate::types::ServerKind;

/// Concrete command to launch a server on a given port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub kind: ServerKind,
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment for the child (e.g. PORT for node projects)
    pub env: Vec<(String, String)>,
}

/// Resolves a directory into a launch plan
pub trait LaunchPlanner: Send + Sync {
    fn detect(&self, directory: &Path, port: u16) -> Result<LaunchPlan, SkyError>;
}

/// File-marker based project detection
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectDetector;

impl LaunchPlanner for ProjectDetector {
    fn detect(&self, directory: &Path, port: u16) -> Result<LaunchPlan, SkyError> {
        if directory.join("package.json").exists() {
            return Ok(LaunchPlan {
                kind: ServerKind::Node,
                program: "npm".to_string(),
                args: vec!["start".to_string()],
                env: vec![("PORT".to_string(), port.to_string())],
            });
        }

        for entry in ["app.py", "main.py"] {
            if directory.join(entry).exists() {
                return Ok(LaunchPlan {
                    kind: ServerKind::Python,
                    program: "python3".to_string(),
                    args: vec![entry.to_string()],
                    env: vec![("PORT".to_string(), port.to_string())],
                });
            }
        }

        // Anything else is served as plain files
        Ok(LaunchPlan {
            kind: ServerKind::Static,
            program: "python3".to_string(),
            args: vec![
                "-m".to_string(),
                "http.server".to_string(),
                port.to_string(),
                "--bind".to_string(),
                "127.0.0.1".to_string(),
            ],
            env: Vec::new(),
        })
    }
}
