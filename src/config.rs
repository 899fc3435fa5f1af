//! Worker manifest for the keeperd binary.
//!
//! The core supervisor does not parse configuration; this is the thin
//! declaration format the binary uses to wire concrete workers into it.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;

use crate::error::SupervisorError;

/// Top-level manifest: a named set of workers to supervise.
///
/// Workers are registered in name order, so names double as a deterministic
/// registration order.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Map of worker names to their declarations.
    pub workers: BTreeMap<String, WorkerConfig>,
}

/// Declaration of one worker process.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Shell command the worker executes.
    pub command: String,
    /// Whether to respawn the worker when it exits unexpectedly.
    #[serde(default = "default_respawn")]
    pub respawn: bool,
}

fn default_respawn() -> bool {
    true
}

/// Loads and parses a worker manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest, SupervisorError> {
    let contents = fs::read_to_string(path)?;
    let manifest = serde_yaml::from_str(&contents)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn parses_manifest_with_defaults() {
        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            r#"workers:
  web:
    command: "sleep 30"
  batch:
    command: "true"
    respawn: false
"#
        )
        .expect("write");

        let manifest = load_manifest(file.path()).expect("load");
        assert_eq!(manifest.workers.len(), 2);
        assert!(manifest.workers["web"].respawn);
        assert!(!manifest.workers["batch"].respawn);
        assert_eq!(manifest.workers["batch"].command, "true");
    }

    #[test]
    fn empty_worker_map_is_valid() {
        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(file, "workers: {{}}").expect("write");

        let manifest = load_manifest(file.path()).expect("load");
        assert!(manifest.workers.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_manifest(Path::new("/nonexistent/keeper.yaml"))
            .expect_err("must fail");
        assert!(matches!(err, SupervisorError::Io(_)));
    }
}
