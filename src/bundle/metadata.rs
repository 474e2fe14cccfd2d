//! Bundle manifest (`manifest.json`)

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Archive entry name reserved for the manifest
pub const MANIFEST_NAME: &str = "manifest.json";

/// Manifest schema version written by this crate
pub const MANIFEST_VERSION: &str = "1.0";

/// Summary stored as `manifest.json` at the archive root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub version: String,
    pub created_at: DateTime<Utc>,
    /// Archive path of the main workflow file
    pub main_workflow: String,
    /// Version declared by the main document, empty when absent
    pub wdl_version: String,
    /// Archive paths of every imported file, dependencies first
    pub dependencies: Vec<String>,
    /// Number of WDL files in the archive, manifest excluded
    pub total_files: usize,
}

impl BundleMetadata {
    pub fn new(
        main_workflow: String,
        wdl_version: String,
        dependencies: Vec<String>,
        total_files: usize,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            created_at: Utc::now().trunc_subsecs(0),
            main_workflow,
            wdl_version,
            dependencies,
            total_files,
        }
    }
}
