// src/errors.rs
// Agent error handling

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Error types for the CEF agent pipelines
#[derive(Debug, Error)]
pub enum AgentError {
    // Resolution
    #[error("Could not resolve download URL: {0}")]
    UrlResolution(String),

    #[error("Toolchain not found: {tool} - {hint}")]
    ToolchainNotFound { tool: String, hint: String },

    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    // Transport
    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Command execution failed: {cmd} - {reason}")]
    CommandFailed { cmd: String, reason: String },

    #[error("Command exited with code {code}: {cmd}")]
    CommandExited { cmd: String, code: i32 },

    // Archives & installation
    #[error("Unsupported archive format: {0}")]
    UnsupportedArchive(String),

    #[error("Extraction failed for {archive}: {reason}")]
    ExtractionFailed { archive: PathBuf, reason: String },

    #[error("No CEF payload found under {0}")]
    PayloadRootNotFound(PathBuf),

    #[error("Backup failed: {0}")]
    BackupFailed(String),

    // Build
    #[error("Project patch failed for {path}: {reason}")]
    ProjectPatchFailed { path: PathBuf, reason: String },

    // Configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // General
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AgentError {
    /// Whether the orchestrator may continue past this error with a warning.
    pub fn is_warning_only(&self) -> bool {
        matches!(self, AgentError::ProjectPatchFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::UrlResolution("no index entry".to_string());
        assert_eq!(err.to_string(), "Could not resolve download URL: no index entry");
    }

    #[test]
    fn test_patch_failure_is_warning_only() {
        let err = AgentError::ProjectPatchFailed {
            path: PathBuf::from("a.vcxproj"),
            reason: "bad xml".to_string(),
        };
        assert!(err.is_warning_only());
        assert!(!AgentError::UnsupportedArchive(".rar".into()).is_warning_only());
    }
}
