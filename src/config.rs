// src/config.rs
// Agent configuration: cef_config.json merged over built-in defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::AgentResult;

pub const DEFAULT_CONFIG_FILE: &str = "cef_config.json";

/// Run configuration, loaded once per invocation and immutable afterwards.
///
/// Every field has a built-in default; a user-supplied JSON file only needs to
/// name the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub cef_version: String,
    pub platform: String,
    pub architecture: String,
    pub build_configuration: String,
    pub cmake_version: String,
    pub vs_generator: String,
    pub output_directory: PathBuf,
    pub temp_directory: PathBuf,
    pub runtime_library: String,
    pub enable_mfc_integration: bool,
    pub mfc_solution_path: Option<PathBuf>,
    pub mfc_binary_dir: Option<PathBuf>,
    pub mfc_cef_binary_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            cef_version: "140.1.13+g5eb3258+chromium-140.0.7339.41".to_string(),
            platform: "windows64".to_string(),
            architecture: "x64".to_string(),
            build_configuration: "Release".to_string(),
            cmake_version: "3.30.1".to_string(),
            vs_generator: "Visual Studio 17 2022".to_string(),
            output_directory: PathBuf::from("bin/NT/cef/release"),
            temp_directory: PathBuf::from("temp/cef-workflow"),
            runtime_library: "MultiThreadedDLL".to_string(),
            enable_mfc_integration: false,
            mfc_solution_path: None,
            mfc_binary_dir: None,
            mfc_cef_binary_dir: None,
        }
    }
}

impl AgentConfig {
    /// Load configuration from `path`.
    ///
    /// Missing file: the defaults are written there and returned. Unreadable
    /// or malformed file: a warning is printed and the defaults are used, so
    /// a broken config never aborts a run before logging is even up.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(raw) => match serde_json::from_str::<AgentConfig>(&raw) {
                    Ok(config) => {
                        println!("✓ Loaded configuration from: {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        eprintln!("⚠ Error loading config: {}", e);
                        eprintln!("Using default configuration");
                    }
                },
                Err(e) => {
                    eprintln!("⚠ Error reading config: {}", e);
                    eprintln!("Using default configuration");
                }
            }
            AgentConfig::default()
        } else {
            eprintln!("⚠ Config file not found: {}", path.display());
            eprintln!("Creating default configuration...");
            let config = AgentConfig::default();
            if let Err(e) = config.save(path) {
                eprintln!("✗ Error saving config: {}", e);
            }
            config
        }
    }

    /// Persist this configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> AgentResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        println!("✓ Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Render the active settings as a banner for the run log.
    pub fn display(&self) -> String {
        let mut out = String::new();
        out.push_str(&"=".repeat(70));
        out.push_str("\nCONFIGURATION\n");
        out.push_str(&"=".repeat(70));
        out.push('\n');
        let mut line = |key: &str, value: String| {
            out.push_str(&format!("  {:25}: {}\n", key, value));
        };
        line("cef_version", self.cef_version.clone());
        line("platform", self.platform.clone());
        line("architecture", self.architecture.clone());
        line("build_configuration", self.build_configuration.clone());
        line("cmake_version", self.cmake_version.clone());
        line("vs_generator", self.vs_generator.clone());
        line("output_directory", self.output_directory.display().to_string());
        line("temp_directory", self.temp_directory.display().to_string());
        line("runtime_library", self.runtime_library.clone());
        line("enable_mfc_integration", self.enable_mfc_integration.to_string());
        out.push_str(&"=".repeat(70));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.architecture, "x64");
        assert_eq!(config.runtime_library, "MultiThreadedDLL");
        assert!(!config.enable_mfc_integration);
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cef_config.json");
        fs::write(&path, r#"{"cef_version": "999"}"#).unwrap();

        let config = AgentConfig::load(&path);
        let defaults = AgentConfig::default();
        assert_eq!(config.cef_version, "999");
        assert_eq!(config.platform, defaults.platform);
        assert_eq!(config.output_directory, defaults.output_directory);
        assert_eq!(config.cmake_version, defaults.cmake_version);
    }

    #[test]
    fn test_missing_file_persists_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cef_config.json");

        let config = AgentConfig::load(&path);
        assert!(path.exists());
        assert_eq!(config.cef_version, AgentConfig::default().cef_version);

        // Round-trips through the file it just wrote.
        let reloaded = AgentConfig::load(&path);
        assert_eq!(reloaded.architecture, config.architecture);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cef_config.json");
        fs::write(&path, "{not json").unwrap();

        let config = AgentConfig::load(&path);
        assert_eq!(config.cef_version, AgentConfig::default().cef_version);
    }
}
