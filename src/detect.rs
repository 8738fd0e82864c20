// src/detect.rs
// Detection of existing CEF installations

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::logger::RunLogger;
use crate::platform::Platform;

/// Result of scanning for an installed CEF.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionResult {
    pub found: bool,
    pub version: Option<String>,
    pub chromium_version: Option<String>,
    pub architecture: Option<String>,
    pub paths: Vec<PathBuf>,
}

pub struct CefDetector<'a> {
    logger: &'a RunLogger,
    platform: Platform,
}

impl<'a> CefDetector<'a> {
    pub fn new(logger: &'a RunLogger, platform: Platform) -> Self {
        CefDetector { logger, platform }
    }

    /// Detect CEF in a specific application path, or system-wide when no path
    /// is given.
    pub fn detect(&self, app_path: Option<&Path>) -> DetectionResult {
        self.logger.section("CEF Detection");

        let result = match app_path {
            Some(path) => {
                self.logger.info(&format!("Searching for CEF in: {}", path.display()));
                self.detect_in_directory(path)
            }
            None => {
                self.logger.info("Searching for CEF installations system-wide...");
                let mut found = DetectionResult::default();
                for path in self.platform.common_install_paths() {
                    let detected = self.detect_in_directory(&path);
                    if detected.found {
                        found = detected;
                        break;
                    }
                }
                found
            }
        };

        if result.found {
            self.logger.info("\n✓ CEF Found!");
            self.logger
                .info(&format!("  Version: {}", result.version.as_deref().unwrap_or("Unknown")));
            self.logger.info(&format!(
                "  Chromium Version: {}",
                result.chromium_version.as_deref().unwrap_or("Unknown")
            ));
            self.logger.info(&format!(
                "  Architecture: {}",
                result.architecture.as_deref().unwrap_or("Unknown")
            ));
            let paths: Vec<String> = result.paths.iter().map(|p| p.display().to_string()).collect();
            self.logger.info(&format!("  Paths: {}", paths.join(", ")));
        } else {
            self.logger.info("\n✗ No CEF installation detected");
        }

        result
    }

    fn detect_in_directory(&self, directory: &Path) -> DetectionResult {
        let mut result = DetectionResult::default();
        let markers = self.platform.cef_markers();

        for entry in WalkDir::new(directory).into_iter().filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy();
            if markers.iter().any(|m| name.as_ref() == *m) {
                let root = entry
                    .path()
                    .parent()
                    .unwrap_or(directory)
                    .to_path_buf();
                result.found = true;
                result.paths.push(root.clone());
                self.extract_version_info(&root, &mut result);
                break;
            }
        }

        result
    }

    /// Scrape version strings out of the text files CEF distributions ship.
    fn extract_version_info(&self, cef_path: &Path, result: &mut DetectionResult) {
        for version_file in ["version.txt", "README.txt", "VERSION"] {
            let version_path = cef_path.join(version_file);
            if !version_path.exists() {
                continue;
            }
            match fs::read_to_string(&version_path) {
                Ok(content) => {
                    for line in content.lines() {
                        if line.contains("CEF Version") || line.contains("cef_version") {
                            if let Some((_, value)) = line.split_once(':') {
                                result.version = Some(value.trim().to_string());
                            }
                        }
                        if line.contains("Chromium Version") || line.contains("chromium_version") {
                            if let Some((_, value)) = line.split_once(':') {
                                result.chromium_version = Some(value.trim().to_string());
                            }
                        }
                    }
                }
                Err(e) => {
                    self.logger
                        .warn(&format!("Warning: Could not read {}: {}", version_file, e));
                }
            }
        }

        result.architecture = self.guess_architecture(cef_path);
    }

    fn guess_architecture(&self, cef_path: &Path) -> Option<String> {
        if self.platform == Platform::Windows {
            // File-size heuristic: the 64-bit libcef.dll is well over 100 MB.
            let libcef = cef_path.join("libcef.dll");
            let meta = fs::metadata(&libcef).ok()?;
            let size_mb = meta.len() / (1024 * 1024);
            Some(if size_mb > 100 { "x64" } else { "x86" }.to_string())
        } else {
            Some(std::env::consts::ARCH.to_string())
        }
    }
}
