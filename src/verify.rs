// src/verify.rs
// Post-install verification of a CEF directory

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::logger::RunLogger;
use crate::platform::Platform;

const RESOURCE_PACKS: [&str; 3] = ["cef.pak", "cef_100_percent.pak", "cef_200_percent.pak"];

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct VerifyOutcome {
    pub checks_passed: u32,
    pub checks_total: u32,
    pub success: bool,
}

pub struct InstallVerifier<'a> {
    logger: &'a RunLogger,
    platform: Platform,
}

impl<'a> InstallVerifier<'a> {
    pub fn new(logger: &'a RunLogger, platform: Platform) -> Self {
        InstallVerifier { logger, platform }
    }

    /// Run the three independent installation checks: core library present,
    /// at least one resource pack present, locales directory populated.
    /// Partial success is a warning-level outcome, never fatal.
    pub fn verify(&self, cef_dir: &Path, dry_run: bool) -> VerifyOutcome {
        self.logger.section("Verifying CEF Installation");

        if dry_run {
            self.logger.info("[DRY RUN] Would verify installation");
            return VerifyOutcome {
                checks_passed: 3,
                checks_total: 3,
                success: true,
            };
        }

        let mut checks_passed = 0;
        let checks_total = 3;

        let lib_name = self.platform.core_library();
        match find_file(cef_dir, lib_name) {
            Some(path) => {
                self.logger
                    .info(&format!("✓ Core library found: {}", path.display()));
                checks_passed += 1;
            }
            None => self.logger.info(&format!("✗ Core library not found: {}", lib_name)),
        }

        let resources_found = RESOURCE_PACKS
            .iter()
            .filter(|name| find_file(cef_dir, name).is_some())
            .count();
        if resources_found >= 1 {
            self.logger.info(&format!(
                "✓ Resources found: {}/{}",
                resources_found,
                RESOURCE_PACKS.len()
            ));
            checks_passed += 1;
        } else {
            self.logger.info("✗ Resources not found");
        }

        match find_directory(cef_dir, "locales") {
            Some(locales_dir) => {
                let locale_count = std::fs::read_dir(&locales_dir)
                    .map(|entries| {
                        entries
                            .filter_map(|e| e.ok())
                            .filter(|e| e.path().extension().map_or(false, |ext| ext == "pak"))
                            .count()
                    })
                    .unwrap_or(0);
                if locale_count > 0 {
                    self.logger.info(&format!(
                        "✓ Locales directory found with {} locales",
                        locale_count
                    ));
                    checks_passed += 1;
                } else {
                    self.logger.info("✗ Locales directory is empty");
                }
            }
            None => self.logger.info("✗ Locales directory not found"),
        }

        self.logger.info(&format!(
            "\nVerification: {}/{} checks passed",
            checks_passed, checks_total
        ));

        let success = checks_passed == checks_total;
        if success {
            self.logger.info("✓ Installation verified successfully");
        } else {
            self.logger.warn("⚠ Installation verification incomplete");
        }

        VerifyOutcome {
            checks_passed,
            checks_total,
            success,
        }
    }
}

fn find_file(directory: &Path, filename: &str) -> Option<PathBuf> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == filename)
        .map(|e| e.into_path())
}

fn find_directory(directory: &Path, dirname: &str) -> Option<PathBuf> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_dir() && e.file_name().to_string_lossy() == dirname)
        .map(|e| e.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn populate_full_install(root: &Path, platform: Platform) {
        fs::create_dir_all(root.join("Release")).unwrap();
        fs::write(root.join("Release").join(platform.core_library()), b"").unwrap();
        fs::create_dir_all(root.join("Resources/locales")).unwrap();
        fs::write(root.join("Resources/cef.pak"), b"").unwrap();
        fs::write(root.join("Resources/locales/en-US.pak"), b"").unwrap();
    }

    #[test]
    fn test_all_checks_pass() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let platform = Platform::detect();

        let install = dir.path().join("install");
        populate_full_install(&install, platform);

        let verifier = InstallVerifier::new(&logger, platform);
        let outcome = verifier.verify(&install, false);
        assert_eq!(outcome.checks_passed, 3);
        assert!(outcome.success);
    }

    #[test]
    fn test_partial_install_reports_count() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let platform = Platform::detect();

        // Core library only; no resource packs, no locales.
        let install = dir.path().join("install");
        fs::create_dir_all(&install).unwrap();
        fs::write(install.join(platform.core_library()), b"").unwrap();

        let verifier = InstallVerifier::new(&logger, platform);
        let outcome = verifier.verify(&install, false);
        assert_eq!(outcome.checks_passed, 1);
        assert_eq!(outcome.checks_total, 3);
        assert!(!outcome.success);
    }

    #[test]
    fn test_dry_run_shape() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let verifier = InstallVerifier::new(&logger, Platform::detect());

        let outcome = verifier.verify(&dir.path().join("nonexistent"), true);
        assert!(outcome.success);
        assert_eq!(outcome.checks_passed, outcome.checks_total);
    }
}
