// src/build/collect.rs
// Gathers build products into a flat deployment directory

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::errors::AgentResult;
use crate::install::copy_dir_all;
use crate::logger::RunLogger;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CollectOutcome {
    pub copied: u32,
    pub missing: u32,
}

/// Copies headers, prebuilt binaries, resources and the freshly built
/// wrapper library from a CEF source/build tree into one output directory.
pub struct BinaryCollector<'a> {
    logger: &'a RunLogger,
}

impl<'a> BinaryCollector<'a> {
    pub fn new(logger: &'a RunLogger) -> Self {
        BinaryCollector { logger }
    }

    /// Collect everything an embedding application links against. Missing
    /// pieces are warnings, not failures: a partial collection is still
    /// usable for inspection.
    pub fn collect(
        &self,
        cef_source: &Path,
        build_dir: &Path,
        output_dir: &Path,
        build_configuration: &str,
        dry_run: bool,
    ) -> AgentResult<CollectOutcome> {
        self.logger.section("Collecting Binaries");
        self.logger
            .info(&format!("Output Directory: {}", output_dir.display()));

        let mut outcome = CollectOutcome::default();

        let include_dir = cef_source.join("include");
        let binaries_dir = cef_source.join(build_configuration);
        let resources_dir = cef_source.join("Resources");
        let wrapper_lib = build_dir
            .join("libcef_dll_wrapper")
            .join(build_configuration)
            .join("libcef_dll_wrapper.lib");

        if dry_run {
            self.logger.info("[DRY RUN] Would collect:");
            self.logger
                .info(&format!("  Headers from: {}", include_dir.display()));
            self.logger
                .info(&format!("  Binaries from: {}", binaries_dir.display()));
            self.logger
                .info(&format!("  Resources from: {}", resources_dir.display()));
            self.logger
                .info(&format!("  Wrapper library: {}", wrapper_lib.display()));
            return Ok(outcome);
        }

        fs::create_dir_all(output_dir)?;

        if include_dir.is_dir() {
            let target = output_dir.join("include");
            if target.exists() {
                fs::remove_dir_all(&target)?;
            }
            copy_dir_all(&include_dir, &target)?;
            self.logger.info("✓ Headers copied to include/");
            outcome.copied += 1;
        } else {
            self.logger
                .warn(&format!("⚠ Headers not found: {}", include_dir.display()));
            outcome.missing += 1;
        }

        for (label, dir) in [("Binaries", &binaries_dir), ("Resources", &resources_dir)] {
            if dir.is_dir() {
                let mut count = 0;
                for entry in fs::read_dir(dir)? {
                    let entry = entry?;
                    let target = output_dir.join(entry.file_name());
                    if entry.file_type()?.is_dir() {
                        if target.exists() {
                            fs::remove_dir_all(&target)?;
                        }
                        copy_dir_all(&entry.path(), &target)?;
                    } else {
                        fs::copy(entry.path(), &target)?;
                    }
                    count += 1;
                }
                self.logger.info(&format!("✓ {} copied: {} items", label, count));
                outcome.copied += 1;
            } else {
                self.logger
                    .warn(&format!("⚠ {} not found: {}", label, dir.display()));
                outcome.missing += 1;
            }
        }

        if wrapper_lib.is_file() {
            fs::copy(&wrapper_lib, output_dir.join("libcef_dll_wrapper.lib"))?;
            self.logger.info("✓ Wrapper library copied");
            outcome.copied += 1;
        } else {
            self.logger.warn(&format!(
                "⚠ Wrapper library not found: {}",
                wrapper_lib.display()
            ));
            outcome.missing += 1;
        }

        self.logger.info(&format!(
            "\nCollection: {} copied, {} missing",
            outcome.copied, outcome.missing
        ));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_collects_full_tree() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();

        let source = dir.path().join("cef_binary_test");
        fs::create_dir_all(source.join("include/base")).unwrap();
        fs::write(source.join("include/cef_app.h"), b"").unwrap();
        fs::create_dir_all(source.join("Release")).unwrap();
        fs::write(source.join("Release/libcef.dll"), b"").unwrap();
        fs::create_dir_all(source.join("Resources/locales")).unwrap();
        fs::write(source.join("Resources/cef.pak"), b"").unwrap();

        let build = dir.path().join("build");
        fs::create_dir_all(build.join("libcef_dll_wrapper/Release")).unwrap();
        fs::write(build.join("libcef_dll_wrapper/Release/libcef_dll_wrapper.lib"), b"").unwrap();

        let output = dir.path().join("out");
        let collector = BinaryCollector::new(&logger);
        let outcome = collector
            .collect(&source, &build, &output, "Release", false)
            .unwrap();

        assert_eq!(outcome.copied, 4);
        assert_eq!(outcome.missing, 0);
        assert!(output.join("include/cef_app.h").is_file());
        assert!(output.join("libcef.dll").is_file());
        assert!(output.join("cef.pak").is_file());
        assert!(output.join("locales").is_dir());
        assert!(output.join("libcef_dll_wrapper.lib").is_file());
    }

    #[test]
    fn test_missing_pieces_are_warnings() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();

        let source = dir.path().join("cef_binary_test");
        fs::create_dir_all(source.join("include")).unwrap();
        fs::write(source.join("include/cef_app.h"), b"").unwrap();

        let output = dir.path().join("out");
        let collector = BinaryCollector::new(&logger);
        let outcome = collector
            .collect(&source, &dir.path().join("build"), &output, "Release", false)
            .unwrap();

        assert_eq!(outcome.copied, 1);
        assert_eq!(outcome.missing, 3);
        assert!(output.join("include/cef_app.h").is_file());
    }

    #[test]
    fn test_missing_resources_still_succeeds() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();

        // Headers and binaries present, Resources absent.
        let source = dir.path().join("cef_binary_test");
        fs::create_dir_all(source.join("include")).unwrap();
        fs::write(source.join("include/cef_app.h"), b"").unwrap();
        fs::create_dir_all(source.join("Release")).unwrap();
        fs::write(source.join("Release/libcef.dll"), b"").unwrap();

        let output = dir.path().join("out");
        let collector = BinaryCollector::new(&logger);
        let outcome = collector
            .collect(&source, &dir.path().join("build"), &output, "Release", false)
            .unwrap();

        assert_eq!(outcome.copied, 2);
        assert_eq!(outcome.missing, 2);
        assert!(output.join("include/cef_app.h").is_file());
        assert!(output.join("libcef.dll").is_file());
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();

        let output = dir.path().join("out");
        let collector = BinaryCollector::new(&logger);
        collector
            .collect(&dir.path().join("src"), &dir.path().join("build"), &output, "Release", true)
            .unwrap();
        assert!(!output.exists());
    }
}
