// src/report.rs
// Human-readable upgrade report, written into the run's log directory

use std::fs;
use std::path::PathBuf;

use crate::detect::DetectionResult;
use crate::errors::AgentResult;
use crate::logger::RunLogger;
use crate::verify::VerifyOutcome;
use crate::vulnerability::VulnerabilityReport;

/// Everything the upgrade run produced, gathered for reporting.
#[derive(Debug, Default)]
pub struct UpgradeReport {
    pub target_version: String,
    pub dry_run: bool,
    pub success: bool,
    pub aborted_on_vulnerabilities: bool,
    pub detection: DetectionResult,
    pub vulnerabilities: VulnerabilityReport,
    pub backup_path: Option<PathBuf>,
    pub download_path: Option<PathBuf>,
    pub install_dir: PathBuf,
    pub verification: VerifyOutcome,
}

pub struct ReportGenerator<'a> {
    logger: &'a RunLogger,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(logger: &'a RunLogger) -> Self {
        ReportGenerator { logger }
    }

    /// Write `README.md` into the log directory and return its path.
    pub fn write(&self, report: &UpgradeReport) -> AgentResult<PathBuf> {
        let path = self.logger.log_dir().join("README.md");
        fs::write(&path, self.render(report))?;
        self.logger
            .info(&format!("✓ Upgrade report written: {}", path.display()));
        Ok(path)
    }

    fn render(&self, report: &UpgradeReport) -> String {
        let mut out = String::new();
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

        out.push_str("# CEF Upgrade Report\n\n");
        out.push_str(&format!("- **Date**: {}\n", now));
        out.push_str(&format!("- **Target Version**: {}\n", report.target_version));
        out.push_str(&format!(
            "- **Mode**: {}\n",
            if report.dry_run { "DRY RUN" } else { "LIVE" }
        ));
        out.push_str(&format!(
            "- **Status**: {}\n\n",
            if report.aborted_on_vulnerabilities {
                "ABORTED (security)"
            } else if report.success {
                "SUCCESS"
            } else {
                "FAILED"
            }
        ));

        out.push_str("## Current Installation\n\n");
        if report.detection.found {
            out.push_str(&format!(
                "- Version: {}\n",
                report.detection.version.as_deref().unwrap_or("unknown")
            ));
            if let Some(chromium) = &report.detection.chromium_version {
                out.push_str(&format!("- Chromium: {}\n", chromium));
            }
            if let Some(arch) = &report.detection.architecture {
                out.push_str(&format!("- Architecture: {}\n", arch));
            }
            for path in &report.detection.paths {
                out.push_str(&format!("- Path: {}\n", path.display()));
            }
        } else {
            out.push_str("No existing CEF installation was found.\n");
        }
        out.push('\n');

        out.push_str("## Security Check\n\n");
        if report.vulnerabilities.records.is_empty() {
            out.push_str("No known vulnerabilities were reported for the target version.\n");
        } else {
            out.push_str(&format!(
                "{} advisories were reported:\n\n",
                report.vulnerabilities.records.len()
            ));
            for record in &report.vulnerabilities.records {
                out.push_str(&format!(
                    "- **{}** [{}]: {}\n",
                    record.id, record.severity, record.summary
                ));
            }
            if report.vulnerabilities.has_critical {
                out.push_str("\nCritical or high severity advisories blocked the upgrade.\n");
            }
        }
        out.push('\n');

        out.push_str("## Backup\n\n");
        match &report.backup_path {
            Some(path) => out.push_str(&format!("Backup archive: `{}`\n\n", path.display())),
            None => out.push_str("No backup was created (nothing to back up).\n\n"),
        }

        out.push_str("## Download\n\n");
        match &report.download_path {
            Some(path) => out.push_str(&format!("Downloaded archive: `{}`\n\n", path.display())),
            None => out.push_str("No archive was downloaded.\n\n"),
        }

        out.push_str("## Installation\n\n");
        out.push_str(&format!(
            "Install directory: `{}`\n\n",
            report.install_dir.display()
        ));

        out.push_str("## Verification\n\n");
        out.push_str(&format!(
            "{}/{} checks passed.\n\n",
            report.verification.checks_passed, report.verification.checks_total
        ));

        out.push_str("## Rollback Instructions\n\n");
        match &report.backup_path {
            Some(path) => {
                out.push_str("To restore the previous installation:\n\n");
                out.push_str("```sh\n");
                out.push_str(&format!("tar -xzf \"{}\" -C <restore-directory>\n", path.display()));
                out.push_str("```\n\n");
                out.push_str("Then move the restored files back over the install directory.\n\n");
            }
            None => {
                out.push_str("No backup exists for this run; rollback is not available.\n\n");
            }
        }

        out.push_str("## Logs\n\n");
        out.push_str(&format!(
            "- Text log: `{}`\n",
            self.logger.text_log_path().display()
        ));
        out.push_str(&format!(
            "- JSONL log: `{}`\n\n",
            self.logger.jsonl_log_path().display()
        ));

        out.push_str("## Next Steps\n\n");
        if report.dry_run {
            out.push_str("This was a dry run. Re-run without `--dry-run` to apply the upgrade.\n");
        } else if report.aborted_on_vulnerabilities {
            out.push_str("Pick a patched CEF version and re-run the upgrade.\n");
        } else if report.success {
            out.push_str("Build the wrapper library against the new binaries, then rebuild\n");
            out.push_str("and test the embedding application.\n");
        } else {
            out.push_str("Inspect the logs above, fix the reported problem and re-run.\n");
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vulnerability::{Severity, VulnerabilityRecord};
    use tempfile::tempdir;

    #[test]
    fn test_report_written_to_log_dir() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let generator = ReportGenerator::new(&logger);

        let report = UpgradeReport {
            target_version: "140.1.13".to_string(),
            success: true,
            install_dir: PathBuf::from("/opt/cef"),
            ..UpgradeReport::default()
        };
        let path = generator.write(&report).unwrap();
        assert_eq!(path, dir.path().join("README.md"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# CEF Upgrade Report"));
        assert!(content.contains("140.1.13"));
        assert!(content.contains("SUCCESS"));
        assert!(content.contains("rollback is not available"));
    }

    #[test]
    fn test_abort_and_rollback_sections() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let generator = ReportGenerator::new(&logger);

        let report = UpgradeReport {
            target_version: "140.1.13".to_string(),
            aborted_on_vulnerabilities: true,
            backup_path: Some(PathBuf::from("/backups/cef_backup_20260830_120000.tar.gz")),
            vulnerabilities: VulnerabilityReport {
                records: vec![VulnerabilityRecord {
                    id: "OSV-2026-1".to_string(),
                    severity: Severity::Critical,
                    summary: "Heap overflow".to_string(),
                }],
                has_critical: true,
            },
            ..UpgradeReport::default()
        };
        let content = generator.render(&report);
        assert!(content.contains("ABORTED (security)"));
        assert!(content.contains("OSV-2026-1"));
        assert!(content.contains("tar -xzf"));
        assert!(content.contains("cef_backup_20260830_120000.tar.gz"));
    }

    #[test]
    fn test_dry_run_next_steps() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let generator = ReportGenerator::new(&logger);

        let report = UpgradeReport {
            dry_run: true,
            ..UpgradeReport::default()
        };
        let content = generator.render(&report);
        assert!(content.contains("DRY RUN"));
        assert!(content.contains("--dry-run"));
    }
}
