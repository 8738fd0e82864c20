// src/pipeline.rs
// Phase orchestration: upgrade, build and the unified agent

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backup::BackupManager;
use crate::build::{
    patch_runtime_library, BinaryCollector, CmakeConfigurator, CmakeManager, MsBuilder,
};
use crate::config::AgentConfig;
use crate::detect::CefDetector;
use crate::download::CefDownloader;
use crate::errors::{AgentError, AgentResult};
use crate::install::ArchiveInstaller;
use crate::logger::RunLogger;
use crate::mfc::MfcIntegration;
use crate::platform::Platform;
use crate::report::{ReportGenerator, UpgradeReport};
use crate::verify::InstallVerifier;
use crate::vulnerability::VulnerabilityChecker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Success,
    Warning,
    Failed,
    Skipped,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseStatus::Success => write!(f, "SUCCESS"),
            PhaseStatus::Warning => write!(f, "WARNING"),
            PhaseStatus::Failed => write!(f, "FAILED"),
            PhaseStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub name: String,
    pub status: PhaseStatus,
    pub detail: Option<String>,
}

/// Accumulated per-phase outcomes of one agent run.
#[derive(Debug, Default)]
pub struct PipelineResults {
    pub phases: Vec<PhaseOutcome>,
}

impl PipelineResults {
    pub fn record(&mut self, name: &str, status: PhaseStatus, detail: Option<String>) {
        self.phases.push(PhaseOutcome {
            name: name.to_string(),
            status,
            detail,
        });
    }

    /// Worst status across all phases. Skipped phases do not count.
    pub fn overall(&self) -> PhaseStatus {
        if self.phases.iter().any(|p| p.status == PhaseStatus::Failed) {
            PhaseStatus::Failed
        } else if self.phases.iter().any(|p| p.status == PhaseStatus::Warning) {
            PhaseStatus::Warning
        } else {
            PhaseStatus::Success
        }
    }

    pub fn log_summary(&self, logger: &RunLogger) {
        logger.section("Pipeline Summary");
        for phase in &self.phases {
            let line = match &phase.detail {
                Some(detail) => format!("  {:20} {} ({})", phase.name, phase.status, detail),
                None => format!("  {:20} {}", phase.name, phase.status),
            };
            logger.info(&line);
        }
        logger.info(&format!("\nOverall: {}", self.overall()));
    }
}

/// One run directory per invocation, named by timestamp.
pub fn timestamped_run_dir(base: &Path) -> PathBuf {
    base.join(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
}

/// Pick the CEF source tree to build: the first `cef_binary_*` directory
/// under `dir`, or `dir` itself when it has no such child.
pub fn find_cef_source(dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_dir()
                && e.file_name().to_string_lossy().starts_with("cef_binary_")
        })
        .map(|e| e.path())
        .collect();
    candidates.sort();
    candidates.into_iter().next().or_else(|| Some(dir.to_path_buf()))
}

// ---------------------------------------------------------------------------
// Upgrade agent (phase 1)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    pub target_version: String,
    pub app_path: Option<PathBuf>,
    pub download_dir: PathBuf,
    pub install_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
    pub dry_run: bool,
    pub skip_vuln_check: bool,
}

impl UpgradeOptions {
    pub fn from_config(config: &AgentConfig, log_dir: PathBuf, dry_run: bool) -> Self {
        let temp = &config.temp_directory;
        UpgradeOptions {
            target_version: config.cef_version.clone(),
            app_path: None,
            download_dir: temp.join("downloads"),
            install_dir: temp.join("install"),
            backup_dir: temp.join("backups"),
            log_dir,
            dry_run,
            skip_vuln_check: false,
        }
    }
}

pub struct UpgradeRun {
    pub report: UpgradeReport,
    pub report_path: PathBuf,
    pub status: PhaseStatus,
}

/// Downloads, backs up, installs and verifies one CEF version.
pub struct UpgradeAgent {
    logger: RunLogger,
    platform: Platform,
    options: UpgradeOptions,
}

impl UpgradeAgent {
    pub fn new(options: UpgradeOptions) -> AgentResult<Self> {
        let logger = RunLogger::new(&options.log_dir, "upgrade")?;
        Ok(UpgradeAgent {
            logger,
            platform: Platform::detect(),
            options,
        })
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    pub fn install_dir(&self) -> &Path {
        &self.options.install_dir
    }

    /// Run the whole upgrade pipeline and write the report.
    pub fn execute(&self) -> AgentResult<UpgradeRun> {
        let opts = &self.options;
        self.logger.section(&format!(
            "CEF UPGRADE AGENT{}",
            if opts.dry_run { " (DRY RUN)" } else { "" }
        ));
        self.logger
            .info(&format!("Target version: {}", opts.target_version));

        let mut report = UpgradeReport {
            target_version: opts.target_version.clone(),
            dry_run: opts.dry_run,
            install_dir: opts.install_dir.clone(),
            ..UpgradeReport::default()
        };

        let detector = CefDetector::new(&self.logger, self.platform);
        report.detection = detector.detect(opts.app_path.as_deref());

        if opts.skip_vuln_check {
            self.logger.info("Skipping vulnerability check");
        } else {
            let checker = VulnerabilityChecker::new(&self.logger);
            report.vulnerabilities = checker.check_version(&opts.target_version);
            if report.vulnerabilities.has_critical {
                report.aborted_on_vulnerabilities = true;
                let generator = ReportGenerator::new(&self.logger);
                let report_path = generator.write(&report)?;
                return Ok(UpgradeRun {
                    report,
                    report_path,
                    status: PhaseStatus::Failed,
                });
            }
        }

        let backup = BackupManager::new(&self.logger, &opts.backup_dir);
        report.backup_path = backup.create_backup(&report.detection.paths, opts.dry_run)?;

        let downloader = CefDownloader::new(&self.logger, self.platform);
        let archive = downloader.download(&opts.target_version, &opts.download_dir, opts.dry_run)?;
        report.download_path = Some(archive.clone());

        let installer = ArchiveInstaller::new(&self.logger);
        let extract_dir = opts.download_dir.join("extracted");
        installer.extract(&archive, &extract_dir, opts.dry_run)?;
        installer.install(&extract_dir, &opts.install_dir, opts.dry_run)?;

        let verifier = InstallVerifier::new(&self.logger, self.platform);
        report.verification = verifier.verify(&opts.install_dir, opts.dry_run);
        report.success = report.verification.success;

        let generator = ReportGenerator::new(&self.logger);
        let report_path = generator.write(&report)?;

        let status = if report.success {
            PhaseStatus::Success
        } else {
            PhaseStatus::Warning
        };
        Ok(UpgradeRun {
            report,
            report_path,
            status,
        })
    }

    /// Top-level entry point: maps the outcome to a process exit code.
    pub fn run(&self) -> i32 {
        match self.execute() {
            Ok(run) => match run.status {
                PhaseStatus::Failed => 1,
                _ => 0,
            },
            Err(e) => {
                self.logger.error(&format!("✗ Upgrade failed: {}", e));
                1
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Build agent (phase 2)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub cef_source: PathBuf,
    pub log_dir: PathBuf,
    pub dry_run: bool,
    pub skip_source_check: bool,
}

/// Configures, builds and collects the CEF wrapper library.
pub struct BuildAgent {
    logger: RunLogger,
    platform: Platform,
    config: AgentConfig,
    options: BuildOptions,
}

impl BuildAgent {
    pub fn new(config: AgentConfig, options: BuildOptions) -> AgentResult<Self> {
        let logger = RunLogger::new(&options.log_dir, "build")?;
        Ok(BuildAgent {
            logger,
            platform: Platform::detect(),
            config,
            options,
        })
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    pub fn execute(&self) -> AgentResult<()> {
        let opts = &self.options;
        self.logger.section(&format!(
            "CEF BUILD AGENT{}",
            if opts.dry_run { " (DRY RUN)" } else { "" }
        ));
        self.logger
            .info(&format!("CEF Source: {}", opts.cef_source.display()));

        if !opts.skip_source_check && !opts.cef_source.is_dir() {
            return Err(AgentError::PathNotFound(opts.cef_source.clone()));
        }

        let work_dir = self.config.temp_directory.join("cmake");
        let cmake = CmakeManager::new(&self.logger, self.platform);
        let cmake_archive =
            cmake.download(&self.config.cmake_version, &work_dir, opts.dry_run)?;
        let cmake_exe = cmake.extract(&cmake_archive, &work_dir.join("extracted"), opts.dry_run)?;

        let build_dir = self.config.temp_directory.join("build");
        let configurator = CmakeConfigurator::new(&self.logger, &cmake_exe, self.platform);
        configurator.configure(
            &opts.cef_source,
            &build_dir,
            Some(&self.config.vs_generator),
            &self.config.architecture,
            opts.dry_run,
        )?;

        let vcxproj = build_dir
            .join("libcef_dll_wrapper")
            .join("libcef_dll_wrapper.vcxproj");
        match patch_runtime_library(
            &self.logger,
            &vcxproj,
            &self.config.runtime_library,
            opts.dry_run,
        ) {
            Ok(_) => {}
            Err(e) if e.is_warning_only() => {
                self.logger.warn(&format!("⚠ Continuing without project patch: {}", e));
            }
            Err(e) => return Err(e),
        }

        let builder = MsBuilder::new(&self.logger);
        builder.build(
            &build_dir.join("cef.sln"),
            &self.config.build_configuration,
            &self.config.architecture,
            Some("libcef_dll_wrapper"),
            opts.dry_run,
        )?;

        let collector = BinaryCollector::new(&self.logger);
        let outcome = collector.collect(
            &opts.cef_source,
            &build_dir,
            &self.config.output_directory,
            &self.config.build_configuration,
            opts.dry_run,
        )?;
        if outcome.missing > 0 {
            self.logger
                .warn(&format!("⚠ Build finished with {} missing pieces", outcome.missing));
        }

        Ok(())
    }

    pub fn run(&self) -> i32 {
        match self.execute() {
            Ok(()) => 0,
            Err(e) => {
                self.logger.error(&format!("✗ Build failed: {}", e));
                1
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unified agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dry_run: bool,
    pub skip_download: bool,
    pub skip_build: bool,
}

/// End-to-end orchestration of upgrade, build and MFC integration, all
/// in-process, sharing one configuration.
pub struct UnifiedAgent {
    logger: RunLogger,
    run_dir: PathBuf,
    config: AgentConfig,
    options: RunOptions,
}

impl UnifiedAgent {
    pub fn new(config: AgentConfig, log_base: &Path, options: RunOptions) -> AgentResult<Self> {
        let run_dir = timestamped_run_dir(log_base);
        let logger = RunLogger::new(&run_dir, "agent")?;
        Ok(UnifiedAgent {
            logger,
            run_dir,
            config,
            options,
        })
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    pub fn execute(&self) -> AgentResult<PipelineResults> {
        self.logger.section(&format!(
            "CEF AGENT{}",
            if self.options.dry_run { " (DRY RUN)" } else { "" }
        ));
        self.logger.info(&self.config.display());

        let mut results = PipelineResults::default();
        let mut install_dir = self.config.temp_directory.join("install");

        // Phase 1: download and install the target CEF version.
        if self.options.skip_download {
            self.logger.info("\nPhase 1 skipped (--skip-download)");
            results.record("upgrade", PhaseStatus::Skipped, None);
        } else {
            let mut upgrade_options = UpgradeOptions::from_config(
                &self.config,
                self.run_dir.join("phase1-logs"),
                self.options.dry_run,
            );
            // A dry run never touches the network.
            upgrade_options.skip_vuln_check = self.options.dry_run;

            let agent = UpgradeAgent::new(upgrade_options)?;
            install_dir = agent.install_dir().to_path_buf();
            match agent.execute() {
                Ok(run) => {
                    let detail = run
                        .report
                        .aborted_on_vulnerabilities
                        .then(|| "aborted on vulnerabilities".to_string());
                    results.record("upgrade", run.status, detail);
                    if run.status == PhaseStatus::Failed {
                        results.log_summary(&self.logger);
                        return Ok(results);
                    }
                }
                Err(e) => {
                    self.logger.error(&format!("✗ Upgrade phase failed: {}", e));
                    results.record("upgrade", PhaseStatus::Failed, Some(e.to_string()));
                    results.log_summary(&self.logger);
                    return Ok(results);
                }
            }
        }

        // Phase 2: build the wrapper library against the installed source.
        if self.options.skip_build {
            self.logger.info("\nPhase 2 skipped (--skip-build)");
            results.record("build", PhaseStatus::Skipped, None);
        } else {
            let source = if self.options.dry_run {
                install_dir.clone()
            } else {
                find_cef_source(&install_dir)
                    .ok_or_else(|| AgentError::PathNotFound(install_dir.clone()))?
            };
            let build_options = BuildOptions {
                cef_source: source,
                log_dir: self.run_dir.join("phase2-logs"),
                dry_run: self.options.dry_run,
                skip_source_check: self.options.dry_run,
            };
            let agent = BuildAgent::new(self.config.clone(), build_options)?;
            match agent.execute() {
                Ok(()) => results.record("build", PhaseStatus::Success, None),
                Err(e) => {
                    self.logger.error(&format!("✗ Build phase failed: {}", e));
                    results.record("build", PhaseStatus::Failed, Some(e.to_string()));
                    results.log_summary(&self.logger);
                    return Ok(results);
                }
            }
        }

        // Phase 3: optional MFC host integration. Failure here degrades the
        // run to a warning, the CEF output itself is already in place.
        match MfcIntegration::from_config(&self.logger, &self.config) {
            None => {
                if self.config.enable_mfc_integration {
                    self.logger
                        .warn("⚠ MFC integration enabled but not fully configured, skipping");
                }
                results.record("mfc", PhaseStatus::Skipped, None);
            }
            Some(integration) => {
                match integration.execute(&self.config.output_directory, self.options.dry_run) {
                    Ok(_) => results.record("mfc", PhaseStatus::Success, None),
                    Err(e) => {
                        self.logger.warn(&format!("⚠ MFC integration failed: {}", e));
                        results.record("mfc", PhaseStatus::Warning, Some(e.to_string()));
                    }
                }
            }
        }

        results.log_summary(&self.logger);
        Ok(results)
    }

    pub fn run(&self) -> i32 {
        match self.execute() {
            Ok(results) => match results.overall() {
                PhaseStatus::Failed => 1,
                _ => 0,
            },
            Err(e) => {
                self.logger.error(&format!("✗ Agent run failed: {}", e));
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_overall_status_precedence() {
        let mut results = PipelineResults::default();
        results.record("upgrade", PhaseStatus::Success, None);
        assert_eq!(results.overall(), PhaseStatus::Success);

        results.record("build", PhaseStatus::Warning, None);
        assert_eq!(results.overall(), PhaseStatus::Warning);

        results.record("mfc", PhaseStatus::Failed, None);
        assert_eq!(results.overall(), PhaseStatus::Failed);
    }

    #[test]
    fn test_skipped_phases_do_not_degrade() {
        let mut results = PipelineResults::default();
        results.record("upgrade", PhaseStatus::Skipped, None);
        results.record("build", PhaseStatus::Success, None);
        assert_eq!(results.overall(), PhaseStatus::Success);
    }

    #[test]
    fn test_find_cef_source_prefers_binary_dir() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cef_binary_120_linux64")).unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();

        let source = find_cef_source(dir.path()).unwrap();
        assert!(source.ends_with("cef_binary_120_linux64"));
    }

    #[test]
    fn test_find_cef_source_falls_back_to_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(find_cef_source(dir.path()), Some(dir.path().to_path_buf()));
        assert_eq!(find_cef_source(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_upgrade_dry_run_end_to_end() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();

        let options = UpgradeOptions {
            target_version: "120.1.10".to_string(),
            app_path: Some(app),
            download_dir: dir.path().join("downloads"),
            install_dir: dir.path().join("install"),
            backup_dir: dir.path().join("backups"),
            log_dir: dir.path().join("logs"),
            dry_run: true,
            skip_vuln_check: true,
        };
        let agent = UpgradeAgent::new(options).unwrap();
        let run = agent.execute().unwrap();

        assert_eq!(run.status, PhaseStatus::Success);
        assert!(run.report_path.exists());
        assert!(run.report.success);
        // Dry run must leave the filesystem untouched outside the log dir.
        assert!(!dir.path().join("downloads").exists());
        assert!(!dir.path().join("install").exists());
        assert!(!dir.path().join("backups").exists());
    }
}
