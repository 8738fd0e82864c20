// src/build/msbuild.rs
// MSBuild discovery and solution builds

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::build::cmake::vswhere_path;
use crate::errors::{AgentError, AgentResult};
use crate::logger::RunLogger;

/// Well-known MSBuild locations probed when vswhere comes up empty.
const MSBUILD_FALLBACK_PATHS: [&str; 4] = [
    "C:\\Program Files\\Microsoft Visual Studio\\2022\\Community\\MSBuild\\Current\\Bin\\MSBuild.exe",
    "C:\\Program Files\\Microsoft Visual Studio\\2022\\Professional\\MSBuild\\Current\\Bin\\MSBuild.exe",
    "C:\\Program Files\\Microsoft Visual Studio\\2022\\Enterprise\\MSBuild\\Current\\Bin\\MSBuild.exe",
    "C:\\Program Files (x86)\\Microsoft Visual Studio\\2019\\Community\\MSBuild\\Current\\Bin\\MSBuild.exe",
];

pub struct MsBuilder<'a> {
    logger: &'a RunLogger,
}

impl<'a> MsBuilder<'a> {
    pub fn new(logger: &'a RunLogger) -> Self {
        MsBuilder { logger }
    }

    /// Locate MSBuild.exe, preferring the vswhere answer for the newest
    /// installed Visual Studio and falling back to well-known paths.
    pub fn find_msbuild(&self) -> AgentResult<PathBuf> {
        if let Some(vswhere) = vswhere_path() {
            let output = Command::new(&vswhere)
                .args([
                    "-latest",
                    "-requires",
                    "Microsoft.Component.MSBuild",
                    "-find",
                    "MSBuild\\**\\Bin\\MSBuild.exe",
                ])
                .output();
            if let Ok(result) = output {
                if result.status.success() {
                    let stdout = String::from_utf8_lossy(&result.stdout);
                    if let Some(line) = stdout.lines().next() {
                        let candidate = PathBuf::from(line.trim());
                        if candidate.is_file() {
                            self.logger
                                .info(&format!("Found MSBuild: {}", candidate.display()));
                            return Ok(candidate);
                        }
                    }
                }
            }
        }

        for fallback in MSBUILD_FALLBACK_PATHS {
            let candidate = PathBuf::from(fallback);
            if candidate.is_file() {
                self.logger
                    .info(&format!("Found MSBuild: {}", candidate.display()));
                return Ok(candidate);
            }
        }

        Err(AgentError::ToolchainNotFound {
            tool: "MSBuild".to_string(),
            hint: "install Visual Studio with the MSBuild component".to_string(),
        })
    }

    /// Build one target of a generated solution. `target` narrows the build
    /// to a single project; `None` builds the whole solution.
    pub fn build(
        &self,
        solution: &Path,
        configuration: &str,
        platform_arch: &str,
        target: Option<&str>,
        dry_run: bool,
    ) -> AgentResult<()> {
        self.logger.section("Building with MSBuild");
        self.logger.info(&format!("Solution: {}", solution.display()));
        self.logger.info(&format!("Configuration: {}", configuration));
        self.logger.info(&format!("Platform: {}", platform_arch));
        if let Some(target) = target {
            self.logger.info(&format!("Target: {}", target));
        }

        if dry_run {
            self.logger.info("[DRY RUN] Would build with MSBuild");
            return Ok(());
        }

        if !solution.is_file() {
            return Err(AgentError::PathNotFound(solution.to_path_buf()));
        }

        let msbuild = self.find_msbuild()?;

        let mut cmd = Command::new(&msbuild);
        cmd.arg(solution)
            .arg(format!("/p:Configuration={}", configuration))
            .arg(format!("/p:Platform={}", platform_arch))
            .arg("/m")
            .arg("/v:minimal");
        if let Some(target) = target {
            cmd.arg(format!("/t:{}", target));
        }

        let rendered = format!(
            "{} {} /p:Configuration={} /p:Platform={}",
            msbuild.display(),
            solution.display(),
            configuration,
            platform_arch
        );
        self.logger.info(&format!("Running: {}", rendered));

        let output = cmd.output().map_err(|e| AgentError::CommandFailed {
            cmd: rendered.clone(),
            reason: e.to_string(),
        })?;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let code = output.status.code().unwrap_or(-1);
        self.logger.log_command(&rendered, &combined, code);

        if output.status.success() {
            self.logger.info("✓ Build completed successfully");
            Ok(())
        } else {
            self.logger
                .error(&format!("✗ Build failed with code {}", code));
            Err(AgentError::CommandExited { cmd: rendered, code })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dry_run_skips_toolchain_lookup() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let builder = MsBuilder::new(&logger);

        // Solution does not exist and no MSBuild is installed here; dry run
        // must succeed anyway.
        builder
            .build(&dir.path().join("cef.sln"), "Release", "x64", Some("libcef_dll_wrapper"), true)
            .unwrap();
    }

    #[test]
    fn test_missing_solution_is_reported() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let builder = MsBuilder::new(&logger);

        let err = builder
            .build(&dir.path().join("cef.sln"), "Release", "x64", None, false)
            .unwrap_err();
        assert!(matches!(err, AgentError::PathNotFound(_)));
    }
}
