// src/mfc.rs
// Optional deployment of fresh CEF binaries into an MFC host application

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::build::MsBuilder;
use crate::config::AgentConfig;
use crate::errors::{AgentError, AgentResult};
use crate::install::copy_dir_all;
use crate::logger::RunLogger;

/// CEF runtime libraries the host executable loads next to itself.
const RUNTIME_BINARIES: [&str; 7] = [
    "libcef.dll",
    "chrome_elf.dll",
    "d3dcompiler_47.dll",
    "libEGL.dll",
    "libGLESv2.dll",
    "vk_swiftshader.dll",
    "vulkan-1.dll",
];

/// Resource files CEF reads at startup.
const RESOURCE_FILES: [&str; 6] = [
    "cef.pak",
    "cef_100_percent.pak",
    "cef_200_percent.pak",
    "cef_extensions.pak",
    "devtools_resources.pak",
    "icudtl.dat",
];

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MfcOutcome {
    pub deployed: u32,
    pub missing: u32,
}

/// Paths resolved from the MFC section of the configuration.
pub struct MfcIntegration<'a> {
    logger: &'a RunLogger,
    solution_path: PathBuf,
    binary_dir: PathBuf,
    cef_binary_dir: PathBuf,
    build_configuration: String,
    architecture: String,
}

impl<'a> MfcIntegration<'a> {
    /// Build the integration from configuration. Returns `None` when MFC
    /// integration is disabled or not fully configured.
    pub fn from_config(logger: &'a RunLogger, config: &AgentConfig) -> Option<Self> {
        if !config.enable_mfc_integration {
            return None;
        }
        let solution_path = config.mfc_solution_path.clone()?;
        let binary_dir = config.mfc_binary_dir.clone()?;
        let cef_binary_dir = config.mfc_cef_binary_dir.clone()?;
        Some(MfcIntegration {
            logger,
            solution_path,
            binary_dir,
            cef_binary_dir,
            build_configuration: config.build_configuration.clone(),
            architecture: config.architecture.clone(),
        })
    }

    fn validate_paths(&self) -> AgentResult<()> {
        if !self.solution_path.is_file() {
            return Err(AgentError::PathNotFound(self.solution_path.clone()));
        }
        Ok(())
    }

    /// Rebuild the host solution and deploy the collected CEF output into it.
    pub fn execute(&self, collected_dir: &Path, dry_run: bool) -> AgentResult<MfcOutcome> {
        self.logger.section("MFC Integration");
        self.logger
            .info(&format!("Solution: {}", self.solution_path.display()));
        self.logger
            .info(&format!("Binary Directory: {}", self.binary_dir.display()));
        self.logger.info(&format!(
            "CEF Binary Directory: {}",
            self.cef_binary_dir.display()
        ));

        if dry_run {
            self.logger.info("[DRY RUN] Would build solution and deploy CEF binaries");
            return Ok(MfcOutcome::default());
        }

        self.validate_paths()?;

        let builder = MsBuilder::new(self.logger);
        builder.build(
            &self.solution_path,
            &self.build_configuration,
            &self.architecture,
            None,
            false,
        )?;

        let outcome = self.deploy(collected_dir)?;
        self.write_test_instructions()?;
        Ok(outcome)
    }

    /// Copy the full collected output next to the host's CEF link inputs,
    /// then the runtime subset next to the host executable. Missing files
    /// are warnings: a minimal CEF distribution omits some of them.
    fn deploy(&self, collected_dir: &Path) -> AgentResult<MfcOutcome> {
        self.logger.section("Deploying CEF Binaries");

        let mut outcome = MfcOutcome::default();

        copy_dir_all(collected_dir, &self.cef_binary_dir)?;
        self.logger.info(&format!(
            "✓ Full CEF output deployed to: {}",
            self.cef_binary_dir.display()
        ));

        fs::create_dir_all(&self.binary_dir)?;
        for name in RUNTIME_BINARIES.iter().chain(RESOURCE_FILES.iter()) {
            let source = collected_dir.join(name);
            if source.is_file() {
                fs::copy(&source, self.binary_dir.join(name))?;
                outcome.deployed += 1;
            } else {
                self.logger.warn(&format!("⚠ Not found in CEF output: {}", name));
                outcome.missing += 1;
            }
        }

        let locales = collected_dir.join("locales");
        if locales.is_dir() {
            copy_dir_all(&locales, &self.binary_dir.join("locales"))?;
            self.logger.info("✓ Locales deployed");
            outcome.deployed += 1;
        } else {
            self.logger.warn("⚠ Locales directory not found in CEF output");
            outcome.missing += 1;
        }

        self.logger.info(&format!(
            "\nDeployment: {} deployed, {} missing",
            outcome.deployed, outcome.missing
        ));
        Ok(outcome)
    }

    /// Leave a test checklist next to the deployed binaries.
    fn write_test_instructions(&self) -> AgentResult<()> {
        let path = self.binary_dir.join("MFC_TEST_INSTRUCTIONS.md");
        let content = format!(
            "# MFC CEF Integration Test Instructions\n\n\
             CEF binaries were deployed on {}.\n\n\
             ## Verify the deployment\n\n\
             1. Launch the application from `{}`.\n\
             2. Open a view that embeds the browser and confirm a page renders.\n\
             3. Check the application log for CEF initialization errors.\n\
             4. Exercise navigation, reload and developer tools.\n\n\
             ## If the browser fails to initialize\n\n\
             - Confirm `libcef.dll` and `icudtl.dat` sit next to the executable.\n\
             - Confirm the `locales` directory is present and populated.\n\
             - Rebuild the solution so the new `libcef_dll_wrapper.lib` is linked.\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.binary_dir.display()
        );
        fs::write(&path, content)?;
        self.logger
            .info(&format!("✓ Test instructions written: {}", path.display()));
        Ok(())
    }
}
