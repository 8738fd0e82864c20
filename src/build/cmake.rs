// src/build/cmake.rs
// CMake acquisition and project configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use walkdir::WalkDir;

use crate::download::fetch_to_file;
use crate::errors::{AgentError, AgentResult};
use crate::install::extract_archive;
use crate::logger::RunLogger;
use crate::platform::{cmake_arch, Platform};

pub const CMAKE_DOWNLOAD_BASE: &str = "https://github.com/Kitware/CMake/releases/download";

/// Visual Studio generators probed in order of preference, newest first.
const VS_GENERATORS: [(&str, &str); 4] = [
    ("Visual Studio 17 2022", "17"),
    ("Visual Studio 16 2019", "16"),
    ("Visual Studio 15 2017", "15"),
    ("Visual Studio 14 2015", "14"),
];

pub const DEFAULT_VS_GENERATOR: &str = "Visual Studio 17 2022";

/// Downloads and unpacks a CMake binary distribution.
pub struct CmakeManager<'a> {
    logger: &'a RunLogger,
    client: reqwest::blocking::Client,
    platform: Platform,
}

impl<'a> CmakeManager<'a> {
    pub fn new(logger: &'a RunLogger, platform: Platform) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        CmakeManager { logger, client, platform }
    }

    /// Per-platform CMake artifact URL on the Kitware releases host.
    pub fn download_url(&self, version: &str) -> String {
        match self.platform {
            Platform::Windows => format!(
                "{}/v{}/cmake-{}-windows-{}.zip",
                CMAKE_DOWNLOAD_BASE, version, version, cmake_arch()
            ),
            Platform::MacOS => format!(
                "{}/v{}/cmake-{}-macos-universal.tar.gz",
                CMAKE_DOWNLOAD_BASE, version, version
            ),
            Platform::Linux | Platform::Unknown => format!(
                "{}/v{}/cmake-{}-linux-{}.tar.gz",
                CMAKE_DOWNLOAD_BASE, version, version, cmake_arch()
            ),
        }
    }

    /// Download the CMake archive into `download_dir`, skipping when cached.
    pub fn download(&self, version: &str, download_dir: &Path, dry_run: bool) -> AgentResult<PathBuf> {
        self.logger.section("Downloading CMake");

        let url = self.download_url(version);
        self.logger.info(&format!("Download URL: {}", url));

        let filename = url
            .rsplit('/')
            .next()
            .ok_or_else(|| AgentError::UrlResolution(format!("no filename in URL: {}", url)))?;
        let download_path = download_dir.join(filename);

        if dry_run {
            self.logger
                .info(&format!("[DRY RUN] Would download to: {}", download_path.display()));
            return Ok(download_path);
        }

        if download_path.exists() {
            self.logger
                .info(&format!("✓ CMake already downloaded: {}", download_path.display()));
            return Ok(download_path);
        }

        fs::create_dir_all(download_dir)?;
        self.logger
            .info(&format!("Downloading to: {}", download_path.display()));
        fetch_to_file(&self.client, &url, &download_path)?;

        let size_mb = fs::metadata(&download_path)?.len() as f64 / (1024.0 * 1024.0);
        self.logger
            .info(&format!("✓ Download complete: {}", download_path.display()));
        self.logger.info(&format!("  Size: {:.2} MB", size_mb));

        Ok(download_path)
    }

    /// Extract a CMake archive and locate the cmake executable inside it.
    pub fn extract(&self, archive: &Path, extract_dir: &Path, dry_run: bool) -> AgentResult<PathBuf> {
        self.logger.section("Extracting CMake");

        let exe_name = if self.platform == Platform::Windows {
            "cmake.exe"
        } else {
            "cmake"
        };

        if dry_run {
            self.logger.info(&format!(
                "[DRY RUN] Would extract {} to {}",
                archive.display(),
                extract_dir.display()
            ));
            return Ok(extract_dir.join("bin").join(exe_name));
        }

        extract_archive(archive, extract_dir)?;

        let cmake_exe = WalkDir::new(extract_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == exe_name)
            .map(|e| e.into_path())
            .ok_or_else(|| AgentError::ToolchainNotFound {
                tool: "cmake".to_string(),
                hint: format!("no {} inside {}", exe_name, extract_dir.display()),
            })?;

        self.logger
            .info(&format!("✓ CMake extracted: {}", cmake_exe.display()));
        Ok(cmake_exe)
    }
}

/// Runs the CMake configure/generate step against a CEF source tree.
pub struct CmakeConfigurator<'a> {
    logger: &'a RunLogger,
    cmake_path: PathBuf,
    platform: Platform,
}

impl<'a> CmakeConfigurator<'a> {
    pub fn new(logger: &'a RunLogger, cmake_path: &Path, platform: Platform) -> Self {
        CmakeConfigurator {
            logger,
            cmake_path: cmake_path.to_path_buf(),
            platform,
        }
    }

    /// Configure and generate the project. Generation happens automatically
    /// during configure with any modern CMake.
    pub fn configure(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        generator: Option<&str>,
        platform_arch: &str,
        dry_run: bool,
    ) -> AgentResult<()> {
        self.logger.section("CMake Configure");

        let generator = match generator {
            Some(g) => g.to_string(),
            None => {
                if self.platform == Platform::Windows {
                    self.detect_vs_generator()
                } else {
                    "Unix Makefiles".to_string()
                }
            }
        };

        self.logger
            .info(&format!("Source Directory: {}", source_dir.display()));
        self.logger
            .info(&format!("Build Directory: {}", build_dir.display()));
        self.logger.info(&format!("Generator: {}", generator));
        self.logger.info(&format!("Platform: {}", platform_arch));

        if dry_run {
            self.logger.info("[DRY RUN] Would run CMake configure");
            return Ok(());
        }

        fs::create_dir_all(build_dir)?;

        let mut cmd = Command::new(&self.cmake_path);
        cmd.arg("-S")
            .arg(source_dir)
            .arg("-B")
            .arg(build_dir)
            .arg("-G")
            .arg(&generator)
            .current_dir(build_dir);
        if self.platform == Platform::Windows && !platform_arch.is_empty() {
            cmd.arg("-A").arg(platform_arch);
        }

        let rendered = format!(
            "{} -S {} -B {} -G {}",
            self.cmake_path.display(),
            source_dir.display(),
            build_dir.display(),
            generator
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
            self.logger.info("✓ CMake configure successful");
            self.logger.info("✓ Generation completed during configure step");
            Ok(())
        } else {
            self.logger
                .error(&format!("✗ CMake configure failed with code {}", code));
            Err(AgentError::CommandExited { cmd: rendered, code })
        }
    }

    /// Probe installed Visual Studio versions via vswhere, newest preferred.
    /// Falls back to a hardcoded generator when nothing answers.
    pub fn detect_vs_generator(&self) -> String {
        if let Some(vswhere) = vswhere_path() {
            for (generator, major) in VS_GENERATORS {
                let range = format!(
                    "[{}.0,{}.0)",
                    major,
                    major.parse::<u32>().unwrap_or(17) + 1
                );
                let output = Command::new(&vswhere)
                    .args(["-version", &range, "-property", "installationPath"])
                    .output();
                if let Ok(result) = output {
                    if result.status.success() && !String::from_utf8_lossy(&result.stdout).trim().is_empty() {
                        self.logger.info(&format!("Detected: {}", generator));
                        return generator.to_string();
                    }
                }
            }
        }

        self.logger
            .info(&format!("Using default: {}", DEFAULT_VS_GENERATOR));
        DEFAULT_VS_GENERATOR.to_string()
    }
}

/// Location of vswhere.exe under the Visual Studio installer directory.
pub fn vswhere_path() -> Option<PathBuf> {
    let program_files =
        std::env::var("ProgramFiles(x86)").unwrap_or_else(|_| "C:\\Program Files (x86)".to_string());
    let path = PathBuf::from(program_files)
        .join("Microsoft Visual Studio")
        .join("Installer")
        .join("vswhere.exe");
    path.exists().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_download_url_contains_version() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let manager = CmakeManager::new(&logger, Platform::Linux);

        let url = manager.download_url("3.30.1");
        assert!(url.contains("cmake"));
        assert!(url.contains("3.30.1"));
        assert!(url.ends_with(".tar.gz"));
    }

    #[test]
    fn test_windows_url_is_zip() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let manager = CmakeManager::new(&logger, Platform::Windows);
        assert!(manager.download_url("3.30.1").ends_with(".zip"));
    }

    #[test]
    fn test_configure_dry_run() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let configurator =
            CmakeConfigurator::new(&logger, Path::new("cmake"), Platform::detect());

        let build_dir = dir.path().join("build");
        configurator
            .configure(
                &dir.path().join("source"),
                &build_dir,
                Some("Visual Studio 17 2022"),
                "x64",
                true,
            )
            .unwrap();
        assert!(!build_dir.exists());
    }

    #[test]
    fn test_generator_detection_falls_back() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let configurator =
            CmakeConfigurator::new(&logger, Path::new("cmake"), Platform::detect());

        let generator = configurator.detect_vs_generator();
        assert!(generator.contains("Visual Studio"));
    }

    #[test]
    fn test_extract_dry_run_reports_exe_path() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let manager = CmakeManager::new(&logger, Platform::detect());

        let exe = manager
            .extract(&dir.path().join("cmake.tar.gz"), &dir.path().join("out"), true)
            .unwrap();
        assert!(exe.to_string_lossy().contains("cmake"));
        assert!(!dir.path().join("out").exists());
    }
}
