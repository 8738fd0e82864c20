// src/download.rs
// CEF binary distribution fetch from the cef-builds CDN

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::logger::RunLogger;
use crate::platform::{arch_slug, Platform};

pub const CEF_DOWNLOAD_BASE: &str = "https://cef-builds.spotifycdn.com";
pub const CEF_INDEX_URL: &str = "https://cef-builds.spotifycdn.com/index.json";

pub struct CefDownloader<'a> {
    logger: &'a RunLogger,
    client: reqwest::blocking::Client,
    platform: Platform,
}

impl<'a> CefDownloader<'a> {
    pub fn new(logger: &'a RunLogger, platform: Platform) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        CefDownloader { logger, client, platform }
    }

    /// The URL used when the builds index has no exact match.
    /// Format: cef_binary_{version}_{platform}{arch}_minimal.tar.bz2
    pub fn constructed_url(&self, version: &str, platform_slug: &str, arch: &str) -> String {
        format!(
            "{}/cef_binary_{}_{}{}_minimal.tar.bz2",
            CEF_DOWNLOAD_BASE, version, platform_slug, arch
        )
    }

    /// Fill unspecified target slugs from the host platform.
    fn target_slugs<'s>(
        &self,
        platform_slug: Option<&'s str>,
        architecture: Option<&'s str>,
    ) -> (&'s str, &'s str) {
        (
            platform_slug.unwrap_or(self.platform.download_slug()),
            architecture.unwrap_or(arch_slug()),
        )
    }

    /// Resolve the download URL for a CEF version by searching the builds
    /// index, falling back to a constructed artifact URL.
    pub fn resolve_url(
        &self,
        version: &str,
        platform_slug: Option<&str>,
        architecture: Option<&str>,
    ) -> AgentResult<String> {
        let (platform_slug, architecture) = self.target_slugs(platform_slug, architecture);

        self.logger.info(&format!(
            "Searching for CEF {} for {} {}...",
            version, platform_slug, architecture
        ));

        let index: Value = self
            .client
            .get(CEF_INDEX_URL)
            .timeout(Duration::from_secs(30))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AgentError::UrlResolution(format!("error fetching CEF builds index: {}", e)))?
            .json()
            .map_err(|e| AgentError::UrlResolution(format!("invalid CEF builds index: {}", e)))?;

        for channel in ["stable", "beta", "dev"] {
            let Some(builds) = index.get(channel).and_then(Value::as_array) else {
                continue;
            };
            for build in builds {
                let cef_version = build.get("cef_version").and_then(Value::as_str).unwrap_or("");
                if !cef_version.contains(version) {
                    continue;
                }
                let Some(files) = build.get("files").and_then(Value::as_array) else {
                    continue;
                };
                for file_info in files {
                    let file_platform =
                        file_info.get("platform").and_then(Value::as_str).unwrap_or("");
                    let file_name = file_info.get("name").and_then(Value::as_str).unwrap_or("");
                    if file_platform.contains(platform_slug) && file_name.contains(architecture) {
                        if let Some(url) = file_info.get("url").and_then(Value::as_str) {
                            return Ok(url.to_string());
                        }
                    }
                }
            }
        }

        let url = self.constructed_url(version, platform_slug, architecture);
        self.logger
            .info(&format!("Exact match not found, trying: {}", url));
        Ok(url)
    }

    /// Download the CEF distribution for `version` into `download_dir`.
    ///
    /// Idempotent: a file of the resolved name already present in the cache
    /// directory short-circuits the fetch. Dry-run resolves no network at all
    /// and reports the constructed artifact path.
    pub fn download(&self, version: &str, download_dir: &Path, dry_run: bool) -> AgentResult<PathBuf> {
        self.logger.section("Downloading CEF");

        if dry_run {
            let url = self.constructed_url(version, self.platform.download_slug(), arch_slug());
            let filename = url.rsplit('/').next().unwrap_or("cef_binary.tar.bz2");
            let download_path = download_dir.join(filename);
            self.logger.info(&format!("[DRY RUN] Would resolve URL: {}", url));
            self.logger
                .info(&format!("[DRY RUN] Would download to: {}", download_path.display()));
            return Ok(download_path);
        }

        // Check the cache against the constructed artifact name first, so a
        // previous download short-circuits without touching the network.
        let fallback_url = self.constructed_url(version, self.platform.download_slug(), arch_slug());
        if let Some(name) = fallback_url.rsplit('/').next() {
            let cached = download_dir.join(name);
            if cached.exists() {
                self.logger
                    .info(&format!("✓ CEF already downloaded: {}", cached.display()));
                return Ok(cached);
            }
        }

        let url = self.resolve_url(version, None, None)?;
        self.logger.info(&format!("Download URL: {}", url));

        let filename = url
            .rsplit('/')
            .next()
            .ok_or_else(|| AgentError::UrlResolution(format!("no filename in URL: {}", url)))?;
        let download_path = download_dir.join(filename);

        if download_path.exists() {
            self.logger
                .info(&format!("✓ CEF already downloaded: {}", download_path.display()));
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
}

/// Stream a URL into a file with a progress bar.
pub fn fetch_to_file(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &Path,
) -> AgentResult<()> {
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| AgentError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let total = response.content_length().unwrap_or(0);
    let bar = if total > 0 {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{bytes}/{total_bytes} [{bar:40}] {percent}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::new_spinner()
    };

    let mut reader = bar.wrap_read(response);
    let mut file = File::create(dest)?;
    io::copy(&mut reader, &mut file).map_err(|e| AgentError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    bar.finish_and_clear();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_constructed_url_format() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let downloader = CefDownloader::new(&logger, Platform::Windows);

        let url = downloader.constructed_url("120.1.10", "windows", "64");
        assert_eq!(
            url,
            "https://cef-builds.spotifycdn.com/cef_binary_120.1.10_windows64_minimal.tar.bz2"
        );
    }

    #[test]
    fn test_target_slugs_default_to_host() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let downloader = CefDownloader::new(&logger, Platform::Linux);

        let (platform, arch) = downloader.target_slugs(None, None);
        assert_eq!(platform, "linux");
        assert_eq!(arch, arch_slug());

        let (platform, arch) = downloader.target_slugs(Some("windows"), Some("arm64"));
        assert_eq!(platform, "windows");
        assert_eq!(arch, "arm64");
    }

    #[test]
    fn test_dry_run_reports_path_without_network() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let downloader = CefDownloader::new(&logger, Platform::detect());

        let path = downloader
            .download("120.1.10", &dir.path().join("cache"), true)
            .unwrap();
        assert!(path.to_string_lossy().contains("cef_binary_120.1.10"));
        assert!(!path.exists());
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn test_cached_file_short_circuits_without_network() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "test").unwrap();
        let downloader = CefDownloader::new(&logger, Platform::detect());

        // Seed the cache with the constructed artifact name, then verify a
        // real (non-dry) download returns it without fetching anything.
        let cache = dir.path().join("cache");
        let expected = downloader.download("120.1.10", &cache, true).unwrap();
        fs::create_dir_all(&cache).unwrap();
        fs::write(&expected, b"cached").unwrap();

        let path = downloader.download("120.1.10", &cache, false).unwrap();
        assert_eq!(path, expected);
        assert_eq!(fs::read(&path).unwrap(), b"cached");
    }
}
