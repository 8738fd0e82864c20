// src/install.rs
// Archive extraction, payload-root location and installation

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use walkdir::WalkDir;

use crate::errors::{AgentError, AgentResult};
use crate::logger::RunLogger;

/// Filenames that identify the real CEF payload root inside an extracted tree.
const PAYLOAD_MARKERS: [&str; 3] = ["libcef.dll", "libcef.so", "libcef.dylib"];

/// Extract an archive into `dest`, dispatching on the file extension.
/// Supports `.zip` and tar archives compressed with gzip or bzip2.
pub fn extract_archive(archive: &Path, dest: &Path) -> AgentResult<()> {
    fs::create_dir_all(dest)?;

    let extension = archive
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    let map_err = |e: std::io::Error| AgentError::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason: e.to_string(),
    };

    match extension.as_str() {
        "zip" => {
            let file = File::open(archive)?;
            let mut zip = zip::ZipArchive::new(file).map_err(|e| AgentError::ExtractionFailed {
                archive: archive.to_path_buf(),
                reason: e.to_string(),
            })?;
            zip.extract(dest).map_err(|e| AgentError::ExtractionFailed {
                archive: archive.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        "bz2" => {
            let file = File::open(archive)?;
            let mut tar = tar::Archive::new(BzDecoder::new(file));
            tar.unpack(dest).map_err(map_err)?;
        }
        "gz" => {
            let file = File::open(archive)?;
            let mut tar = tar::Archive::new(GzDecoder::new(file));
            tar.unpack(dest).map_err(map_err)?;
        }
        "tar" => {
            let file = File::open(archive)?;
            let mut tar = tar::Archive::new(file);
            tar.unpack(dest).map_err(map_err)?;
        }
        other => return Err(AgentError::UnsupportedArchive(other.to_string())),
    }

    Ok(())
}

/// Recursively copy a directory tree.
pub fn copy_dir_all(src: &Path, dst: &Path) -> AgentResult<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

pub struct ArchiveInstaller<'a> {
    logger: &'a RunLogger,
}

impl<'a> ArchiveInstaller<'a> {
    pub fn new(logger: &'a RunLogger) -> Self {
        ArchiveInstaller { logger }
    }

    /// Extract a downloaded CEF archive into `extract_dir`.
    pub fn extract(&self, archive: &Path, extract_dir: &Path, dry_run: bool) -> AgentResult<()> {
        self.logger.section("Extracting CEF Archive");

        if dry_run {
            self.logger.info(&format!(
                "[DRY RUN] Would extract {} to {}",
                archive.display(),
                extract_dir.display()
            ));
            return Ok(());
        }

        extract_archive(archive, extract_dir)?;
        self.logger
            .info(&format!("✓ Extracted to: {}", extract_dir.display()));
        Ok(())
    }

    /// Walk an extracted tree for the directory holding the CEF payload.
    ///
    /// Matches any directory directly containing a core library, or one whose
    /// `Release`/`Debug`/`Resources` subdirectory does. Returns `None` when no
    /// marker appears anywhere: a normal, reportable outcome.
    pub fn find_payload_root(&self, search_dir: &Path) -> Option<PathBuf> {
        for entry in WalkDir::new(search_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            let dir = entry.path();
            if PAYLOAD_MARKERS.iter().any(|m| dir.join(m).is_file()) {
                return Some(dir.to_path_buf());
            }
            for subdir in ["Release", "Debug", "Resources"] {
                let candidate = dir.join(subdir);
                if candidate.is_dir()
                    && PAYLOAD_MARKERS.iter().any(|m| candidate.join(m).is_file())
                {
                    return Some(dir.to_path_buf());
                }
            }
        }
        None
    }

    /// Install the extracted payload into `target_dir`, replacing any
    /// previous installation wholesale.
    pub fn install(&self, source_dir: &Path, target_dir: &Path, dry_run: bool) -> AgentResult<()> {
        self.logger.section("Installing CEF");

        if dry_run {
            self.logger.info(&format!(
                "[DRY RUN] Would install from {} to {}",
                source_dir.display(),
                target_dir.display()
            ));
            return Ok(());
        }

        let payload_root = self
            .find_payload_root(source_dir)
            .ok_or_else(|| AgentError::PayloadRootNotFound(source_dir.to_path_buf()))?;

        self.logger
            .info(&format!("Installing from: {}", payload_root.display()));
        self.logger
            .info(&format!("Installing to: {}", target_dir.display()));

        if target_dir.exists() {
            self.logger.info("Removing existing installation...");
            fs::remove_dir_all(target_dir)?;
        }
        copy_dir_all(&payload_root, target_dir)?;

        self.logger.info("✓ CEF installed successfully");
        Ok(())
    }
}
