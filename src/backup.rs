// src/backup.rs
// Timestamped tar.gz backup of existing CEF installations

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::errors::{AgentError, AgentResult};
use crate::logger::RunLogger;

pub struct BackupManager<'a> {
    logger: &'a RunLogger,
    backup_dir: PathBuf,
}

impl<'a> BackupManager<'a> {
    pub fn new(logger: &'a RunLogger, backup_dir: &Path) -> Self {
        BackupManager {
            logger,
            backup_dir: backup_dir.to_path_buf(),
        }
    }

    /// Bundle the given installation paths into one timestamped archive.
    ///
    /// Returns `Ok(None)` when there is nothing to back up. Archive members
    /// are stored by directory base name; two source paths sharing a base
    /// name would collide on restore, which is logged but not resolved.
    pub fn create_backup(&self, cef_paths: &[PathBuf], dry_run: bool) -> AgentResult<Option<PathBuf>> {
        if cef_paths.is_empty() {
            self.logger.info("No CEF paths to backup");
            return Ok(None);
        }

        self.logger.section("Creating Backup");

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let backup_path = self.backup_dir.join(format!("cef_backup_{}.tar.gz", timestamp));

        if dry_run {
            self.logger
                .info(&format!("[DRY RUN] Would create backup: {}", backup_path.display()));
            let paths: Vec<String> = cef_paths.iter().map(|p| p.display().to_string()).collect();
            self.logger
                .info(&format!("[DRY RUN] Would backup paths: {}", paths.join(", ")));
            return Ok(Some(backup_path));
        }

        fs::create_dir_all(&self.backup_dir)?;

        let mut seen_names: HashSet<String> = HashSet::new();
        let file = File::create(&backup_path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut tar = tar::Builder::new(encoder);

        for path in cef_paths {
            if !path.exists() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| AgentError::BackupFailed(format!("unnamed path: {}", path.display())))?;
            if !seen_names.insert(name.clone()) {
                self.logger.warn(&format!(
                    "⚠ Backup member name collision: '{}' appears more than once; restore will overwrite",
                    name
                ));
            }
            self.logger.info(&format!("Backing up: {}", path.display()));
            if path.is_dir() {
                tar.append_dir_all(&name, path)
                    .map_err(|e| AgentError::BackupFailed(e.to_string()))?;
            } else {
                tar.append_path_with_name(path, &name)
                    .map_err(|e| AgentError::BackupFailed(e.to_string()))?;
            }
        }

        let encoder = tar
            .into_inner()
            .map_err(|e| AgentError::BackupFailed(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| AgentError::BackupFailed(e.to_string()))?;

        let size_mb = fs::metadata(&backup_path)?.len() as f64 / (1024.0 * 1024.0);
        self.logger
            .info(&format!("\n✓ Backup created: {}", backup_path.display()));
        self.logger.info(&format!("  Size: {:.2} MB", size_mb));

        Ok(Some(backup_path))
    }
}
