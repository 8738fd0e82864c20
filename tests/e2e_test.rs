// tests/e2e_test.rs
// End-to-end pipeline tests, all offline via dry run

#[cfg(test)]
mod e2e_tests {
    use cef_agent::pipeline::{PhaseStatus, RunOptions, UpgradeAgent, UpgradeOptions};
    use cef_agent::{AgentConfig, UnifiedAgent};
    use std::fs;
    use tempfile::tempdir;

    fn test_config(root: &std::path::Path) -> AgentConfig {
        AgentConfig {
            temp_directory: root.join("workflow"),
            output_directory: root.join("out"),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_unified_dry_run_succeeds_offline() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let agent = UnifiedAgent::new(
            config,
            &dir.path().join("logs"),
            RunOptions {
                dry_run: true,
                skip_download: false,
                skip_build: false,
            },
        )
        .unwrap();

        let results = agent.execute().unwrap();
        assert_eq!(results.overall(), PhaseStatus::Success);
        assert_eq!(results.phases.len(), 3);
        assert_eq!(results.phases[0].status, PhaseStatus::Success);
        assert_eq!(results.phases[1].status, PhaseStatus::Success);
        // MFC integration is disabled by default.
        assert_eq!(results.phases[2].status, PhaseStatus::Skipped);

        // A dry run writes logs and reports only.
        assert!(!dir.path().join("workflow").exists());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_unified_skip_flags() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let agent = UnifiedAgent::new(
            config,
            &dir.path().join("logs"),
            RunOptions {
                dry_run: true,
                skip_download: true,
                skip_build: true,
            },
        )
        .unwrap();

        let results = agent.execute().unwrap();
        assert_eq!(results.phases[0].status, PhaseStatus::Skipped);
        assert_eq!(results.phases[1].status, PhaseStatus::Skipped);
        assert_eq!(results.overall(), PhaseStatus::Success);
    }

    #[test]
    fn test_upgrade_dry_run_writes_report() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();

        let options = UpgradeOptions {
            target_version: "140.1.13".to_string(),
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
        let report = fs::read_to_string(&run.report_path).unwrap();
        assert!(report.contains("# CEF Upgrade Report"));
        assert!(report.contains("140.1.13"));
        assert!(report.contains("DRY RUN"));

        // Both log sinks are present next to the report.
        assert!(dir.path().join("logs/upgrade-commands.log").exists());
        assert!(dir.path().join("logs/upgrade-run.jsonl").exists());
    }

    #[test]
    fn test_upgrade_detects_existing_install() {
        let dir = tempdir().unwrap();

        let app = dir.path().join("app/cef");
        fs::create_dir_all(&app).unwrap();
        let marker = cef_agent::Platform::detect().cef_markers()[0];
        fs::write(app.join(marker), b"").unwrap();
        fs::write(app.join("version.txt"), "CEF Version: 119.0.1\n").unwrap();

        let options = UpgradeOptions {
            target_version: "140.1.13".to_string(),
            app_path: Some(dir.path().join("app")),
            download_dir: dir.path().join("downloads"),
            install_dir: dir.path().join("install"),
            backup_dir: dir.path().join("backups"),
            log_dir: dir.path().join("logs"),
            dry_run: true,
            skip_vuln_check: true,
        };
        let agent = UpgradeAgent::new(options).unwrap();
        let run = agent.execute().unwrap();

        assert!(run.report.detection.found);
        assert_eq!(run.report.detection.version.as_deref(), Some("119.0.1"));
        // The dry-run backup path is reported but never created.
        let backup = run.report.backup_path.unwrap();
        assert!(!backup.exists());
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("cef_backup_"));
    }
}
