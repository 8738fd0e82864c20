// tests/build_agent_test.rs
// Build agent behavior around source trees and dry runs

#[cfg(test)]
mod build_agent_tests {
    use cef_agent::pipeline::BuildOptions;
    use cef_agent::{AgentConfig, AgentError, BuildAgent};
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
    fn test_missing_source_fails_fast_even_in_dry_run() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let agent = BuildAgent::new(
            config,
            BuildOptions {
                cef_source: dir.path().join("missing_cef_source"),
                log_dir: dir.path().join("logs"),
                dry_run: true,
                skip_source_check: false,
            },
        )
        .unwrap();

        let err = agent.execute().unwrap_err();
        assert!(matches!(err, AgentError::PathNotFound(_)));
    }

    #[test]
    fn test_dry_run_with_existing_source_succeeds_offline() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let source = dir.path().join("cef_binary_140_linux64");
        fs::create_dir_all(&source).unwrap();

        let agent = BuildAgent::new(
            config,
            BuildOptions {
                cef_source: source,
                log_dir: dir.path().join("logs"),
                dry_run: true,
                skip_source_check: false,
            },
        )
        .unwrap();

        agent.execute().unwrap();
        // Nothing downloaded, configured or built.
        assert!(!dir.path().join("workflow").exists());
        assert!(!dir.path().join("out").exists());

        let log = fs::read_to_string(dir.path().join("logs/build-commands.log")).unwrap();
        assert!(log.contains("[DRY RUN]"));
        assert!(log.contains("Downloading CMake"));
        assert!(log.contains("Building with MSBuild"));
        assert!(log.contains("Collecting Binaries"));
    }

    #[test]
    fn test_exit_code_mapping() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let agent = BuildAgent::new(
            config,
            BuildOptions {
                cef_source: dir.path().join("missing"),
                log_dir: dir.path().join("logs"),
                dry_run: true,
                skip_source_check: false,
            },
        )
        .unwrap();
        assert_eq!(agent.run(), 1);
    }
}
