// src/main.rs
// cef-agent command line interface

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use cef_agent::config::DEFAULT_CONFIG_FILE;
use cef_agent::pipeline::{timestamped_run_dir, BuildOptions, RunOptions, UpgradeOptions};
use cef_agent::{AgentConfig, BuildAgent, UnifiedAgent, UpgradeAgent};

const LOG_BASE: &str = "cef_agent_logs";

#[derive(Parser)]
#[command(name = "cef-agent", version, about = "CEF download, build and deployment agent")]
struct Cli {
    /// Configuration file, created with defaults when missing
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, back up, install and verify a CEF version
    Upgrade {
        /// Target CEF version, overriding the configured one
        #[arg(long)]
        version: Option<String>,

        /// Application directory to scan for an existing CEF
        #[arg(long)]
        app_path: Option<PathBuf>,

        /// Log every step without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the OSV.dev vulnerability scan
        #[arg(long)]
        skip_vuln_check: bool,
    },

    /// Build the CEF wrapper library from a source tree
    Build {
        /// Extracted CEF binary distribution directory
        #[arg(long)]
        source: PathBuf,

        /// Log every step without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the full pipeline: upgrade, build, MFC integration
    Run {
        /// Log every step without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the download/install phase
        #[arg(long)]
        skip_download: bool,

        /// Skip the build phase
        #[arg(long)]
        skip_build: bool,

        /// Print the active configuration and exit
        #[arg(long)]
        show_config: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = AgentConfig::load(&cli.config);

    let code = match cli.command {
        Commands::Upgrade {
            version,
            app_path,
            dry_run,
            skip_vuln_check,
        } => {
            let mut options = UpgradeOptions::from_config(
                &config,
                timestamped_run_dir(&PathBuf::from(LOG_BASE)),
                dry_run,
            );
            if let Some(version) = version {
                options.target_version = version;
            }
            options.app_path = app_path;
            options.skip_vuln_check = skip_vuln_check;

            match UpgradeAgent::new(options) {
                Ok(agent) => agent.run(),
                Err(e) => {
                    eprintln!("✗ Failed to start upgrade agent: {}", e);
                    1
                }
            }
        }

        Commands::Build { source, dry_run } => {
            let options = BuildOptions {
                cef_source: source,
                log_dir: timestamped_run_dir(&PathBuf::from(LOG_BASE)),
                dry_run,
                skip_source_check: false,
            };
            match BuildAgent::new(config, options) {
                Ok(agent) => agent.run(),
                Err(e) => {
                    eprintln!("✗ Failed to start build agent: {}", e);
                    1
                }
            }
        }

        Commands::Run {
            dry_run,
            skip_download,
            skip_build,
            show_config,
        } => {
            if show_config {
                println!("{}", config.display());
                0
            } else {
                let options = RunOptions {
                    dry_run,
                    skip_download,
                    skip_build,
                };
                match UnifiedAgent::new(config, &PathBuf::from(LOG_BASE), options) {
                    Ok(agent) => agent.run(),
                    Err(e) => {
                        eprintln!("✗ Failed to start agent: {}", e);
                        1
                    }
                }
            }
        }
    };

    process::exit(code);
}
