// src/lib.rs
// CEF agent: download, build and deployment automation for the
// Chromium Embedded Framework

pub mod backup;
pub mod build;
pub mod config;
pub mod detect;
pub mod download;
pub mod errors;
pub mod install;
pub mod logger;
pub mod mfc;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod verify;
pub mod vulnerability;

pub use config::AgentConfig;
pub use errors::{AgentError, AgentResult};
pub use logger::RunLogger;
pub use pipeline::{
    BuildAgent, BuildOptions, PhaseStatus, PipelineResults, RunOptions, UnifiedAgent,
    UpgradeAgent, UpgradeOptions,
};
pub use platform::Platform;
