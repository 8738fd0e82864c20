// src/build/mod.rs
// Native build stages: CMake configure, project patch, MSBuild, collection

pub mod cmake;
pub mod collect;
pub mod msbuild;
pub mod vcxproj;

pub use cmake::{CmakeConfigurator, CmakeManager};
pub use collect::BinaryCollector;
pub use msbuild::MsBuilder;
pub use vcxproj::patch_runtime_library;
