// src/platform.rs
// Host platform detection and CEF-specific naming

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
    Unknown,
}

impl Platform {
    /// Detect current platform
    pub fn detect() -> Self {
        match env::consts::OS {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOS,
            "windows" => Platform::Windows,
            _ => Platform::Unknown,
        }
    }

    /// Platform component of CEF download artifact names.
    pub fn download_slug(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOS => "macosx",
            Platform::Linux | Platform::Unknown => "linux",
        }
    }

    /// Name of the CEF core library on this platform.
    pub fn core_library(&self) -> &'static str {
        match self {
            Platform::Windows => "libcef.dll",
            Platform::MacOS => "libcef.dylib",
            Platform::Linux | Platform::Unknown => "libcef.so",
        }
    }

    /// Marker files whose presence identifies a CEF installation.
    pub fn cef_markers(&self) -> &'static [&'static str] {
        match self {
            Platform::Windows => &["libcef.dll", "cef.pak", "chrome_elf.dll"],
            Platform::MacOS => &["Chromium Embedded Framework.framework", "libcef.dylib"],
            Platform::Linux | Platform::Unknown => &["libcef.so", "cef.pak"],
        }
    }

    /// Common installation locations searched during system-wide detection.
    pub fn common_install_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        match self {
            Platform::Windows => {
                paths.push(PathBuf::from("C:/Program Files"));
                paths.push(PathBuf::from("C:/Program Files (x86)"));
                if let Ok(local) = env::var("LOCALAPPDATA") {
                    paths.push(PathBuf::from(local));
                }
                if let Ok(roaming) = env::var("APPDATA") {
                    paths.push(PathBuf::from(roaming));
                }
            }
            Platform::MacOS => {
                paths.push(PathBuf::from("/Applications"));
                paths.push(PathBuf::from("/Library/Frameworks"));
                if let Some(home) = dirs::home_dir() {
                    paths.push(home.join("Applications"));
                    paths.push(home.join("Library/Frameworks"));
                }
            }
            Platform::Linux | Platform::Unknown => {
                paths.push(PathBuf::from("/opt"));
                paths.push(PathBuf::from("/usr/local"));
                paths.push(PathBuf::from("/usr/lib"));
                if let Some(home) = dirs::home_dir() {
                    paths.push(home.join(".local"));
                }
            }
        }
        paths.retain(|p| p.exists());
        paths
    }
}

/// Architecture component of CEF download artifact names ("64" or "arm64").
pub fn arch_slug() -> &'static str {
    match env::consts::ARCH {
        "aarch64" | "arm64" => "arm64",
        _ => "64",
    }
}

/// Architecture component of CMake artifact names.
pub fn cmake_arch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "x86_64",
        _ => "i386",
    }
}
