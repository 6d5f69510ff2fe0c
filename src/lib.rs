pub mod commands;
pub mod config;
pub mod core;
pub mod interactors;
pub mod logging;
pub mod metadata;
pub mod resources;
pub mod shell;

pub use crate::core::{Crypto, CryptoError, ScpTransport, TransportEngine, TransportError};
pub use metadata::{Host, Hosts, Job, TransportAction, TransportMetadata};
pub use resources::{Resource, ResourceKind};

pub mod dirs {
    use std::path::PathBuf;

    /// 用户配置目录
    pub fn config_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("VAULTFERRY_CONFIG_DIR") {
            return Some(PathBuf::from(dir));
        }

        let base = if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        };
        base.map(|p| p.join("vaultferry"))
    }
}
