use dirs::home_dir;
use std::path::PathBuf;

/// Returns the bg-remover home directory, or None if the user's home cannot be resolved.
pub fn try_bgr_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("BG_REMOVER_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".bg-remover"))
}

/// Returns the bg-remover home directory (`~/.bg-remover`).
///
/// Falls back to `.bg-remover` in the working directory when no home
/// directory can be resolved (e.g. minimal containers without `HOME`).
pub fn bgr_home() -> PathBuf {
    try_bgr_home().unwrap_or_else(|| PathBuf::from(".bg-remover"))
}

/// Default binary install target: ~/.bg-remover/bin/bg-remover
pub fn default_binary_path() -> PathBuf {
    bgr_home().join("bin").join("bg-remover")
}

/// Default config file: ~/.bg-remover/config.toml
pub fn default_config_path() -> PathBuf {
    bgr_home().join("config.toml")
}

