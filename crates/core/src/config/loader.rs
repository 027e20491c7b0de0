//! Config path resolution

use std::path::PathBuf;

/// Environment variable that overrides the config location
pub const CONFIG_ENV: &str = "REFLKIT_CONFIG";

/// File name used when no override is set
pub const DEFAULT_CONFIG_FILE: &str = "reflkit.toml";

/// Returns the config file path.
///
/// `$REFLKIT_CONFIG` when set and non-empty, otherwise `./reflkit.toml`.
pub fn config_path() -> PathBuf {
    resolve(std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn resolve(env_override: Option<PathBuf>) -> PathBuf {
    env_override
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
