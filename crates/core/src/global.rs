//! Process-wide registry
//!
//! The library itself never reaches for this instance; every operation
//! takes an explicit `&Registry`. Applications that want a single shared
//! registry install one here at startup.

use std::sync::OnceLock;

use tracing::info;

use crate::registry::Registry;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install `registry` as the process-wide instance
///
/// Returns the registry back if one was already installed.
pub fn init(registry: Registry) -> Result<(), Registry> {
    GLOBAL.set(registry)?;
    info!("Installed process-wide registry");
    Ok(())
}

/// The process-wide registry, created with the built-in types on first use
pub fn registry() -> &'static Registry {
    GLOBAL.get_or_init(Registry::with_builtins)
}

/// The process-wide registry, if one exists
pub fn try_registry() -> Option<&'static Registry> {
    GLOBAL.get()
}
