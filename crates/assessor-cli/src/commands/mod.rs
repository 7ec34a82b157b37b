pub mod compare;
pub mod init;
pub mod levels;
pub mod module;
pub mod retake;
pub mod run;
pub mod show;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use assessor_core::config::{load_config_from, AssessorConfig};
use assessor_core::model::SectionType;
use assessor_core::store::{FileStore, KeyValueStore};

/// Load the config from `--config` or the default locations.
pub(crate) fn config(path: Option<PathBuf>) -> Result<AssessorConfig> {
    load_config_from(path.as_deref())
}

/// Pick the section named on the command line, or the configured default.
pub(crate) fn section(arg: Option<&str>, config: &AssessorConfig) -> Result<SectionType> {
    match arg {
        Some(name) => name
            .parse::<SectionType>()
            .context("cannot start session"),
        None => Ok(config.default_section),
    }
}

pub(crate) fn store(config: &AssessorConfig) -> Arc<dyn KeyValueStore> {
    tracing::debug!("using store {}", config.store_path.display());
    Arc::new(FileStore::new(&config.store_path))
}
