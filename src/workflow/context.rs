use crate::config::{self, EffectiveConfig};
use crate::paths::{ArtifactPaths, RepoPaths};
use crate::step_map::{self, Plan};
use anyhow::Result;
use std::path::Path;

/// Loaded inputs shared by every command.
pub(crate) struct MigrationContext {
    pub(crate) config: EffectiveConfig,
    pub(crate) repo: RepoPaths,
    pub(crate) artifacts: ArtifactPaths,
}

impl MigrationContext {
    /// Load the config file and resolve it against the process environment.
    pub(crate) fn load(config_path: &Path, root: &Path, out: &Path) -> Result<Self> {
        let raw = config::load_config(config_path)?;
        let config = EffectiveConfig::resolve(&raw, &config::process_env());
        Ok(Self {
            config,
            repo: RepoPaths::new(root.to_path_buf()),
            artifacts: ArtifactPaths::new(out.to_path_buf()),
        })
    }

    /// Expand the selected mode from the step map (default or `override_path`).
    pub(crate) fn plan(&self, cli_mode: Option<&str>, override_path: Option<&Path>) -> Result<Plan> {
        let path = override_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.repo.default_step_map_path());
        let map = step_map::load_step_map(&path)?;
        let mode = self.config.resolve_mode(cli_mode);
        Ok(map.expand(&mode)?)
    }
}
