use alliance_content::SiteConfig;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Config directory from `--config`, relative to the working directory
pub fn config_dir(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    match explicit {
        Some(dir) => cwd.join(dir),
        None => cwd.to_path_buf(),
    }
}

/// Load `alliance.config.json` (defaults when absent), then apply the environment
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<SiteConfig> {
    let dir = config_dir(explicit, cwd);
    let config = SiteConfig::load(&dir)
        .with_context(|| format!("Failed to load config from {}", dir.display()))?;
    Ok(config.with_env_overrides())
}
