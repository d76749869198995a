use alliance_content::{SiteConfig, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to write the config into
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Base URL of the content API
    #[arg(long)]
    pub api_url: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let dir = cwd.join(&args.dir);
    let config_path = dir.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Alliance site config...".bright_blue().bold());

    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        println!("  {} Created {}/", "✓".green(), args.dir);
    }

    let mut config = SiteConfig::default();
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Site initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Point apiBaseUrl at your content API");
    println!("  2. List pinned sections per page under pinnedSections");
    println!("  3. Run: alliance serve <site-dir>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(dir: &str, force: bool) -> InitArgs {
        InitArgs {
            dir: dir.to_string(),
            api_url: Some("https://cms.example.org/api".to_string()),
            force,
        }
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let temp = TempDir::new().unwrap();
        init(args("site", false), temp.path()).unwrap();

        let config = SiteConfig::load(temp.path().join("site")).unwrap();
        assert_eq!(config.api_base_url, "https://cms.example.org/api");
        assert_eq!(config.container_selector, "main");
    }

    #[test]
    fn test_init_keeps_existing_config_without_force() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_NAME);
        fs::write(&path, "{}").unwrap();

        init(args(".", false), temp.path()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");

        init(args(".", true), temp.path()).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("apiBaseUrl"));
    }
}
