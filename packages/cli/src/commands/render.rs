use crate::config::load_config;
use alliance_content::{PageBootstrap, SiteConfig, StaticContentSource};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// HTML page to enhance
    pub input: PathBuf,

    /// Request path the page is served at (defaults to /<file name>)
    #[arg(long)]
    pub path: Option<String>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Read content from a JSON fixture instead of the content API
    #[arg(long)]
    pub fixtures: Option<PathBuf>,

    /// Directory containing alliance.config.json
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub async fn render(args: RenderArgs, cwd: &Path) -> Result<()> {
    let config = load_config(args.config.as_deref(), cwd)?;
    let input = cwd.join(&args.input);
    let html = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let path = args.path.clone().unwrap_or_else(|| default_request_path(&input));
    let bootstrap = bootstrap(config, args.fixtures.as_deref().map(|f| cwd.join(f)))?;
    let output = enhance_or_passthrough(&bootstrap, &html, &path).await;

    match &args.out {
        Some(out) => {
            let out = cwd.join(out);
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&out, output)?;
            eprintln!("  {} {} → {}", "✓".green(), args.input.display(), out.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}

fn bootstrap(config: SiteConfig, fixtures: Option<PathBuf>) -> Result<PageBootstrap> {
    match fixtures {
        Some(file) => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read fixtures {}", file.display()))?;
            let content = StaticContentSource::from_json(&source)
                .with_context(|| format!("Invalid fixtures {}", file.display()))?;
            Ok(PageBootstrap::new(config, Arc::new(content)))
        }
        None => Ok(PageBootstrap::from_config(config)?),
    }
}

/// A page that cannot be parsed is served as it is
pub async fn enhance_or_passthrough(bootstrap: &PageBootstrap, html: &str, path: &str) -> String {
    match bootstrap.enhance_html(html, path).await {
        Ok(output) => output,
        Err(e) => {
            warn!(%path, error = %e, "Page could not be parsed - serving it unmodified");
            html.to_string()
        }
    }
}

fn default_request_path(input: &Path) -> String {
    input
        .file_name()
        .map(|name| format!("/{}", name.to_string_lossy()))
        .unwrap_or_else(|| "/".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIXTURES: &str = r##"{
        "overrides": {
            "tutors": [{ "targetSelector": "h1", "contentType": "text", "text": "Meet our tutors" }]
        },
        "sectionOrders": { "tutors": ["b", "a"] }
    }"##;

    fn write_site(temp: &TempDir) {
        fs::write(
            temp.path().join("tutors.html"),
            r#"<main><section data-section-id="a"><h1>Tutors</h1></section><section data-section-id="b"></section></main>"#,
        )
        .unwrap();
        fs::write(temp.path().join("fixtures.json"), FIXTURES).unwrap();
    }

    #[test]
    fn test_default_request_path_uses_file_name() {
        assert_eq!(default_request_path(Path::new("site/tutors.html")), "/tutors.html");
    }

    #[tokio::test]
    async fn test_render_with_fixtures_to_file() {
        let temp = TempDir::new().unwrap();
        write_site(&temp);

        let args = RenderArgs {
            input: PathBuf::from("tutors.html"),
            path: None,
            out: Some(PathBuf::from("dist/tutors.html")),
            fixtures: Some(PathBuf::from("fixtures.json")),
            config: None,
        };
        render(args, temp.path()).await.unwrap();

        let output = fs::read_to_string(temp.path().join("dist/tutors.html")).unwrap();
        assert_eq!(
            output,
            r#"<main><section data-section-id="b"></section><section data-section-id="a"><h1 data-content-managed="true">Meet our tutors</h1></section></main>"#
        );
    }

    #[tokio::test]
    async fn test_unparseable_page_passes_through() {
        let bootstrap = PageBootstrap::new(SiteConfig::default(), Arc::new(StaticContentSource::new()));
        let truncated = "<main><section data-section-id=\"a\"";
        assert_eq!(enhance_or_passthrough(&bootstrap, truncated, "/").await, truncated);
    }
}
