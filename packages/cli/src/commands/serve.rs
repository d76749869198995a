use super::render::enhance_or_passthrough;
use crate::config::load_config;
use alliance_content::PageBootstrap;
use anyhow::{anyhow, Context, Result};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use clap::Args;
use colored::Colorize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Directory holding the site's pages and assets
    #[arg(default_value = ".")]
    pub site_dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Directory containing alliance.config.json
    #[arg(long)]
    pub config: Option<PathBuf>,
}

struct ServeState {
    root: PathBuf,
    bootstrap: PageBootstrap,
}

pub async fn serve(args: ServeArgs, cwd: &Path) -> Result<()> {
    let config = load_config(args.config.as_deref(), cwd)?;
    let root = cwd.join(&args.site_dir);
    if !root.is_dir() {
        return Err(anyhow!("Site directory does not exist: {}", root.display()));
    }

    println!("{}", "🌐 Starting Alliance site server...".bright_blue().bold());
    println!("   Site:        {}", root.display());
    println!("   Content API: {}", config.api_base_url.cyan());

    let bootstrap = PageBootstrap::from_config(config)?;
    let app = router(root, bootstrap);

    let addr = format!("127.0.0.1:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    println!("   Listening:   {}", format!("http://{}", addr).green());

    axum::serve(listener, app).await?;
    Ok(())
}

fn router(root: PathBuf, bootstrap: PageBootstrap) -> Router {
    Router::new()
        .fallback(serve_request)
        .with_state(Arc::new(ServeState { root, bootstrap }))
}

async fn serve_request(State(state): State<Arc<ServeState>>, request: Request) -> Response {
    let request_path = request.uri().path().to_string();

    let Some(mut file) = resolve_request_path(&state.root, &request_path) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if tokio::fs::metadata(&file).await.is_ok_and(|meta| meta.is_dir()) {
        file.push("index.html");
    }

    if !is_html(&file) {
        return match ServeDir::new(&state.root).oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        };
    }

    let html = match tokio::fs::read_to_string(&file).await {
        Ok(html) => html,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            warn!(path = %request_path, error = %e, "Failed to read page");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    debug!(path = %request_path, file = %file.display(), "Enhancing page");
    Html(enhance_or_passthrough(&state.bootstrap, &html, &request_path).await).into_response()
}

/// Map a request path under `root`, refusing anything that climbs out of it
fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for segment in request_path.split('/').filter(|s| !s.is_empty()) {
        if segment.contains('\\') {
            return None;
        }
        match Path::new(segment).components().next() {
            Some(Component::Normal(part)) => resolved.push(part),
            _ => return None,
        }
    }
    Some(resolved)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}
