mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{init, render, serve, InitArgs, RenderArgs, ServeArgs};
use tracing_subscriber::EnvFilter;

/// Alliance CLI - content overrides and section ordering for static pages
#[derive(Parser, Debug)]
#[command(name = "alliance")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default alliance.config.json
    Init(InitArgs),

    /// Enhance one HTML page and print or write the result
    Render(RenderArgs),

    /// Serve a site directory, enhancing every HTML page per request
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() {
    // stdout is reserved for rendered pages
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Render(args) => render(args, &cwd).await,
        Command::Serve(args) => serve(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
