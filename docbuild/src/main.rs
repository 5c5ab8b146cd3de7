use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use folio::error::Result;
use folio::templating::minijinja::MiniJinjaEngine;

use crate::build::Docs;
use crate::config::Config;

mod build;
mod config;
mod stylesheet;

pub const CONFIG_FILE: &str = "docbuild.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let flags = xflags::parse_or_exit! {
        /// Log every file written.
        optional -v, --verbose
        /// Directory holding `docbuild.toml`. Defaults to the current directory.
        optional root: PathBuf
    };

    let level = if flags.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    let root = flags.root.unwrap_or_else(|| PathBuf::from("."));
    match run(root).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(root: PathBuf) -> Result<()> {
    let start = std::time::Instant::now();
    let docs = Docs::new::<MiniJinjaEngine>(Config::discover(root)?);
    let rendered = docs.build().await?;
    tracing::info!(
        pages = rendered.pages.len(),
        files = rendered.files.len(),
        output = %docs.config.output().display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "build complete"
    );

    Ok(())
}
