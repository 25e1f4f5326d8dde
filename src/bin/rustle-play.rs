use anyhow::{Context, Result};
use clap::Parser;
use rustle_play::cli::{print_results, RustlePlayCli};
use rustle_play::modules::ModuleRegistry;
use rustle_play::runtime::{RunnerConfig, TaskRunner};
use std::path::Path;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RustlePlayCli::parse();

    let mut config = match &cli.config {
        Some(path) => RunnerConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunnerConfig::default(),
    };
    cli.apply_overrides(&mut config);

    // Logs go to stderr; stdout carries only the result report
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .with_writer(std::io::stderr)
        .init();

    info!("Starting rustle-play v{}", env!("CARGO_PKG_VERSION"));

    let playbook = match &cli.playbook {
        Some(path) if !cli.reads_stdin() => read_playbook_from_file(path).await?,
        _ => read_playbook_from_stdin().await?,
    };

    let registry = ModuleRegistry::with_shell_defaults(config.shell.clone());
    debug!("Registered modules: {:?}", registry.list_modules());
    let runner = TaskRunner::new(&registry);

    let results = match &cli.module {
        Some(module) => runner.run_module(module, &playbook).await?,
        None => runner.run_records(&playbook).await?,
    };

    print_results(&results, cli.format)?;
    Ok(())
}

async fn read_playbook_from_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read playbook {}", path.display()))
}

async fn read_playbook_from_stdin() -> Result<String> {
    use tokio::io::{self, AsyncReadExt};
    let mut stdin = io::stdin();
    let mut content = String::new();
    stdin.read_to_string(&mut content).await?;
    Ok(content)
}
