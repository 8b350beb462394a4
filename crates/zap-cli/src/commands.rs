use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use zap_server::{AppState, RepositoryConfig, ServerConfig, ZapServer};

use crate::cli::{Cli, Command, ConfigAction, ConfigArgs, ServeArgs, SweepArgs};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Sweep(args) => cmd_sweep(config, args).await,
        Command::Config(args) => cmd_config(config, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            ServerConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))
        }
        None => {
            tracing::debug!("no configuration file, using defaults");
            Ok(ServerConfig::default())
        }
    }
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        tracing::debug!(%bind, "bind address overridden on the command line");
        config.bind_addr = bind;
    }
    println!(
        "{} ZapLink on {} (repository: {}, content: {})",
        "⚡".yellow(),
        config.bind_addr.to_string().bold(),
        config.repository.backend_name().cyan(),
        config.content.backend_name().cyan(),
    );
    if config.repository == RepositoryConfig::Memory {
        println!("  {} zaps are kept in memory and lost on exit", "note:".yellow());
    }
    ZapServer::new(config).serve().await?;
    Ok(())
}

async fn cmd_sweep(config: ServerConfig, args: SweepArgs) -> anyhow::Result<()> {
    if config.repository == RepositoryConfig::Memory {
        tracing::warn!("sweep requested against the in-memory repository");
        println!(
            "{} in-memory repository: nothing persisted to sweep",
            "note:".yellow()
        );
        return Ok(());
    }

    let state = AppState::from_config(config).await?;
    loop {
        let report = state
            .controller
            .sweep_expired(chrono::Utc::now())
            .await
            .context("sweeping expired zaps")?;
        println!(
            "{} Swept {} expired zap(s), {} stored file(s) removed",
            "✓".green(),
            report.removed.to_string().bold(),
            report.content_removed,
        );

        let Some(every) = args.every else {
            return Ok(());
        };
        tracing::debug!(every_secs = every.max(1), "waiting for next sweep");
        tokio::time::sleep(Duration::from_secs(every.max(1))).await;
    }
}

fn cmd_config(config: ServerConfig, args: ConfigArgs) -> anyhow::Result<()> {
    let shown = match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => config,
        ConfigAction::Default => ServerConfig::default(),
    };
    print!("{}", shown.to_toml_string()?);
    Ok(())
}
