// ABOUTME: Entry point for the portainer-upgrade CLI application.
// ABOUTME: Loads configuration, wires real collaborators and runs the upgrade service.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use portainer_upgrade::config::UpgradeConfig;
use portainer_upgrade::environment::Environment;
use portainer_upgrade::error::{Error, Result};
use portainer_upgrade::runtime::BollardClientFactory;
use portainer_upgrade::storage::FsFileStore;
use portainer_upgrade::types::{ContainerPlatform, EnvironmentType};
use portainer_upgrade::upgrade::{
    ArtifactGenerator, ComposeDeployer, UpgradeParameters, UpgradeService, resolve_images,
};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?.with_env_overrides();

    match cli.command {
        Commands::Upgrade {
            platform,
            environment_url,
            environment_name,
            license,
        } => {
            // Unknown platform names are rejected by the service itself.
            let kind = platform
                .parse::<ContainerPlatform>()
                .unwrap_or(ContainerPlatform::DockerStandalone);
            let environment = Environment::new(1, environment_name, environment_url, kind);
            upgrade(config, &platform, &environment, &license).await
        }
        Commands::Render { env_type, license } => render(config, env_type, &license).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<UpgradeConfig> {
    if let Some(path) = path {
        return UpgradeConfig::load(path);
    }
    let cwd = env::current_dir()?;
    match UpgradeConfig::discover(&cwd) {
        Ok(config) => Ok(config),
        Err(Error::ConfigNotFound(_)) => Ok(UpgradeConfig::default()),
        Err(e) => Err(e),
    }
}

async fn upgrade(
    config: UpgradeConfig,
    platform: &str,
    environment: &Environment,
    license: &str,
) -> Result<()> {
    let store = Arc::new(FsFileStore::new(config.data_path.clone()));
    let service = UpgradeService::new(
        config,
        Arc::new(BollardClientFactory),
        store,
        Arc::new(ComposeDeployer::new()),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling upgrade");
            on_signal.cancel();
        }
    });

    println!(
        "Upgrading {} ({}) to {}",
        environment.name,
        platform,
        service.config().version
    );
    service
        .upgrade_by_name(platform, environment, license, &cancel)
        .await?;
    println!("Upgrade stack deployed, the updater will replace the running agent");
    Ok(())
}

async fn render(config: UpgradeConfig, env_type: EnvironmentType, license: &str) -> Result<()> {
    let images = resolve_images(&config.overrides, &config.version)?;
    let parameters = UpgradeParameters {
        image: images.agent,
        skip_pull_image: images.skip_pull,
        updater_image: images.updater,
        license: license.to_string(),
        env_type,
        version: config.version.clone(),
    };

    let store = Arc::new(FsFileStore::new(config.data_path.clone()));
    let generator = ArtifactGenerator::new(config.assets_path.clone(), store);
    let compose = generator.render(&parameters).await?;
    print!("{compose}");
    Ok(())
}
