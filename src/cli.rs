// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the upgrade and render subcommands and their arguments.

use clap::{Parser, Subcommand};
use portainer_upgrade::environment::LOCAL_DOCKER_URL;
use portainer_upgrade::types::EnvironmentType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "portainer-upgrade")]
#[command(about = "In-place agent upgrades for Docker standalone, Swarm and Kubernetes")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to upgrade.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upgrade the agent running on an environment
    Upgrade {
        /// docker-standalone, docker-swarm or kubernetes
        #[arg(short, long)]
        platform: String,

        /// Runtime endpoint of the environment
        #[arg(long, default_value = LOCAL_DOCKER_URL)]
        environment_url: String,

        /// Display name of the environment
        #[arg(long, default_value = "local")]
        environment_name: String,

        /// License key passed to the updater
        #[arg(short, long)]
        license: String,
    },

    /// Print the upgrade compose file without checking images or deploying
    Render {
        /// standalone or swarm
        #[arg(long, default_value = "standalone")]
        env_type: EnvironmentType,

        /// License key passed to the updater
        #[arg(short, long)]
        license: String,
    },
}
