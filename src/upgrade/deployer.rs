// ABOUTME: Stack deployer seam and a docker compose implementation.
// ABOUTME: Launches the generated upgrade stack against the environment's endpoint.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::artifact::Stack;
use crate::environment::{Environment, Registry};
use crate::runtime::{ConnectionError, Endpoint};

/// How the deployer should bring the stack up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    /// Return once containers are started instead of attaching to them.
    pub detach: bool,
    /// Pull images before starting; `false` uses only cached images.
    pub pull_image: bool,
}

#[async_trait]
pub trait StackDeployer: Send + Sync {
    async fn deploy_compose_stack(
        &self,
        stack: &Stack,
        environment: &Environment,
        registries: &[Registry],
        options: DeployOptions,
    ) -> Result<(), DeployError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid environment endpoint: {0}")]
    Endpoint(#[from] ConnectionError),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compose exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Deploys stacks with `docker compose`, targeting the environment via `DOCKER_HOST`.
#[derive(Debug, Clone)]
pub struct ComposeDeployer {
    program: PathBuf,
}

impl Default for ComposeDeployer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("docker"),
        }
    }
}

impl ComposeDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different docker binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to the docker binary for `stack`.
    pub fn compose_args(stack: &Stack, options: DeployOptions) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "--project-name".to_string(),
            stack.name.clone(),
            "--project-directory".to_string(),
            stack.project_path.display().to_string(),
            "--file".to_string(),
            stack.file_path().display().to_string(),
            "up".to_string(),
        ];
        if options.detach {
            args.push("--detach".to_string());
        }
        args.push("--pull".to_string());
        args.push(if options.pull_image { "always" } else { "never" }.to_string());
        args
    }
}

#[async_trait]
impl StackDeployer for ComposeDeployer {
    async fn deploy_compose_stack(
        &self,
        stack: &Stack,
        environment: &Environment,
        registries: &[Registry],
        options: DeployOptions,
    ) -> Result<(), DeployError> {
        let endpoint = Endpoint::parse(&environment.url)?;
        if !registries.is_empty() {
            tracing::warn!(
                count = registries.len(),
                "Registry credentials are not forwarded to docker compose"
            );
        }

        let args = Self::compose_args(stack, options);
        tracing::info!(
            stack = %stack.name,
            environment = %environment.name,
            pull = options.pull_image,
            "Deploying compose stack"
        );

        let output = Command::new(&self.program)
            .args(&args)
            .env("DOCKER_HOST", endpoint.docker_host())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| DeployError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(DeployError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!(
            stack = %stack.name,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "Compose stack started"
        );
        Ok(())
    }
}
