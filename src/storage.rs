// ABOUTME: Durable storage for generated stack files.
// ABOUTME: FileStore trait and a filesystem implementation rooted at the data path.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Directory under the data path holding compose projects.
pub const COMPOSE_STORE_DIR: &str = "compose";

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `content` as `<category>/<file_name>` and return the project directory.
    async fn store_stack_file(
        &self,
        category: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf, StoreError>;

    /// Remove a previously stored stack file.
    async fn remove_stack_file(&self, project_path: &Path, file_name: &str)
    -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid path component: {0:?}")]
    InvalidName(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stores stack files on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            root: data_path.into().join(COMPOSE_STORE_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A name must be a single normal path component.
fn check_name(name: &str) -> Result<(), StoreError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StoreError::InvalidName(name.to_string())),
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    async fn store_stack_file(
        &self,
        category: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf, StoreError> {
        check_name(category)?;
        check_name(file_name)?;

        let project_path = self.root.join(category);
        tokio::fs::create_dir_all(&project_path)
            .await
            .map_err(|source| StoreError::Write {
                path: project_path.clone(),
                source,
            })?;

        let file_path = project_path.join(file_name);
        tokio::fs::write(&file_path, content)
            .await
            .map_err(|source| StoreError::Write {
                path: file_path.clone(),
                source,
            })?;

        tracing::debug!(path = %file_path.display(), "Stored stack file");
        Ok(project_path)
    }

    async fn remove_stack_file(
        &self,
        project_path: &Path,
        file_name: &str,
    ) -> Result<(), StoreError> {
        check_name(file_name)?;
        let file_path = project_path.join(file_name);
        tokio::fs::remove_file(&file_path)
            .await
            .map_err(|source| StoreError::Remove {
                path: file_path,
                source,
            })
    }
}
