use super::Interactor;
use crate::metadata::{Host, Job};
use crate::resources::Resource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// 本地主机交互器
pub struct LocalInteractor {
    host: Host,
    job: Job,
    base_path: PathBuf,
}

impl LocalInteractor {
    pub fn new(host: &Host, job: &Job) -> Self {
        let base_path = host
            .working_directory
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            host: host.clone(),
            job: job.clone(),
            base_path,
        }
    }

    fn resolve_path(&self, resource: &Resource) -> PathBuf {
        let path = Path::new(resource.path_or_name());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    async fn copy_path(from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }

        if !fs::metadata(from).await?.is_dir() {
            fs::copy(from, to)
                .await
                .with_context(|| format!("Unable to copy {} to {}", from.display(), to.display()))?;
            return Ok(());
        }

        // 目录：使用 spawn_blocking 避免阻塞 async runtime
        let (from, to) = (from.to_path_buf(), to.to_path_buf());
        tokio::task::spawn_blocking(move || -> Result<()> {
            for entry in WalkDir::new(&from).follow_links(false) {
                let entry = entry?;
                let target = to.join(entry.path().strip_prefix(&from)?);
                if entry.file_type().is_dir() {
                    std::fs::create_dir_all(&target)?;
                } else {
                    std::fs::copy(entry.path(), &target)?;
                }
            }
            Ok(())
        })
        .await?
    }
}

#[async_trait]
impl Interactor for LocalInteractor {
    fn host(&self) -> &Host {
        &self.host
    }

    fn expand_path(&self, resource: &Resource) -> String {
        self.resolve_path(resource).to_string_lossy().into_owned()
    }

    async fn stat(&self, resource: &Resource) -> Result<u64> {
        let full_path = self.resolve_path(resource);
        let metadata = fs::metadata(&full_path)
            .await
            .with_context(|| format!("No such file or directory: {}", full_path.display()))?;

        if !metadata.is_dir() {
            return Ok(metadata.len());
        }

        let size = tokio::task::spawn_blocking(move || {
            WalkDir::new(&full_path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum::<u64>()
        })
        .await?;
        Ok(size)
    }

    async fn upload(&self, from: &Resource, to: &Resource, local: &dyn Interactor) -> Result<()> {
        let source = PathBuf::from(local.expand_path(from));
        tracing::debug!("[{}] copying {} locally", self.job.id, source.display());
        Self::copy_path(&source, &self.resolve_path(to)).await
    }

    async fn download(
        &self,
        from: &Resource,
        to: &Resource,
        local: &dyn Interactor,
    ) -> Result<()> {
        let target = PathBuf::from(local.expand_path(to));
        tracing::debug!("[{}] copying {} locally", self.job.id, target.display());
        Self::copy_path(&self.resolve_path(from), &target).await
    }

    async fn delete(&self, resource: &Resource) -> Result<()> {
        let full_path = self.resolve_path(resource);

        if !full_path.exists() {
            return Ok(());
        }

        if full_path.is_dir() {
            fs::remove_dir_all(&full_path).await?;
        } else {
            fs::remove_file(&full_path).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interactor(dir: &Path) -> LocalInteractor {
        let host = Host::localhost(Some(dir.to_string_lossy().into_owned()));
        LocalInteractor::new(&host, &Job::new("nightly"))
    }

    #[tokio::test]
    async fn test_stat_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dump.sql"), b"0123456789").unwrap();
        std::fs::create_dir_all(dir.path().join("dump/nested")).unwrap();
        std::fs::write(dir.path().join("dump/a.bson"), b"abc").unwrap();
        std::fs::write(dir.path().join("dump/nested/b.bson"), b"defg").unwrap();

        let local = interactor(dir.path());
        assert_eq!(local.stat(&Resource::file("dump.sql", true)).await.unwrap(), 10);

        let directory = Resource::new("dump", crate::resources::ResourceKind::Directory, true);
        assert_eq!(local.stat(&directory).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_stat_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let local = interactor(dir.path());
        assert!(local.stat(&Resource::file("missing", true)).await.is_err());
    }

    #[tokio::test]
    async fn test_upload_copies_between_directories() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source_dir.path().join("dump")).unwrap();
        std::fs::write(source_dir.path().join("dump/a.bson"), b"abc").unwrap();

        let local = interactor(source_dir.path());
        let vault = interactor(target_dir.path());
        let resource = Resource::new("dump", crate::resources::ResourceKind::Directory, true);
        vault
            .upload(&resource, &resource.clone().with_path("copies/dump"), &local)
            .await
            .unwrap();

        let copied = std::fs::read(target_dir.path().join("copies/dump/a.bson")).unwrap();
        assert_eq!(copied, b"abc");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dump.sql"), b"x").unwrap();

        let local = interactor(dir.path());
        let resource = Resource::file("dump.sql", true);
        local.delete(&resource).await.unwrap();
        local.delete(&resource).await.unwrap();

        assert!(!dir.path().join("dump.sql").exists());
    }
}
