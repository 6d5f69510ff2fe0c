//! 基于系统 ssh/scp 的远程交互器
//!
//! 会话通过 ssh 的 ControlMaster 复用同一条连接，`open` 建立主连接，
//! `close` 发送 `-O exit` 关闭。

use super::Interactor;
use crate::metadata::{Host, Job, SshOptions};
use crate::resources::Resource;
use crate::shell::shell_escape;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

pub struct SshInteractor {
    host: Host,
    job: Job,
    options: SshOptions,
    control_path: PathBuf,
}

impl SshInteractor {
    pub fn new(host: &Host, job: &Job, options: &SshOptions) -> Self {
        let control_path = std::env::temp_dir().join(format!(
            "vaultferry-{}.sock",
            uuid::Uuid::new_v4().simple()
        ));
        Self {
            host: host.clone(),
            job: job.clone(),
            options: options.clone(),
            control_path,
        }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path.display()),
        ];
        args.extend(self.options.to_args());
        args
    }

    fn ssh(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(self.common_args())
            .arg("-p")
            .arg(self.host.ssh_port.to_string());
        cmd
    }

    fn remote_target(&self, path: &str) -> String {
        format!("{}:{}", self.host.ssh_target(), shell_escape(path))
    }

    /// 执行命令并在非零退出码时返回 stderr
    async fn output(mut cmd: Command, what: &str) -> Result<String> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd
            .output()
            .await
            .with_context(|| format!("failed to spawn {}", what))?;

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "terminated by signal".to_string());
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "{} failed with code {}: {}",
                what,
                code,
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// 在远程主机上执行命令
    async fn exec(&self, command: &str) -> Result<String> {
        debug!("[{}] {}: {}", self.job.id, self.host.id, command);
        let mut cmd = self.ssh();
        cmd.arg(self.host.ssh_target()).arg("--").arg(command);
        Self::output(cmd, "ssh").await
    }

    async fn scp(&self, from: &str, to: &str) -> Result<()> {
        debug!("[{}] scp {} {}", self.job.id, from, to);
        let mut cmd = Command::new("scp");
        cmd.arg("-r")
            .args(self.common_args())
            .arg("-P")
            .arg(self.host.ssh_port.to_string())
            .arg(from)
            .arg(to);
        Self::output(cmd, "scp").await.map(|_| ())
    }

    async fn ensure_remote_parent(&self, path: &str) -> Result<()> {
        match Path::new(path).parent().map(|p| p.to_string_lossy()) {
            Some(parent) if !parent.is_empty() => {
                self.exec(&format!("mkdir -p {}", shell_escape(&parent)))
                    .await
                    .map(|_| ())
            }
            _ => Ok(()),
        }
    }
}

/// 解析 `du -sb` 的输出
fn parse_du(output: &str) -> Result<u64> {
    output
        .split_whitespace()
        .next()
        .and_then(|size| size.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("Unexpected du output: {}", output.trim()))
}

#[async_trait]
impl Interactor for SshInteractor {
    fn host(&self) -> &Host {
        &self.host
    }

    fn expand_path(&self, resource: &Resource) -> String {
        let path = resource.path_or_name();
        match &self.host.working_directory {
            Some(dir) if !path.starts_with('/') => {
                format!("{}/{}", dir.trim_end_matches('/'), path)
            }
            _ => path.to_string(),
        }
    }

    async fn open(&self) -> Result<()> {
        debug!("[{}] opening ssh session to {}", self.job.id, self.host.id);
        let mut cmd = self.ssh();
        cmd.args(["-M", "-N", "-f", "-o", "ControlMaster=yes"])
            .arg(self.host.ssh_target());
        Self::output(cmd, "ssh").await.map(|_| ())
    }

    async fn close(&self) -> Result<()> {
        debug!("[{}] closing ssh session to {}", self.job.id, self.host.id);
        let mut cmd = self.ssh();
        cmd.args(["-O", "exit"]).arg(self.host.ssh_target());
        Self::output(cmd, "ssh").await.map(|_| ())
    }

    async fn stat(&self, resource: &Resource) -> Result<u64> {
        let output = self
            .exec(&format!("du -sb {}", shell_escape(&self.expand_path(resource))))
            .await?;
        parse_du(&output)
    }

    async fn upload(&self, from: &Resource, to: &Resource, local: &dyn Interactor) -> Result<()> {
        let remote_path = self.expand_path(to);
        self.ensure_remote_parent(&remote_path).await?;
        self.scp(&local.expand_path(from), &self.remote_target(&remote_path))
            .await
    }

    async fn download(
        &self,
        from: &Resource,
        to: &Resource,
        local: &dyn Interactor,
    ) -> Result<()> {
        let local_path = local.expand_path(to);
        if let Some(parent) = Path::new(&local_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.scp(&self.remote_target(&self.expand_path(from)), &local_path)
            .await
    }

    async fn delete(&self, resource: &Resource) -> Result<()> {
        self.exec(&format!("rm -rf {}", shell_escape(&self.expand_path(resource))))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interactor(working_directory: Option<&str>) -> SshInteractor {
        let mut host = Host::remote("vault", "vault.example.org").with_user("backup");
        host.working_directory = working_directory.map(str::to_string);
        SshInteractor::new(&host, &Job::new("nightly"), &SshOptions::default())
    }

    #[test]
    fn test_expand_path_uses_working_directory() {
        let resource = Resource::file("dump.tar.gz", false);

        assert_eq!(
            interactor(Some("/srv/backups/")).expand_path(&resource),
            "/srv/backups/dump.tar.gz"
        );
        assert_eq!(interactor(None).expand_path(&resource), "dump.tar.gz");

        let absolute = resource.with_path("/tmp/dump.tar.gz");
        assert_eq!(
            interactor(Some("/srv/backups")).expand_path(&absolute),
            "/tmp/dump.tar.gz"
        );
    }

    #[test]
    fn test_remote_target_escapes_path() {
        assert_eq!(
            interactor(None).remote_target("/srv/$db dump"),
            "backup@vault.example.org:/srv/\\$db\\ dump"
        );
    }

    #[test]
    fn test_control_path_is_unique() {
        assert_ne!(interactor(None).control_path, interactor(None).control_path);
    }

    #[test]
    fn test_parse_du() {
        assert_eq!(parse_du("4096\t/srv/backups/dump\n").unwrap(), 4096);
        assert!(parse_du("du: cannot access").is_err());
    }
}
