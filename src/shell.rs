//! 命令执行 - 供流水线命令调用的 shell

use crate::metadata::{Host, Job};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-.,:+/@\n]").expect("valid regex"));

/// 按 POSIX shell 规则转义单个参数：不安全字符前加反斜杠
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    UNSAFE_CHARS
        .replace_all(s, "\\$0")
        .replace('\n', "'\n'")
}

/// 命令输出
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait Shell: Send + Sync {
    fn host(&self) -> &Host;

    /// 返回绝对路径，已做 shell 转义
    fn expand_path(&self, path: &str) -> String;

    /// 执行命令，非零退出码视为失败
    async fn exec(&self, command: &str) -> Result<ExecOutput>;
}

/// 本地 shell，使用 bash 执行
pub struct LocalShell {
    host: Host,
    job: Job,
    working_directory: PathBuf,
}

impl LocalShell {
    pub fn new(host: &Host, job: &Job) -> Self {
        let working_directory = host
            .working_directory
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            host: host.clone(),
            job: job.clone(),
            working_directory,
        }
    }
}

#[async_trait]
impl Shell for LocalShell {
    fn host(&self) -> &Host {
        &self.host
    }

    fn expand_path(&self, path: &str) -> String {
        if path.starts_with('/') {
            return shell_escape(path);
        }
        format!(
            "{}/{}",
            shell_escape(&self.working_directory.to_string_lossy()),
            shell_escape(path)
        )
    }

    async fn exec(&self, command: &str) -> Result<ExecOutput> {
        tracing::debug!("[{}] exec: {}", self.job.id, command);

        let output = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("failed to spawn bash")?;

        let result = ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "Command exited with {}: {}",
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                result.stderr.trim()
            ));
        }

        Ok(result)
    }
}
