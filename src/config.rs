//! 应用配置模块
//!
//! 所有配置存放在 `<config dir>/config.json` 中，按 section 分段读取。

use crate::metadata::{Host, Hosts, SshOptions};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "config.json";

/// 远程主机配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    pub id: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

fn default_ssh_port() -> u16 {
    22
}

impl From<&HostConfig> for Host {
    fn from(config: &HostConfig) -> Self {
        Host {
            id: config.id.clone(),
            hostname: Some(config.hostname.clone()),
            user: config.user.clone(),
            ssh_port: config.ssh_port,
            working_directory: config.working_directory.clone(),
            local: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// 本地工作目录，默认为当前目录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub ssh: SshOptions,
}

impl AppConfig {
    /// 从配置文件加载，缺失或格式错误的字段使用默认值
    pub fn load(config_dir: &Path) -> Self {
        let Some(document) = read_document(config_dir) else {
            return Self::default();
        };

        Self {
            working_directory: document
                .get("workingDirectory")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            hosts: section(&document, "hosts").unwrap_or_default(),
            ssh: section(&document, "ssh").unwrap_or_default(),
        }
    }

    /// 保存配置（保留文件中的其他 section，例如 log）
    pub fn save(&self, config_dir: &Path) -> Result<()> {
        save_section(config_dir, "hosts", &self.hosts)?;
        save_section(config_dir, "ssh", &self.ssh)?;
        if let Some(dir) = &self.working_directory {
            save_section(config_dir, "workingDirectory", dir)?;
        }
        Ok(())
    }

    /// 添加或替换远程主机，`localhost` 为保留 id
    pub fn add_host(&mut self, host: HostConfig) -> Result<()> {
        if host.id == crate::metadata::LOCALHOST {
            anyhow::bail!("Host id \"{}\" is reserved", host.id);
        }
        match self.hosts.iter_mut().find(|existing| existing.id == host.id) {
            Some(existing) => *existing = host,
            None => self.hosts.push(host),
        }
        Ok(())
    }

    /// 构建主机注册表
    pub fn hosts(&self) -> Result<Hosts> {
        let mut hosts = Hosts::with_localhost(Host::localhost(self.working_directory.clone()));
        for host in &self.hosts {
            hosts
                .add(Host::from(host))
                .with_context(|| format!("Invalid host configuration: {}", host.id))?;
        }
        Ok(hosts)
    }
}

fn read_document(config_dir: &Path) -> Option<serde_json::Value> {
    let content = fs::read_to_string(config_dir.join(CONFIG_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

fn section<T: DeserializeOwned>(document: &serde_json::Value, key: &str) -> Option<T> {
    let value = document.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Ignoring malformed \"{}\" configuration: {}", key, e);
            None
        }
    }
}

/// 读取单个 section
pub fn load_section<T: DeserializeOwned>(config_dir: &Path, key: &str) -> Option<T> {
    section(&read_document(config_dir)?, key)
}

/// 写入单个 section，其余内容保持不变
pub fn save_section<T: Serialize>(config_dir: &Path, key: &str, value: &T) -> Result<()> {
    fs::create_dir_all(config_dir)?;
    let mut document = read_document(config_dir).unwrap_or_else(|| serde_json::json!({}));
    if !document.is_object() {
        document = serde_json::json!({});
    }

    document[key] = serde_json::to_value(value)?;

    let content = serde_json::to_string_pretty(&document)?;
    fs::write(config_dir.join(CONFIG_FILE), content)
        .with_context(|| format!("Unable to write {}", config_dir.join(CONFIG_FILE).display()))?;
    Ok(())
}
