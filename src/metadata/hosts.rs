//! 主机注册表

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const LOCALHOST: &str = "localhost";

fn default_ssh_port() -> u16 {
    22
}

/// 主机
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Host {
    pub id: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(skip)]
    pub local: bool,
}

impl Host {
    pub fn remote(id: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hostname: Some(hostname.into()),
            user: None,
            ssh_port: default_ssh_port(),
            working_directory: None,
            local: false,
        }
    }

    pub fn localhost(working_directory: Option<String>) -> Self {
        Self {
            id: LOCALHOST.to_string(),
            hostname: None,
            user: None,
            ssh_port: default_ssh_port(),
            working_directory,
            local: true,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// ssh 目标，形如 user@hostname
    pub fn ssh_target(&self) -> String {
        let hostname = self.hostname.as_deref().unwrap_or(&self.id);
        match &self.user {
            Some(user) => format!("{}@{}", user, hostname),
            None => hostname.to_string(),
        }
    }
}

/// 主机注册表，固定包含唯一的 localhost
#[derive(Debug, Clone)]
pub struct Hosts {
    localhost: Host,
    hosts: HashMap<String, Host>,
}

impl Default for Hosts {
    fn default() -> Self {
        Self::new()
    }
}

impl Hosts {
    pub fn new() -> Self {
        Self::with_localhost(Host::localhost(None))
    }

    pub fn with_localhost(localhost: Host) -> Self {
        Self {
            localhost,
            hosts: HashMap::new(),
        }
    }

    pub fn localhost(&self) -> &Host {
        &self.localhost
    }

    /// 注册远程主机；localhost 不能被覆盖
    pub fn add(&mut self, mut host: Host) -> Result<()> {
        if host.id == LOCALHOST {
            return Err(anyhow::anyhow!("Host id \"{}\" is reserved", LOCALHOST));
        }
        host.local = false;
        self.hosts.insert(host.id.clone(), host);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Host> {
        if id == LOCALHOST {
            return Some(&self.localhost);
        }
        self.hosts.get(id)
    }
}
