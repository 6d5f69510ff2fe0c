//! SSH 连接选项

use serde::{Deserialize, Serialize};

/// 主机密钥校验策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HostKeyChecking {
    #[default]
    Standard,
    Strict,
    Lax,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SshOptions {
    #[serde(default)]
    pub host_key_checking: HostKeyChecking,
    #[serde(default = "default_known_hosts")]
    pub known_hosts: String,
}

fn default_known_hosts() -> String {
    "~/.ssh/known_hosts".to_string()
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            host_key_checking: HostKeyChecking::default(),
            known_hosts: default_known_hosts(),
        }
    }
}

impl SshOptions {
    /// 转换为 ssh/scp 的 `-o` 参数
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match self.host_key_checking {
            HostKeyChecking::Standard => {}
            HostKeyChecking::Strict => {
                args.push("-o".to_string());
                args.push("StrictHostKeyChecking=yes".to_string());
            }
            HostKeyChecking::Lax => {
                args.push("-o".to_string());
                args.push("StrictHostKeyChecking=no".to_string());
            }
        }
        args.push("-o".to_string());
        args.push(format!("UserKnownHostsFile={}", expand_home(&self.known_hosts)));
        args
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}
