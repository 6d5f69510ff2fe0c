pub mod hosts;
pub mod project;
pub mod ssh_options;

use serde::{Deserialize, Serialize};

pub use hosts::{Host, Hosts, LOCALHOST};
pub use project::Project;
pub use ssh_options::{HostKeyChecking, SshOptions};

/// 备份任务
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub id: String,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// 传输动作
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportAction {
    Copy,
    Move,
}

impl TransportAction {
    /// 日志中使用的动词
    pub fn verb(&self) -> &'static str {
        match self {
            TransportAction::Copy => "Copying",
            TransportAction::Move => "Moving",
        }
    }
}

/// 传输元数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransportMetadata {
    /// 目标主机 id
    pub to: String,
    pub action: TransportAction,
    /// 仅用于日志
    pub agent: String,
}

impl TransportMetadata {
    pub fn new(to: impl Into<String>, action: TransportAction, agent: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            action,
            agent: agent.into(),
        }
    }
}
