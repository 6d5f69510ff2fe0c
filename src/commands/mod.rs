//! 流水线命令

pub mod database;

use crate::metadata::Project;
use crate::shell::Shell;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{command} requires a {expected} resource as input")]
    MissingInput {
        command: &'static str,
        expected: &'static str,
    },
    #[error("{0:#}")]
    Exec(#[from] anyhow::Error),
}

/// 命令执行所需的上下文
#[derive(Clone)]
pub struct CommandContext {
    pub shell: Arc<dyn Shell>,
    /// 命令选项，例如数据库的 user/password
    pub options: serde_json::Value,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令，把产出写入项目
    async fn run(&self, project: &mut Project) -> Result<(), CommandError>;
}

pub type CommandFactory = fn(CommandContext) -> anyhow::Result<Box<dyn Command>>;

pub mod register {
    use super::*;

    /// 按名称查找命令
    pub fn command(name: &str) -> Option<CommandFactory> {
        match name {
            "mongodb_dump" => Some(database::mongodb_dump::factory as CommandFactory),
            _ => None,
        }
    }
}
