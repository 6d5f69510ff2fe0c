//! MongoDB 导出命令：调用 mongodump 生成带时间戳的导出目录

use crate::commands::{Command, CommandContext, CommandError};
use crate::metadata::Project;
use crate::resources::{Resource, ResourceKind};
use crate::shell::{shell_escape, Shell};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const NAME: &str = "mongodb_dump";

/// 导出选项
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MongoDbDumpOptions {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub struct MongoDbDump {
    shell: Arc<dyn Shell>,
    options: MongoDbDumpOptions,
}

pub(crate) fn factory(context: CommandContext) -> anyhow::Result<Box<dyn Command>> {
    let options = if context.options.is_null() {
        MongoDbDumpOptions::default()
    } else {
        serde_json::from_value(context.options)?
    };
    Ok(Box::new(MongoDbDump::new(context.shell, options)))
}

/// 导出目录名：<数据库名>-YYYYMMDD-hhmmss
fn dump_name(database: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", database, now.format("%Y%m%d-%H%M%S"))
}

impl MongoDbDump {
    pub fn new(shell: Arc<dyn Shell>, options: MongoDbDumpOptions) -> Self {
        Self { shell, options }
    }

    fn command_line(&self, database: &str, output_path: &str) -> String {
        let mut cmd = format!(
            "mongodump -d {} -o {}",
            shell_escape(database),
            output_path
        );
        // 只有同时提供用户名和密码时才追加认证参数
        if let (Some(user), Some(password)) = (&self.options.user, &self.options.password) {
            cmd.push_str(&format!(
                " -u {} -p {}",
                shell_escape(user),
                shell_escape(password)
            ));
        }
        cmd.push_str(" &> /dev/null");
        cmd
    }

    /// 以指定时间执行，便于固定时间戳
    pub async fn run_at(&self, project: &mut Project, now: DateTime<Utc>) -> Result<(), CommandError> {
        let database = project
            .last_product()
            .filter(|resource| resource.kind == ResourceKind::Database)
            .map(|resource| resource.name.clone())
            .ok_or(CommandError::MissingInput {
                command: NAME,
                expected: "database",
            })?;

        info!("Creating a dump of the \"{}\" MongoDB database", database);

        let name = dump_name(&database, now);
        let output_path = self.shell.expand_path(&name);
        self.shell
            .exec(&self.command_line(&database, &output_path))
            .await?;

        let output = Resource::new(name.clone(), ResourceKind::Directory, self.shell.host().local)
            .with_path(name);
        project.store_product(output);
        Ok(())
    }
}

#[async_trait]
impl Command for MongoDbDump {
    async fn run(&self, project: &mut Project) -> Result<(), CommandError> {
        self.run_at(project, Utc::now()).await
    }
}
