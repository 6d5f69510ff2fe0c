//! 资源模型 - 描述一次流水线步骤产出的备份工件

use serde::{Deserialize, Serialize};
use std::fmt;

/// 资源类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Directory,
    Database,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::File => write!(f, "file"),
            ResourceKind::Directory => write!(f, "directory"),
            ResourceKind::Database => write!(f, "database"),
        }
    }
}

/// 备份工件
///
/// `size` 在 stat 成功之前始终为 `None`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceKind,
    pub path: Option<String>,
    pub local: bool,
    #[serde(default)]
    pub transient: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind, local: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            path: None,
            local,
            transient: false,
            size: None,
        }
    }

    pub fn file(name: impl Into<String>, local: bool) -> Self {
        Self::new(name, ResourceKind::File, local)
    }

    pub fn database(name: impl Into<String>) -> Self {
        // 数据库本身不落盘，视为本地资源
        Self::new(name, ResourceKind::Database, true)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// 实际使用的路径：未解析路径时退回到名称
    pub fn path_or_name(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    /// 记录 stat 结果
    pub fn stat(&mut self, size: u64) {
        self.size = Some(size);
    }

    pub fn is_stated(&self) -> bool {
        self.size.is_some()
    }

    /// 标记为临时资源（移动后源端已不再需要）
    pub fn mark_transient(&mut self) {
        self.transient = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_resource_is_unstated() {
        let resource = Resource::file("dump.tar.gz", true);
        assert!(!resource.is_stated());
        assert!(!resource.transient);
        assert_eq!(resource.path_or_name(), "dump.tar.gz");
    }

    #[test]
    fn test_stat_and_transient() {
        let mut resource = Resource::file("dump.tar.gz", true).with_path("backups/dump.tar.gz");
        resource.stat(4096);
        resource.mark_transient();

        assert_eq!(resource.size, Some(4096));
        assert!(resource.transient);
        assert_eq!(resource.path_or_name(), "backups/dump.tar.gz");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ResourceKind::File.to_string(), "file");
        assert_eq!(ResourceKind::Database.to_string(), "database");
    }
}
