//! 测试用交互器：记录调用顺序，可注入失败

use super::Interactor;
use crate::metadata::Host;
use crate::resources::Resource;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct RecordingInteractor {
    host: Host,
    log: CallLog,
    stat_size: u64,
    stat_error: Option<String>,
    open_error: Option<String>,
    transfer_error: Option<String>,
}

impl RecordingInteractor {
    pub fn remote(id: &str) -> Self {
        Self::with_host(Host::remote(id, format!("{}.example.org", id)))
    }

    pub fn local() -> Self {
        Self::with_host(Host::localhost(Some("/backups".to_string())))
    }

    fn with_host(host: Host) -> Self {
        Self {
            host,
            log: CallLog::default(),
            stat_size: 1024,
            stat_error: None,
            open_error: None,
            transfer_error: None,
        }
    }

    /// 与其他交互器共享调用记录
    pub fn sharing(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn stat_size(mut self, size: u64) -> Self {
        self.stat_size = size;
        self
    }

    pub fn failing_stat(mut self, message: &str) -> Self {
        self.stat_error = Some(message.to_string());
        self
    }

    pub fn failing_open(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    pub fn failing_transfer(mut self, message: &str) -> Self {
        self.transfer_error = Some(message.to_string());
        self
    }

    pub fn record(&self, call: impl Into<String>) {
        self.log.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record_op(&self, op: &str, detail: String) {
        self.record(format!("{}:{} {}", self.host.id, op, detail));
    }

    fn transfer_result(&self) -> Result<()> {
        match &self.transfer_error {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Interactor for RecordingInteractor {
    fn host(&self) -> &Host {
        &self.host
    }

    fn expand_path(&self, resource: &Resource) -> String {
        let base = self.host.working_directory.as_deref().unwrap_or("/home/backup");
        format!("{}/{}", base, resource.path_or_name())
    }

    async fn open(&self) -> Result<()> {
        self.record(format!("{}:open", self.host.id));
        match &self.open_error {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.record(format!("{}:close", self.host.id));
        Ok(())
    }

    async fn stat(&self, resource: &Resource) -> Result<u64> {
        self.record_op("stat", resource.name.clone());
        match &self.stat_error {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(self.stat_size),
        }
    }

    async fn upload(&self, from: &Resource, to: &Resource, local: &dyn Interactor) -> Result<()> {
        self.record_op(
            "upload",
            format!("{} -> {} via {}", from.name, to.name, local.host().id),
        );
        self.transfer_result()
    }

    async fn download(
        &self,
        from: &Resource,
        to: &Resource,
        local: &dyn Interactor,
    ) -> Result<()> {
        self.record_op(
            "download",
            format!("{} -> {} via {}", from.name, to.name, local.host().id),
        );
        self.transfer_result()
    }

    async fn delete(&self, resource: &Resource) -> Result<()> {
        self.record_op("delete", resource.name.clone());
        Ok(())
    }
}
