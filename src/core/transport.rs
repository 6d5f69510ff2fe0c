//! 传输引擎 - 在本地与远程主机之间复制或移动资源
//!
//! 每个引擎实例只执行一次传输。执行顺序固定为：
//! 打开会话 -> stat 源资源 -> 传输 -> (移动时)删除源资源 -> stat 目标资源。

use crate::interactors::{in_session, Interactor, LocalInteractor};
use crate::metadata::{Host, Hosts, Job, TransportAction, TransportMetadata};
use crate::resources::Resource;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not implemented, please define {type_name}#{capability}")]
    MissingCapability {
        type_name: String,
        capability: &'static str,
    },
    #[error("Unsupported transfer of {resource} to {destination}: only local to remote and remote to local transfers are supported")]
    DirectionUnsupported {
        resource: String,
        destination: String,
    },
    #[error("Unknown host: {0}")]
    UnknownHost(String),
    #[error("Transfer failed: {0:#}")]
    Transfer(anyhow::Error),
    #[error("Session failed: {0:#}")]
    Session(#[from] anyhow::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// 具体传输方式需要提供的能力
///
/// `remote_interactor` 与 `remote_resource` 默认未提供，引擎在开始任何工作前
/// 会检查并以 [`TransportError::MissingCapability`] 失败。
pub trait TransportCapabilities: Send + Sync {
    /// 远程交互器，会话期间借用
    fn remote_interactor(&self) -> Option<Arc<dyn Interactor>> {
        None
    }

    /// 出站传输时资源在远程主机上的表示
    fn remote_resource(&self, _resource: &Resource) -> Option<Resource> {
        None
    }

    /// 资源落到指定主机后的表示（入站传输时用于构造本地输出资源）
    fn file_resource(&self, resource: &Resource, host: &Host) -> Resource {
        let mut output = Resource::new(resource.name.clone(), resource.kind, host.local);
        output.path = resource.path.clone();
        output
    }
}

/// 传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 本地 -> 远程
    Outbound,
    /// 远程 -> 本地
    Inbound,
}

impl Direction {
    pub fn resolve(resource_local: bool, destination_local: bool) -> Option<Self> {
        match (resource_local, destination_local) {
            (true, false) => Some(Direction::Outbound),
            (false, true) => Some(Direction::Inbound),
            _ => None,
        }
    }
}

/// 本地交互器工厂：(localhost, job) -> 交互器
pub type LocalInteractorFactory = Box<dyn Fn(&Host, &Job) -> Arc<dyn Interactor> + Send + Sync>;

/// 传输引擎
pub struct TransportEngine<C: TransportCapabilities> {
    capabilities: C,
    job: Job,
    hosts: Hosts,
    resource: Resource,
    metadata: TransportMetadata,
    local_factory: LocalInteractorFactory,
    output: Option<Resource>,
    product: Option<Resource>,
}

/// 类型名去掉模块路径和泛型参数
fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl<C: TransportCapabilities> TransportEngine<C> {
    pub fn new(
        capabilities: C,
        job: Job,
        hosts: Hosts,
        resource: Resource,
        metadata: TransportMetadata,
    ) -> Self {
        Self {
            capabilities,
            job,
            hosts,
            resource,
            metadata,
            local_factory: Box::new(|host: &Host, job: &Job| -> Arc<dyn Interactor> {
                Arc::new(LocalInteractor::new(host, job))
            }),
            output: None,
            product: None,
        }
    }

    /// 替换本地交互器的构造方式
    pub fn with_local_interactor<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Host, &Job) -> Arc<dyn Interactor> + Send + Sync + 'static,
    {
        self.local_factory = Box::new(factory);
        self
    }

    /// 源资源（执行后包含 stat 结果和 transient 标记）
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// 最近一次执行的目标资源
    pub fn output(&self) -> Option<&Resource> {
        self.output.as_ref()
    }

    /// 最近一次执行的产出：复制时为源资源，移动时为目标资源
    pub fn product(&self) -> Option<&Resource> {
        self.product.as_ref()
    }

    fn missing(capability: &'static str) -> TransportError {
        TransportError::MissingCapability {
            type_name: short_type_name::<C>(),
            capability,
        }
    }

    /// 执行传输，返回目标资源
    pub async fn run(&mut self) -> TransportResult<Resource> {
        let remote = self
            .capabilities
            .remote_interactor()
            .ok_or_else(|| Self::missing("remote_interactor"))?;
        let remote_resource = self
            .capabilities
            .remote_resource(&self.resource)
            .ok_or_else(|| Self::missing("remote_resource"))?;

        let destination_host = self
            .hosts
            .get(&self.metadata.to)
            .ok_or_else(|| TransportError::UnknownHost(self.metadata.to.clone()))?;

        let direction = Direction::resolve(self.resource.local, destination_host.local)
            .ok_or_else(|| TransportError::DirectionUnsupported {
                resource: self.resource.name.clone(),
                destination: self.metadata.to.clone(),
            })?;

        let destination = match direction {
            Direction::Outbound => remote_resource,
            Direction::Inbound => self
                .capabilities
                .file_resource(&self.resource, self.hosts.localhost()),
        };

        info!(
            "{} {} to {} using {}",
            self.metadata.action.verb(),
            self.resource.name,
            self.metadata.to,
            self.metadata.agent
        );

        let local = (self.local_factory)(self.hosts.localhost(), &self.job);
        let action = self.metadata.action;
        let mut source = self.resource.clone();
        let mut destination = destination;

        let (local_ref, remote_ref) = (local.as_ref(), remote.as_ref());
        let (source_ref, destination_ref) = (&mut source, &mut destination);
        let result = in_session(local_ref, move || async move {
            in_session(remote_ref, move || async move {
                execute(direction, action, source_ref, destination_ref, local_ref, remote_ref).await
            })
            .await
        })
        .await;

        // 传输失败时也保留已完成的 stat 结果
        self.resource = source.clone();
        result?;

        self.product = Some(match action {
            TransportAction::Copy => source,
            TransportAction::Move => destination.clone(),
        });
        self.output = Some(destination.clone());

        Ok(destination)
    }
}

/// 会话内的传输步骤，严格按顺序执行
async fn execute(
    direction: Direction,
    action: TransportAction,
    source: &mut Resource,
    destination: &mut Resource,
    local: &dyn Interactor,
    remote: &dyn Interactor,
) -> TransportResult<()> {
    let (source_side, destination_side) = match direction {
        Direction::Outbound => (local, remote),
        Direction::Inbound => (remote, local),
    };

    stat(source, source_side).await;

    match direction {
        Direction::Outbound => remote.upload(source, destination, local).await,
        Direction::Inbound => remote.download(source, destination, local).await,
    }
    .map_err(TransportError::Transfer)?;

    match action {
        TransportAction::Move => {
            source_side
                .delete(source)
                .await
                .map_err(TransportError::Transfer)?;
            source.mark_transient();
        }
        TransportAction::Copy => {}
    }

    stat(destination, destination_side).await;

    Ok(())
}

/// stat 失败只记录警告，`size` 保持未设置
pub async fn stat(resource: &mut Resource, interactor: &dyn Interactor) {
    match interactor.stat(resource).await {
        Ok(size) => resource.stat(size),
        Err(e) => warn!("Unable to stat resource of type {}: {}", resource.kind, e),
    }
}
