pub mod local;
pub mod ssh;

#[cfg(test)]
pub(crate) mod testing;

use crate::metadata::Host;
use crate::resources::Resource;
use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;

pub use local::LocalInteractor;
pub use ssh::SshInteractor;

/// 主机交互接口：在单个主机上执行 stat/upload/download/delete
///
/// 所有操作都应在 [`in_session`] 打开的会话内调用。
#[async_trait]
pub trait Interactor: Send + Sync {
    /// 绑定的主机
    fn host(&self) -> &Host;

    /// 资源在该主机上的绝对路径
    fn expand_path(&self, resource: &Resource) -> String;

    /// 打开会话（连接）
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    /// 关闭会话
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// 获取资源大小（字节）
    async fn stat(&self, resource: &Resource) -> Result<u64>;

    /// 把本地资源 `from` 推送到本主机上的 `to`，`local` 负责解析本地路径
    async fn upload(&self, from: &Resource, to: &Resource, local: &dyn Interactor) -> Result<()>;

    /// 把本主机上的 `from` 拉取到本地资源 `to`
    async fn download(&self, from: &Resource, to: &Resource, local: &dyn Interactor)
        -> Result<()>;

    /// 删除资源
    async fn delete(&self, resource: &Resource) -> Result<()>;
}

/// 在会话内执行 `body`，无论成功与否都会关闭会话
///
/// `body` 失败时关闭错误只记录日志，返回 `body` 的错误。
pub async fn in_session<I, F, Fut, T, E>(interactor: &I, body: F) -> Result<T, E>
where
    I: Interactor + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<anyhow::Error>,
{
    interactor.open().await.map_err(E::from)?;

    let result = body().await;
    let closed = interactor.close().await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(E::from(e)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_error)) => {
            tracing::warn!(
                "Unable to close session on {}: {}",
                interactor.host().id,
                close_error
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingInteractor;
    use super::*;

    #[tokio::test]
    async fn test_session_wraps_body() {
        let interactor = RecordingInteractor::remote("vault");
        let recorder = &interactor;
        let value: Result<u32> = in_session(&interactor, move || async move {
            recorder.record("body");
            Ok(7)
        })
        .await;

        assert_eq!(value.unwrap(), 7);
        assert_eq!(interactor.calls(), vec!["vault:open", "body", "vault:close"]);
    }

    #[tokio::test]
    async fn test_session_closes_when_body_fails() {
        let interactor = RecordingInteractor::remote("vault");
        let value: Result<()> =
            in_session(&interactor, || async { Err(anyhow::anyhow!("scp exited with 1")) }).await;

        assert_eq!(value.unwrap_err().to_string(), "scp exited with 1");
        assert_eq!(interactor.calls(), vec!["vault:open", "vault:close"]);
    }

    #[tokio::test]
    async fn test_session_not_entered_when_open_fails() {
        let interactor = RecordingInteractor::remote("vault").failing_open("connection refused");
        let recorder = &interactor;
        let value: Result<()> = in_session(&interactor, move || async move {
            recorder.record("body");
            Ok(())
        })
        .await;

        assert!(value.is_err());
        assert_eq!(interactor.calls(), vec!["vault:open"]);
    }
}
