//! 采集链路错误类型。

use iot_storage::StorageError;
use std::time::Duration;

/// 中止整次运行的错误。
///
/// 单设备的取数失败与普通持久化失败不会出现在这里，而是记为运行警告。
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// 存储整体不可用
    #[error("storage unavailable: {0}")]
    Storage(StorageError),
    /// 前置条件违例（编程错误），永不吞掉
    #[error("precondition violated: {0}")]
    Precondition(String),
    /// 调度器已停止
    #[error("collection cancelled")]
    Cancelled,
    /// 编排自身的工作任务异常退出（取数端口的 panic 不在此列）
    #[error("worker failed: {0}")]
    Worker(String),
}

impl From<StorageError> for CollectError {
    fn from(err: StorageError) -> Self {
        match err.kind() {
            iot_storage::StorageErrorKind::Precondition => {
                CollectError::Precondition(err.message().to_string())
            }
            _ => CollectError::Storage(err),
        }
    }
}

/// 取数端口错误（按设备捕获）。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("fetch cancelled")]
    Cancelled,
    /// 取数实现自身 panic（已在单设备范围内捕获）
    #[error("fetcher panicked: {0}")]
    Panicked(String),
}
