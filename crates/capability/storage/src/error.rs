//! 存储层错误类型
//!
//! 定义统一的存储错误类型，用于封装底层错误：
//! - SQL 执行错误
//! - 连接错误（存储不可用）
//! - 唯一键冲突（去重键重复）
//! - 前置条件违例（编程错误，如空更新）

/// 存储错误分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// 普通后端错误（约束、数据解码等）
    Backend,
    /// 唯一键冲突
    DuplicateKey,
    /// 前置条件违例，属于编程错误，必须立即失败
    Precondition,
    /// 存储整体不可用（连接池耗尽、网络中断）
    Unavailable,
}

#[derive(Debug)]
pub struct StorageError {
    kind: StorageErrorKind,
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(StorageErrorKind::Backend, message)
    }

    pub fn with_kind(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::with_kind(StorageErrorKind::DuplicateKey, message)
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::with_kind(StorageErrorKind::Precondition, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_kind(StorageErrorKind::Unavailable, message)
    }

    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind == StorageErrorKind::DuplicateKey
    }

    /// 是否应中止整次运行（存储不可用或编程错误）。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            StorageErrorKind::Precondition | StorageErrorKind::Unavailable
        )
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StorageError {}

/// Postgres 唯一约束冲突的 SQLSTATE。
const UNIQUE_VIOLATION: &str = "23505";

/// 按 SQLSTATE 分类数据库错误。
///
/// - 08xxx 连接异常、53xxx 资源不足、57P01~57P03 服务关闭、25006 只读事务：存储整体不可用
/// - 23505：唯一键冲突
pub fn classify_sqlstate(code: &str) -> StorageErrorKind {
    if code == UNIQUE_VIOLATION {
        return StorageErrorKind::DuplicateKey;
    }
    if code.starts_with("08")
        || code.starts_with("53")
        || matches!(code, "57P01" | "57P02" | "57P03" | "25006")
    {
        return StorageErrorKind::Unavailable;
    }
    StorageErrorKind::Backend
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::Database(db) => db
                .code()
                .map(|code| classify_sqlstate(&code))
                .unwrap_or(StorageErrorKind::Backend),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StorageErrorKind::Unavailable,
            _ => StorageErrorKind::Backend,
        };
        Self::with_kind(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlstate_outage_classes_are_unavailable() {
        for code in ["08006", "08001", "53300", "53100", "57P01", "57P03", "25006"] {
            assert_eq!(classify_sqlstate(code), StorageErrorKind::Unavailable, "{code}");
        }
        assert_eq!(classify_sqlstate("23505"), StorageErrorKind::DuplicateKey);
        assert_eq!(classify_sqlstate("23503"), StorageErrorKind::Backend);
        assert_eq!(classify_sqlstate("22P02"), StorageErrorKind::Backend);
        assert!(StorageError::with_kind(classify_sqlstate("57P01"), "shutdown").is_fatal());
    }
}
