//! 验证辅助函数
//!
//! 提供统一的验证逻辑，确保租户隔离：
//! - ensure_tenant：验证租户 ID 非空
//! - ensure_owned：验证实体归属当前租户
//! - ensure_scoped：验证写操作的过滤条件限定了租户
//!
//! 使用场景：
//! - 所有数据访问前验证租户上下文
//! - 写操作前拒绝跨租户的过滤条件

use crate::error::StorageError;
use crate::query::Filter;
use crate::traits::Entity;
use domain::TenantContext;

/// 验证租户 ID 非空
///
/// 确保所有数据访问都有有效的租户上下文。
pub fn ensure_tenant(ctx: &TenantContext) -> Result<(), StorageError> {
    if ctx.tenant_id.is_empty() {
        return Err(StorageError::new("tenant_id required"));
    }
    Ok(())
}

/// 验证实体归属当前租户
pub fn ensure_owned<E: Entity>(ctx: &TenantContext, entity: &E) -> Result<(), StorageError> {
    ensure_tenant(ctx)?;
    if entity.tenant_id() != ctx.tenant_id {
        return Err(StorageError::new("tenant mismatch"));
    }
    Ok(())
}

/// 验证过滤条件的租户谓词
///
/// 跨租户过滤只允许用于读；写操作必须落在单个租户内。
pub fn ensure_scoped<E: Entity>(filter: &Filter<E>) -> Result<(), StorageError> {
    match filter.tenant_id() {
        Some(tenant_id) if !tenant_id.is_empty() => Ok(()),
        Some(_) => Err(StorageError::new("tenant_id required")),
        None => Err(StorageError::precondition(format!(
            "write on {} requires a tenant-scoped filter",
            E::TABLE
        ))),
    }
}

/// 验证读操作的租户谓词（允许显式的跨租户枚举，但拒绝空租户）
pub fn ensure_readable<E: Entity>(filter: &Filter<E>) -> Result<(), StorageError> {
    match filter.tenant_id() {
        Some("") => Err(StorageError::new("tenant_id required")),
        _ => Ok(()),
    }
}
