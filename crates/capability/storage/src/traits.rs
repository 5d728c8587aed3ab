//! 存储接口 Trait 定义
//!
//! - Entity / EntityField：实体与可查询字段的编译期描述（替代运行时反射）
//! - Repository<E>：单一泛型仓储接口，按实体类型参数化
//!
//! 设计原则：
//! - 过滤条件携带租户谓词，写操作必须限定租户
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发（`Arc<dyn Repository<E>>`）

use crate::error::StorageError;
use crate::query::{FieldValue, Filter, Page, Sort, Update};
use async_trait::async_trait;
use domain::TenantContext;

/// 所有表共有的租户列。
pub const TENANT_COLUMN: &str = "tenant_id";

/// 所有表共有的软删除列。
pub const DELETED_COLUMN: &str = "is_deleted";

/// 实体的可查询/可更新字段。
///
/// 租户字段不在其中，因此创建后无法通过更新表达式修改。
pub trait EntityField: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// 对应的存储列名
    fn column(self) -> &'static str;
}

/// 受仓储管理的实体。
pub trait Entity: Clone + std::fmt::Debug + Send + Sync + 'static {
    type Field: EntityField;

    /// 存储表名
    const TABLE: &'static str;
    /// 主键字段（默认排序与行定位）
    const ID_FIELD: Self::Field;

    fn tenant_id(&self) -> &str;

    fn is_deleted(&self) -> bool;

    fn get(&self, field: Self::Field) -> FieldValue;

    fn set(&mut self, field: Self::Field, value: FieldValue) -> Result<(), StorageError>;

    /// 唯一键（租户内），插入时用于冲突检测
    fn unique_key(&self) -> String;
}

/// 租户作用域仓储接口。
///
/// 过滤/更新/排序的构造不触达存储，只有以下执行方法发起 I/O。
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// 插入实体；唯一键冲突返回 `DuplicateKey`
    async fn insert(&self, ctx: &TenantContext, entity: E) -> Result<E, StorageError>;

    /// 按条件查询，`limit` 为空时不限制条数
    async fn find(
        &self,
        filter: &Filter<E>,
        sort: &Sort<E>,
        limit: Option<u32>,
    ) -> Result<Vec<E>, StorageError>;

    /// 分页查询，返回 (当前页记录, 总数)
    async fn find_paged(
        &self,
        filter: &Filter<E>,
        sort: &Sort<E>,
        page: Page,
    ) -> Result<(Vec<E>, u64), StorageError>;

    /// 原子地更新一条匹配记录并返回更新后的实体；无匹配返回 `None`
    async fn find_one_and_update(
        &self,
        filter: &Filter<E>,
        update: &Update<E>,
    ) -> Result<Option<E>, StorageError>;

    /// 统计匹配记录数
    async fn count(&self, filter: &Filter<E>) -> Result<u64, StorageError>;
}
