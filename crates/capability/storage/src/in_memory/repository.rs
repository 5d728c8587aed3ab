//! 泛型内存仓储实现
//!
//! 仅用于本地演示和测试。
//!
//! 功能：
//! - 任意实体的插入/查询/分页/计数
//! - 唯一键冲突检测
//! - 写锁内完成的原子更新（并发认领只会有一个成功）
//! - 租户隔离验证

use crate::error::StorageError;
use crate::query::{Filter, Page, Sort, Update};
use crate::traits::{Entity, Repository};
use crate::validation::{ensure_owned, ensure_readable, ensure_scoped};
use domain::{TenantContext, now_epoch_ms};
use std::collections::HashMap;
use std::sync::RwLock;

/// 内存仓储
///
/// 使用 RwLock + HashMap 提供线程安全的内存存储，以唯一键为索引。
pub struct InMemoryRepository<E: Entity> {
    items: RwLock<HashMap<String, E>>,
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// 预置数据（测试夹具使用，跳过租户校验）
    pub fn with_items(items: impl IntoIterator<Item = E>) -> Self {
        let map = items
            .into_iter()
            .map(|item| (item.unique_key(), item))
            .collect();
        Self {
            items: RwLock::new(map),
        }
    }

    /// 当前全部实体（含软删除），按主键排序
    pub fn snapshot(&self) -> Vec<E> {
        let mut items: Vec<E> = self
            .items
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        let sort = Sort::<E>::by_id();
        items.sort_by(|a, b| sort.compare(a, b));
        items
    }

    fn matching(&self, filter: &Filter<E>, sort: &Sort<E>) -> Result<Vec<E>, StorageError> {
        let map = self
            .items
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut items: Vec<E> = map
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        items.sort_by(|a, b| sort.compare(a, b));
        Ok(items)
    }
}

#[async_trait::async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn insert(&self, ctx: &TenantContext, entity: E) -> Result<E, StorageError> {
        ensure_owned(ctx, &entity)?;
        let mut map = self
            .items
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let key = entity.unique_key();
        if map.contains_key(&key) {
            return Err(StorageError::duplicate(format!(
                "{} already contains {}",
                E::TABLE,
                key
            )));
        }
        map.insert(key, entity.clone());
        Ok(entity)
    }

    async fn find(
        &self,
        filter: &Filter<E>,
        sort: &Sort<E>,
        limit: Option<u32>,
    ) -> Result<Vec<E>, StorageError> {
        ensure_readable(filter)?;
        let mut items = self.matching(filter, sort)?;
        if let Some(limit) = limit {
            items.truncate(limit as usize);
        }
        Ok(items)
    }

    async fn find_paged(
        &self,
        filter: &Filter<E>,
        sort: &Sort<E>,
        page: Page,
    ) -> Result<(Vec<E>, u64), StorageError> {
        ensure_readable(filter)?;
        let items = self.matching(filter, sort)?;
        let total = items.len() as u64;
        let page_items = items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok((page_items, total))
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter<E>,
        update: &Update<E>,
    ) -> Result<Option<E>, StorageError> {
        ensure_scoped(filter)?;
        let mut map = self
            .items
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let sort = Sort::<E>::by_id();
        let target = map
            .values()
            .filter(|item| filter.matches(item))
            .min_by(|a, b| sort.compare(a, b))
            .map(Entity::unique_key);
        let Some(key) = target else {
            return Ok(None);
        };
        let Some(item) = map.get_mut(&key) else {
            return Ok(None);
        };
        // 先在副本上应用，失败时不留下部分更新
        let mut updated = item.clone();
        update.apply(&mut updated, now_epoch_ms())?;
        *item = updated.clone();
        Ok(Some(updated))
    }

    async fn count(&self, filter: &Filter<E>) -> Result<u64, StorageError> {
        ensure_readable(filter)?;
        let map = self
            .items
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(map.values().filter(|item| filter.matches(item)).count() as u64)
    }
}
