//! 过滤表达式构造。
//!
//! 构造过程是纯函数，不触达存储；只有仓储的执行方法会真正发起 I/O。
//! 提供租户上下文时，租户谓词总是与其余条件 AND 组合；软删除记录默认排除。

use crate::query::value::FieldValue;
use crate::traits::Entity;
use domain::TenantContext;
use std::marker::PhantomData;

/// 单个字段谓词。
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<F> {
    /// 字段等于给定值（给定值为 NULL 时等价于 `Exists(field, false)`）
    Eq(F, FieldValue),
    /// 字段取值属于集合
    In(F, Vec<FieldValue>),
    /// `true`：字段非空；`false`：字段为空
    Exists(F, bool),
    /// SQL LIKE 风格模式：`%` 匹配任意串，`_` 匹配单个字符
    Like(F, String),
}

/// 已构造的过滤条件。
#[derive(Debug, Clone)]
pub struct Filter<E: Entity> {
    tenant_id: Option<String>,
    include_deleted: bool,
    predicates: Vec<Predicate<E::Field>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Filter<E> {
    /// 租户谓词（`None` 表示跨租户枚举）。
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn is_tenant_scoped(&self) -> bool {
        self.tenant_id.is_some()
    }

    pub fn includes_deleted(&self) -> bool {
        self.include_deleted
    }

    pub fn predicates(&self) -> &[Predicate<E::Field>] {
        &self.predicates
    }

    /// 在内存中判定实体是否满足过滤条件。
    pub fn matches(&self, entity: &E) -> bool {
        if let Some(tenant_id) = self.tenant_id.as_deref() {
            if entity.tenant_id() != tenant_id {
                return false;
            }
        }
        if !self.include_deleted && entity.is_deleted() {
            return false;
        }
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Eq(field, FieldValue::Null) => entity.get(*field).is_null(),
            Predicate::Eq(field, value) => entity.get(*field).matches(value),
            Predicate::In(field, values) => {
                let current = entity.get(*field);
                values.iter().any(|value| current.matches(value))
            }
            Predicate::Exists(field, exists) => entity.get(*field).is_null() != *exists,
            Predicate::Like(field, pattern) => match entity.get(*field) {
                FieldValue::Text(text) => like_matches(pattern, &text),
                _ => false,
            },
        })
    }
}

/// 过滤条件构造器。
pub struct FilterBuilder<E: Entity> {
    tenant_id: Option<String>,
    include_deleted: bool,
    predicates: Vec<Predicate<E::Field>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> FilterBuilder<E> {
    /// 限定在上下文所属租户内的过滤条件。
    pub fn new(ctx: &TenantContext) -> Self {
        Self::with_tenant(Some(ctx.tenant_id.clone()))
    }

    /// 跨租户的只读枚举（仅用于全租户模式下列出网关）。
    pub fn unscoped() -> Self {
        Self::with_tenant(None)
    }

    fn with_tenant(tenant_id: Option<String>) -> Self {
        Self {
            tenant_id,
            include_deleted: false,
            predicates: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn eq(mut self, field: E::Field, value: impl Into<FieldValue>) -> Self {
        self.predicates.push(Predicate::Eq(field, value.into()));
        self
    }

    pub fn in_set<I, V>(mut self, field: E::Field, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.predicates.push(Predicate::In(field, values));
        self
    }

    pub fn exists(mut self, field: E::Field) -> Self {
        self.predicates.push(Predicate::Exists(field, true));
        self
    }

    pub fn missing(mut self, field: E::Field) -> Self {
        self.predicates.push(Predicate::Exists(field, false));
        self
    }

    pub fn like(mut self, field: E::Field, pattern: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Like(field, pattern.into()));
        self
    }

    /// 显式包含软删除记录。
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn build(self) -> Filter<E> {
        Filter {
            tenant_id: self.tenant_id,
            include_deleted: self.include_deleted,
            predicates: self.predicates,
            _entity: PhantomData,
        }
    }
}

/// LIKE 模式匹配（区分大小写）。
pub(crate) fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    // matched[j]：pattern 前 i 个字符能否匹配 text 前 j 个字符
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for token in &pattern {
        let mut next = vec![false; text.len() + 1];
        match token {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen = seen || matched[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            ch => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == *ch;
                }
            }
        }
        matched = next;
    }
    matched[text.len()]
}

#[cfg(test)]
mod tests {
    use super::like_matches;

    #[test]
    fn like_supports_wildcards() {
        assert!(like_matches("gw-%", "gw-01"));
        assert!(like_matches("gw-_1", "gw-01"));
        assert!(like_matches("%", ""));
        assert!(!like_matches("gw-_", "gw-01"));
        assert!(!like_matches("dev%", "gw-dev"));
    }
}
