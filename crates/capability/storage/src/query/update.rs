//! 更新表达式构造。
//!
//! 更新表达式由仓储的 `find_one_and_update` 以单次原子操作执行，
//! 计数类字段只能通过 `inc` 增量更新，禁止先读后写。

use crate::error::StorageError;
use crate::query::value::FieldValue;
use crate::traits::Entity;
use std::marker::PhantomData;

/// 单个更新操作。
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp<F> {
    /// 字段赋值
    Set(F, FieldValue),
    /// 整数字段增量（NULL 视为 0）
    Inc(F, i64),
    /// 时间戳字段置为执行时刻（Unix 毫秒）
    Touch(F),
}

/// 已构造的更新表达式（至少包含一个操作）。
#[derive(Debug, Clone)]
pub struct Update<E: Entity> {
    ops: Vec<UpdateOp<E::Field>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Update<E> {
    pub fn ops(&self) -> &[UpdateOp<E::Field>] {
        &self.ops
    }

    /// 将更新应用到内存实体；`now_ms` 为 `Touch` 使用的执行时刻。
    pub fn apply(&self, entity: &mut E, now_ms: i64) -> Result<(), StorageError> {
        for op in &self.ops {
            match op {
                UpdateOp::Set(field, value) => entity.set(*field, value.clone())?,
                UpdateOp::Inc(field, delta) => {
                    let current = match entity.get(*field) {
                        FieldValue::Null => 0,
                        FieldValue::Int(value) => value,
                        other => {
                            return Err(StorageError::precondition(format!(
                                "cannot increment {:?} holding {:?}",
                                field, other
                            )));
                        }
                    };
                    entity.set(*field, FieldValue::Int(current.saturating_add(*delta)))?;
                }
                UpdateOp::Touch(field) => entity.set(*field, FieldValue::Int(now_ms))?,
            }
        }
        Ok(())
    }
}

/// 更新表达式构造器。
pub struct UpdateBuilder<E: Entity> {
    ops: Vec<UpdateOp<E::Field>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for UpdateBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> UpdateBuilder<E> {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn set(mut self, field: E::Field, value: impl Into<FieldValue>) -> Self {
        self.ops.push(UpdateOp::Set(field, value.into()));
        self
    }

    pub fn inc(mut self, field: E::Field, delta: i64) -> Self {
        self.ops.push(UpdateOp::Inc(field, delta));
        self
    }

    pub fn touch(mut self, field: E::Field) -> Self {
        self.ops.push(UpdateOp::Touch(field));
        self
    }

    /// 构造更新表达式；没有任何操作时视为编程错误立即失败。
    pub fn build(self) -> Result<Update<E>, StorageError> {
        if self.ops.is_empty() {
            return Err(StorageError::precondition(format!(
                "update for {} has no operations",
                E::TABLE
            )));
        }
        Ok(Update {
            ops: self.ops,
            _entity: PhantomData,
        })
    }
}
