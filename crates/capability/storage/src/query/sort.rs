//! 排序与分页指令。

use crate::traits::Entity;
use std::cmp::Ordering;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// 排序指令；未指定排序键时按主键升序，保证分页稳定。
#[derive(Debug, Clone)]
pub struct Sort<E: Entity> {
    keys: Vec<(E::Field, SortOrder)>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Sort<E> {
    pub fn by_id() -> Self {
        Self {
            keys: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn keys(&self) -> &[(E::Field, SortOrder)] {
        &self.keys
    }

    pub fn compare(&self, a: &E, b: &E) -> Ordering {
        for (field, order) in &self.keys {
            let ordering = a.get(*field).compare(&b.get(*field));
            let ordering = match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.get(E::ID_FIELD).compare(&b.get(E::ID_FIELD))
    }
}

pub struct SortBuilder<E: Entity> {
    keys: Vec<(E::Field, SortOrder)>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for SortBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> SortBuilder<E> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn asc(mut self, field: E::Field) -> Self {
        self.keys.push((field, SortOrder::Asc));
        self
    }

    pub fn desc(mut self, field: E::Field) -> Self {
        self.keys.push((field, SortOrder::Desc));
        self
    }

    pub fn build(self) -> Sort<E> {
        Sort {
            keys: self.keys,
            _entity: PhantomData,
        }
    }
}

/// 分页指令（页码从 1 开始）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    /// 页码与页大小均至少为 1。
    pub fn new(index: u32, size: u32) -> Self {
        Self {
            index: index.max(1),
            size: size.max(1),
        }
    }

    pub fn first(size: u32) -> Self {
        Self::new(1, size)
    }

    pub fn next(self) -> Self {
        Self::new(self.index.saturating_add(1), self.size)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.index - 1) * u64::from(self.size)
    }

    /// 当前页之后是否还有记录。
    pub fn has_more(&self, total: u64) -> bool {
        self.offset() + u64::from(self.size) < total
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn page_offsets_and_bounds() {
        let page = Page::new(0, 0);
        assert_eq!(page, Page { index: 1, size: 1 });

        let page = Page::first(10);
        assert_eq!(page.offset(), 0);
        assert!(page.has_more(11));
        assert!(!page.has_more(10));
        assert_eq!(page.next().offset(), 10);
    }
}
