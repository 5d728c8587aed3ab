//! 租户作用域查询构造层
//!
//! 所有实体仓储共用的纯构造层：
//! - [`filter`]：过滤表达式（等值、集合、存在性、模式、软删除）
//! - [`update`]：更新表达式（赋值、增量、时间戳刷新）
//! - [`sort`]：排序与分页指令
//! - [`value`]：与存储无关的字段值

pub mod filter;
pub mod sort;
pub mod update;
pub mod value;

pub use filter::{Filter, FilterBuilder, Predicate};
pub use sort::{Page, Sort, SortBuilder, SortOrder};
pub use update::{Update, UpdateBuilder, UpdateOp};
pub use value::FieldValue;
