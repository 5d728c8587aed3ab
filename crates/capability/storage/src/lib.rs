//! # IoT Storage 模块
//!
//! 本模块提供租户作用域的数据存储抽象层，支持内存与 PostgreSQL 两种后端。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：实体描述 `Entity` 与单一泛型仓储接口 `Repository<E>`
//! 2. **查询构造层** (`query/`)：过滤、更新、排序/分页表达式的纯构造
//! 3. **数据模型层** (`models.rs`)：网关、设备、数据点、数据记录
//! 4. **错误处理层** (`error.rs`)：带分类的存储错误（重复键、前置条件、不可用）
//! 5. **验证辅助层** (`validation.rs`)：租户上下文与过滤条件校验
//! 6. **连接管理层** (`connection.rs`)：数据库连接池管理
//! 7. **实现层**：
//!    - `in_memory/`：内存存储实现（用于测试和演示）
//!    - `postgres/`：PostgreSQL 存储实现（生产环境使用）
//!
//! ## 核心特性
//!
//! - **多租户隔离**：提供租户上下文构造的过滤条件总是带有租户谓词；写操作拒绝跨租户过滤
//! - **软删除**：默认排除 `is_deleted = true` 的记录，需显式 `include_deleted`
//! - **原子更新**：`find_one_and_update` 保证并发认领与计数增量不丢失
//! - **编译期字段描述**：每个实体以枚举列出可查询字段，不依赖运行时反射
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use iot_storage::{DeviceField, DeviceRecord, FilterBuilder, InMemoryRepository, Repository, Sort};
//! use domain::TenantContext;
//!
//! let repo = InMemoryRepository::<DeviceRecord>::new();
//! let ctx = TenantContext::system("tenant-1");
//! let filter = FilterBuilder::new(&ctx).eq(DeviceField::GatewayId, "gw-1").build();
//! let devices = repo.find(&filter, &Sort::by_id(), None).await?;
//! ```

// 模块导出：将子模块的内容导出到 crate 根目录
pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod traits;
pub mod validation;

// 导出常用类型到 crate 根目录，方便外部引用
pub use connection::*;
pub use error::*;
pub use models::*;
pub use query::*;
pub use traits::*;
pub use validation::*;

pub use in_memory::InMemoryRepository;
pub use postgres::{PgEntity, PgRepository};
