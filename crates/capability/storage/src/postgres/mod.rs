//! # PostgreSQL 存储实现模块
//!
//! 本模块提供泛型仓储接口的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：过滤值、更新值全部通过 `QueryBuilder::push_bind` 绑定，列名只来自实体的编译期字段描述
//! 2. **多租户隔离**：租户谓词总是与其他条件 AND 组合
//! 3. **原子更新**：`find_one_and_update` 以单条 `update ... where id = (select ... for update)` 语句完成
//!
//! ## 包含的实现
//!
//! - **PgRepository<E>** (`repository.rs`)：任意实现 [`PgEntity`] 的实体
//! - **行映射** (`rows.rs`)：网关、设备、数据点、数据记录的列定义与行解码
//!
//! ## 数据库模式要求
//!
//! 见 `migrations/001_collection.sql`：
//! - `gateways`：网关表（gateway_id, tenant_id, name, protocol_type, status, device_count ...）
//! - `devices`：设备表（device_id, tenant_id, gateway_id, name, status, last_reported_at_ms ...）
//! - `data_points`：数据点表（data_point_id, tenant_id, device_id, data_type, sampling_interval_secs ...）
//! - `data_records`：数据记录表，唯一索引 (tenant_id, device_id, data_point_id, reported_at_ms)
//!
//! ## 错误处理
//!
//! - `sqlx::Error` 自动转换为 `StorageError`
//! - 唯一约束冲突（23505）归类为 `DuplicateKey`
//! - 连接/连接池错误归类为 `Unavailable`

pub mod repository;
pub mod rows;

pub use repository::*;
pub use rows::*;
