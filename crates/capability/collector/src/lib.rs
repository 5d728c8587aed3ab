//! # IoT Collector 模块
//!
//! 多租户遥测采集链路：定期轮询网关下的设备与数据点，经取数端口获取当前值，
//! 去重后持久化，并生成单次运行汇总。
//!
//! ## 模块说明
//!
//! - [`fetch`]：取数端口 `ValueFetcher`（具体协议由外部实现）
//! - [`orchestrator`]：`Collector::run_once`，网关顺序、设备并发的编排逻辑
//! - [`summary`]：运行结果契约与确定性归并
//! - [`alarm`]：基于数据点告警配置的判定
//! - [`scheduler`]：单飞定时调度与最新运行报告
//! - [`options`]：采集参数
//! - [`error`]：运行级与取数错误
//!
//! ## 错误语义
//!
//! - 单设备取数失败/超时：记为警告，继续处理其他设备
//! - 重复记录：计入跳过数，不是错误
//! - 普通持久化失败：放弃该设备剩余写入并记为警告
//! - 存储不可用、前置条件违例：中止整次运行

pub mod alarm;
pub mod error;
pub mod fetch;
pub mod options;
pub mod orchestrator;
mod pool;
pub mod scheduler;
pub mod summary;

pub use alarm::{AlarmVerdict, evaluate};
pub use error::{CollectError, FetchError};
pub use fetch::{CollectedValue, FetchRequest, NoopFetcher, ValueFetcher};
pub use options::CollectorOptions;
pub use orchestrator::{CANCELLED_WARNING, Collector, CollectorRepositories};
pub use scheduler::{CollectionScheduler, RunReport, RunStatus, TriggerOutcome};
pub use summary::{CollectionRunResult, DeviceOutcome, DeviceRunStatus, RunSummary};
