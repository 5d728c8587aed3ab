//! 采集参数。

use std::time::Duration;

/// 采集参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOptions {
    /// 关闭时运行直接返回全零结果
    pub enabled: bool,
    /// 列举网关/设备/数据点时的分页大小
    pub page_size: u32,
    /// 设备并发处理数
    pub max_parallelism: usize,
    /// 单次取数超时
    pub timeout: Duration,
    /// 仅采集该租户；为空表示全部租户
    pub tenant_id: Option<String>,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: 100,
            max_parallelism: 4,
            timeout: Duration::from_secs(30),
            tenant_id: None,
        }
    }
}

impl CollectorOptions {
    pub fn sanitized(mut self) -> Self {
        if self.page_size == 0 {
            self.page_size = 1;
        }
        if self.max_parallelism == 0 {
            self.max_parallelism = 1;
        }
        if self.timeout.is_zero() {
            self.timeout = Duration::from_secs(1);
        }
        if self
            .tenant_id
            .as_deref()
            .is_some_and(|tenant_id| tenant_id.trim().is_empty())
        {
            self.tenant_id = None;
        }
        self
    }
}
