//! 固定大小的设备工作者池
//!
//! N 个工作者共享一个工作队列，各自累积 `(序号, 结果)` 的部分结果，
//! 全部结束后合并返回；排序与归并交给 [`crate::summary::RunSummary`]。

use crate::error::CollectError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// 以至多 `workers` 个并发工作者处理 `items`。
///
/// - 取消后工作者不再领取新条目；进行中的条目返回 `None` 时不计入结果
/// - 任一条目返回错误时取消其余工作者并返回该错误
pub(crate) async fn run_pool<T, O, F, Fut>(
    items: Vec<(u64, T)>,
    workers: usize,
    cancel: &CancellationToken,
    work: F,
) -> Result<Vec<(u64, O)>, CollectError>
where
    T: Send + 'static,
    O: Send + 'static,
    F: Fn(T, CancellationToken) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<Option<O>, CollectError>> + Send + 'static,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, items.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(items)));
    let pool_cancel = cancel.child_token();

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let queue = queue.clone();
        let cancel = pool_cancel.clone();
        let work = work.clone();
        set.spawn(async move {
            let mut partial = Vec::new();
            while !cancel.is_cancelled() {
                let next = queue.lock().await.pop_front();
                let Some((ordinal, item)) = next else {
                    break;
                };
                match work(item, cancel.clone()).await {
                    Ok(Some(outcome)) => partial.push((ordinal, outcome)),
                    Ok(None) => {}
                    Err(err) => return Err(err),
                }
            }
            Ok(partial)
        });
    }

    let mut merged = Vec::new();
    while let Some(joined) = set.join_next().await {
        let partial = match joined {
            Ok(Ok(partial)) => partial,
            Ok(Err(err)) => {
                pool_cancel.cancel();
                set.abort_all();
                return Err(err);
            }
            Err(err) => {
                pool_cancel.cancel();
                set.abort_all();
                return Err(CollectError::Worker(err.to_string()));
            }
        };
        merged.extend(partial);
    }
    Ok(merged)
}
