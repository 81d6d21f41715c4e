use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use super::key::DependencyKey;
use crate::errors::{ContainerError, Result};

/// 在 `timeout` 内驱动 `call` 完成
///
/// 超时后丢弃调用的 future，工厂在下一个 await 点被取消。
/// 从不让出的阻塞代码无法被中断。
pub(crate) async fn guarded<F>(key: &DependencyKey, timeout: Duration, call: F) -> Result<F::Output>
where
    F: Future,
{
    let started = Instant::now();

    match tokio::time::timeout(timeout, call).await {
        Ok(output) => {
            trace!(key = %key, elapsed_ms = started.elapsed().as_millis(), "factory call completed");
            Ok(output)
        }
        Err(_) => {
            warn!(key = %key, timeout_ms = timeout.as_millis(), "{key} call timed out");
            Err(ContainerError::Timeout {
                key: key.clone(),
                timeout,
            })
        }
    }
}
