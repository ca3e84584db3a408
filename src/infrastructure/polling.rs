//! 有界轮询原语
//!
//! 立即探测一次，未就绪则按固定间隔重试，最多 `max_attempts` 次。

use std::{future::Future, time::Duration};

/// 轮询直到 `probe` 返回 Some，或尝试次数耗尽返回 None
///
/// `max_attempts` 包含首次探测；为 0 时不探测直接返回 None。
pub async fn poll_for<T, F, Fut>(mut probe: F, interval: Duration, max_attempts: u32) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=max_attempts {
        if let Some(value) = probe().await {
            if attempt > 1 {
                tracing::debug!(attempt, "poll_for: probe succeeded after retries");
            }
            return Some(value);
        }
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn test_immediate_success_no_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = poll_for(
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Some(7)
                }
            },
            Duration::from_secs(60),
            50,
        )
        .await;
        assert_eq!(result, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Option<()> = poll_for(
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    None
                }
            },
            Duration::from_millis(100),
            50,
        )
        .await;
        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_appears_later() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = poll_for(
            move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    (n >= 3).then_some(n)
                }
            },
            Duration::from_millis(100),
            50,
        )
        .await;
        assert_eq!(result, Some(3));
    }

    #[tokio::test]
    async fn test_zero_attempts() {
        let result = poll_for(|| async { Some(1) }, Duration::from_millis(1), 0).await;
        assert!(result.is_none());
    }
}
