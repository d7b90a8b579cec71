//! メッセージの間引き配信
//!
//! まとめて届いたメッセージを一定時間に分散して配信する。
//! 件数が多いページは `window` 全体に分散し、件数が少ないページでも
//! 1件あたり `min_per_item` より速くは配信しない。

use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::config::PollerConfig;

/// 配信ペース
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// 1ページを配信しきる目標時間
    pub window: Duration,
    /// 1件あたりの最小間隔
    pub min_per_item: Duration,
}

impl Pacing {
    pub fn new(window: Duration, min_per_item: Duration) -> Self {
        Self {
            window,
            min_per_item,
        }
    }

    /// `count` 件を配信する際の1件あたりの間隔
    ///
    /// `max(window / count, min_per_item)`（ミリ秒単位で切り捨て）
    pub fn per_item_delay(&self, count: usize) -> Duration {
        if count == 0 {
            return self.min_per_item;
        }
        let window_ms = self.window.as_millis() as u64;
        Duration::from_millis(window_ms / count as u64).max(self.min_per_item)
    }
}

impl From<&PollerConfig> for Pacing {
    fn from(config: &PollerConfig) -> Self {
        Self::new(config.pacing_window, config.min_per_item_delay)
    }
}

/// 間引き配信の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacedDelivery {
    /// 配信に要した時間
    pub elapsed: Duration,
    /// 途中で打ち切られずに最後まで配信したか
    pub completed: bool,
}

/// 要素を1件ずつ一定間隔で `consumer` に渡す
///
/// 各要素を渡した後に間隔分待機するため、`n` 件の配信には
/// `n * per_item_delay` かかる。`consumer` が `ControlFlow::Break` を返すと
/// 待機せずに即座に打ち切る。
pub async fn deliver_paced<I, F>(items: I, pacing: Pacing, mut consumer: F) -> PacedDelivery
where
    I: IntoIterator,
    I::IntoIter: ExactSizeIterator,
    F: FnMut(I::Item) -> ControlFlow<()>,
{
    let items = items.into_iter();
    let delay = pacing.per_item_delay(items.len());
    let started = Instant::now();

    log::debug!(
        "Delivering {} items at {}ms intervals",
        items.len(),
        delay.as_millis()
    );

    for item in items {
        if consumer(item).is_break() {
            return PacedDelivery {
                elapsed: started.elapsed(),
                completed: false,
            };
        }
        sleep(delay).await;
    }

    PacedDelivery {
        elapsed: started.elapsed(),
        completed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 仮想時間のタイマー丸め（1ms単位）を許容して比較
    fn assert_near(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff <= Duration::from_millis(5),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn default_pacing() -> Pacing {
        Pacing::new(Duration::from_secs(10), Duration::from_millis(256))
    }

    #[test]
    fn test_per_item_delay() {
        let pacing = default_pacing();

        // 大量のメッセージは10秒に分散
        assert_eq!(pacing.per_item_delay(100), Duration::from_millis(256));
        assert_eq!(pacing.per_item_delay(20), Duration::from_millis(500));
        assert_eq!(pacing.per_item_delay(4), Duration::from_millis(2500));
        // 最小間隔より短くはならない
        assert_eq!(pacing.per_item_delay(1000), Duration::from_millis(256));
        assert_eq!(pacing.per_item_delay(0), Duration::from_millis(256));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_spreads_over_window() {
        let mut received = Vec::new();

        let result = deliver_paced(vec![1, 2, 3, 4], default_pacing(), |n| {
            received.push(n);
            ControlFlow::Continue(())
        })
        .await;

        assert_eq!(received, vec![1, 2, 3, 4]);
        assert!(result.completed);
        assert_near(result.elapsed, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_page_uses_floor_rate() {
        let pacing = Pacing::new(Duration::from_millis(100), Duration::from_millis(256));
        let result = deliver_paced(vec!["a", "b"], pacing, |_| ControlFlow::Continue(())).await;

        // min(window, n * floor) 以上かかる
        assert!(result.elapsed >= Duration::from_millis(100));
        assert_near(result.elapsed, Duration::from_millis(512));
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_are_spaced_in_order() {
        let start = Instant::now();
        let mut timestamps = Vec::new();

        deliver_paced(vec!["a", "b", "c"], default_pacing(), |item| {
            timestamps.push((item, start.elapsed()));
            ControlFlow::Continue(())
        })
        .await;

        // 10000 / 3 = 3333ms 間隔
        let order: Vec<&str> = timestamps.iter().map(|(item, _)| *item).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(timestamps[0].1, Duration::ZERO);
        assert_near(timestamps[1].1, Duration::from_millis(3333));
        assert_near(timestamps[2].1, Duration::from_millis(6666));
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_stops_early() {
        let mut received = Vec::new();

        let result = deliver_paced(vec![1, 2, 3, 4, 5], default_pacing(), |n| {
            if n == 3 {
                return ControlFlow::Break(());
            }
            received.push(n);
            ControlFlow::Continue(())
        })
        .await;

        assert_eq!(received, vec![1, 2]);
        assert!(!result.completed);
        // 1件目・2件目の後の待機分のみ
        assert_near(result.elapsed, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_sequence() {
        let result = deliver_paced(Vec::<u32>::new(), default_pacing(), |_| {
            ControlFlow::Continue(())
        })
        .await;

        assert!(result.completed);
        assert_eq!(result.elapsed, Duration::ZERO);
    }
}
