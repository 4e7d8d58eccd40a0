use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// バッチ単位の実行結果
#[derive(Debug)]
pub struct ScheduleRun<T> {
    /// 完了したタスクの結果（順序は保証しない）
    pub outputs: Vec<T>,
    /// キャンセルにより残りのタスクを投入しなかったか
    pub cancelled: bool,
}

/// 作業リストを `batch_size` 件ずつ並行に処理するスケジューラー
///
/// バッチ内のタスクは独立に並行実行され、バッチ全体の完了を待ってから
/// 次のバッチを取り出す。キャンセルはバッチの前と各タスクの投入前に確認する。
#[derive(Debug, Clone, Copy)]
pub struct ParseScheduler {
    batch_size: usize,
}

impl ParseScheduler {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn run<T, F, Fut>(
        &self,
        tasks: Vec<T>,
        cancel: &CancellationToken,
        work: F,
    ) -> ScheduleRun<Fut::Output>
    where
        F: Fn(T) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let mut outputs = Vec::with_capacity(tasks.len());
        let mut pending = tasks.into_iter().peekable();
        let mut batch_no = 0usize;

        while pending.peek().is_some() {
            if cancel.is_cancelled() {
                return ScheduleRun {
                    outputs,
                    cancelled: true,
                };
            }

            let mut set = JoinSet::new();
            let mut cancelled = false;
            for task in pending.by_ref().take(self.batch_size) {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                set.spawn(work(task));
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(output) => outputs.push(output),
                    Err(e) => warn!("Parse task failed: {}", e),
                }
            }

            batch_no += 1;
            debug!("Batch {} done ({} results so far)", batch_no, outputs.len());

            if cancelled {
                return ScheduleRun {
                    outputs,
                    cancelled: true,
                };
            }
        }

        ScheduleRun {
            outputs,
            cancelled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_runs_every_task() {
        let scheduler = ParseScheduler::new(3);
        let cancel = CancellationToken::new();
        let run = scheduler
            .run((0..10).collect(), &cancel, |n: usize| async move { n * 2 })
            .await;

        let mut outputs = run.outputs;
        outputs.sort();
        assert!(!run.cancelled);
        assert_eq!(outputs, (0..10).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_batches_are_bounded() {
        let scheduler = ParseScheduler::new(2);
        let cancel = CancellationToken::new();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let run = scheduler
            .run((0..7).collect(), &cancel, |_: usize| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(run.outputs.len(), 7);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_batches() {
        let scheduler = ParseScheduler::new(2);
        let cancel = CancellationToken::new();
        let started = Arc::new(AtomicUsize::new(0));

        let run = scheduler
            .run((0..10).collect(), &cancel, |_: usize| {
                let started = Arc::clone(&started);
                let cancel = cancel.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    cancel.cancel();
                }
            })
            .await;

        assert!(run.cancelled);
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(run.outputs.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let scheduler = ParseScheduler::new(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let run = scheduler
            .run(vec![1, 2, 3], &cancel, |n: i32| async move { n })
            .await;
        assert!(run.cancelled);
        assert!(run.outputs.is_empty());
    }
}
