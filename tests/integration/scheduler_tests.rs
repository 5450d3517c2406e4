//! Integration tests for the task scheduler on a multi-threaded runtime

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sumi_spider::crawler::{map_bounded, TaskScheduler};
use sumi_spider::SpiderError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_limit_holds_across_worker_threads() {
    let scheduler = TaskScheduler::new(3);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..24 {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        scheduler.submit(async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });
    }

    scheduler.wait_drained().await;

    assert!(peak.load(Ordering::SeqCst) <= 3);
    let stats = scheduler.stats();
    assert_eq!(stats.started, 24);
    assert_eq!(stats.succeeded, 24);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_recursive_fan_out_drains_once() {
    fn spawn_tree(scheduler: TaskScheduler, depth: u32, visited: Arc<AtomicUsize>) {
        let inner = scheduler.clone();
        scheduler.submit(async move {
            visited.fetch_add(1, Ordering::SeqCst);
            if depth > 0 {
                for _ in 0..3 {
                    spawn_tree(inner.clone(), depth - 1, Arc::clone(&visited));
                }
            }
            Ok::<(), SpiderError>(())
        });
    }

    let scheduler = TaskScheduler::new(2);
    let visited = Arc::new(AtomicUsize::new(0));

    spawn_tree(scheduler.clone(), 3, Arc::clone(&visited));
    scheduler.wait_drained().await;

    // 1 + 3 + 9 + 27 nodes
    assert_eq!(visited.load(Ordering::SeqCst), 40);
    assert_eq!(scheduler.stats().total, 40);
    assert!(scheduler.is_idle());
}

#[tokio::test]
async fn test_map_bounded_with_failures() {
    let result = map_bounded(["a", "b", "c"], 2, |item| async move {
        if item == "b" {
            Err(SpiderError::Setup(format!("{} is broken", item)))
        } else {
            Ok(item.len())
        }
    })
    .await;

    assert!(matches!(result, Err(SpiderError::Setup(ref m)) if m == "b is broken"));
}
