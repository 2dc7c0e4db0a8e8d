//! Background worker draining the click queue.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::domain::click_event::ClickEvent;

/// Something that consumes click events.
///
/// Implementations must swallow their own failures: the worker has nowhere
/// to report them.
#[async_trait]
pub trait ClickHandler: Send + Sync {
    async fn handle(&self, event: ClickEvent);
}

/// Processes click events until every sender is dropped.
///
/// At most `concurrency` events are handled at the same time. Once the
/// channel closes the worker waits for in-flight events and then returns, so
/// awaiting this future on shutdown drains the queue.
pub async fn run_click_worker<H>(
    mut rx: mpsc::Receiver<ClickEvent>,
    handler: Arc<H>,
    concurrency: usize,
) where
    H: ClickHandler + ?Sized + 'static,
{
    let limiter = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    while let Some(event) = rx.recv().await {
        let Ok(permit) = limiter.clone().acquire_owned().await else {
            break;
        };

        let handler = handler.clone();
        in_flight.spawn(async move {
            handler.handle(event).await;
            drop(permit);
        });

        while let Some(finished) = in_flight.try_join_next() {
            if let Err(e) = finished {
                error!("Click handler task panicked: {}", e);
            }
        }
    }

    while let Some(finished) = in_flight.join_next().await {
        if let Err(e) = finished {
            error!("Click handler task panicked: {}", e);
        }
    }

    info!("Click worker stopped, queue drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CollectingHandler {
        seen: Mutex<Vec<i64>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ClickHandler for CollectingHandler {
        async fn handle(&self, event: ClickEvent) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.seen.lock().unwrap().push(event.link_id);
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_worker_drains_queue_after_close() {
        let (tx, rx) = mpsc::channel(64);
        let handler = Arc::new(CollectingHandler::default());

        for id in 0..20 {
            tx.send(ClickEvent::new(id, None, None)).await.unwrap();
        }
        drop(tx);

        run_click_worker(rx, handler.clone(), 4).await;

        let mut seen = handler.seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_worker_respects_concurrency_limit() {
        let (tx, rx) = mpsc::channel(64);
        let handler = Arc::new(CollectingHandler::default());

        for id in 0..12 {
            tx.send(ClickEvent::new(id, None, None)).await.unwrap();
        }
        drop(tx);

        run_click_worker(rx, handler.clone(), 2).await;

        assert!(handler.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(handler.seen.lock().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_processes() {
        let (tx, rx) = mpsc::channel(4);
        let handler = Arc::new(CollectingHandler::default());

        tx.send(ClickEvent::new(1, None, None)).await.unwrap();
        drop(tx);

        run_click_worker(rx, handler.clone(), 0).await;

        assert_eq!(handler.seen.lock().unwrap().as_slice(), &[1]);
    }
}
