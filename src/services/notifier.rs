//! Post-import refresh signal
//!
//! Imports tell interested views to re-fetch once they finish. Signals are
//! best effort: nothing here can fail an import.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

/// Fire-and-forget "data changed" signal
pub trait RefreshNotifier: Send + Sync {
    fn notify(&self);
}

/// Notifier that does nothing (CLI runs, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl RefreshNotifier for NoopNotifier {
    fn notify(&self) {}
}

/// Destination of a debounced refresh
#[async_trait]
pub trait RefreshSink: Send + Sync {
    async fn refresh(&self) -> anyhow::Result<()>;
}

/// Coalesces bursts of signals into one sink call.
///
/// The first signal arms a fixed delay. Signals arriving while it is armed
/// join that pending refresh, so a steady stream still refreshes once per
/// delay.
pub struct DebouncedRefresh {
    sink: Arc<dyn RefreshSink>,
    delay: Duration,
    pending: Arc<AtomicBool>,
}

impl DebouncedRefresh {
    pub fn new(sink: Arc<dyn RefreshSink>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl RefreshNotifier for DebouncedRefresh {
    fn notify(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("Refresh signal dropped: no async runtime");
            return;
        };
        if self.pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let pending = self.pending.clone();
        let sink = self.sink.clone();
        let delay = self.delay;

        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // signals from here on arm the next refresh
            pending.store(false, Ordering::SeqCst);
            debug!("Sending refresh signal");
            if let Err(e) = sink.refresh().await {
                warn!("Refresh signal failed: {:#}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingSink {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RefreshSink for RecordingSink {
        async fn refresh(&self) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("sink down");
            }
            Ok(())
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_signal_fires_after_delay() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = DebouncedRefresh::new(sink.clone(), ms(400));

        notifier.notify();
        tokio::time::sleep(ms(350)).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(ms(100)).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = DebouncedRefresh::new(sink.clone(), ms(400));

        notifier.notify();
        tokio::time::sleep(ms(200)).await;
        notifier.notify();
        tokio::time::sleep(ms(100)).await;
        notifier.notify();

        // delay counts from the first signal
        tokio::time::sleep(ms(50)).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(ms(100)).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(ms(500)).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_stream_still_refreshes() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = DebouncedRefresh::new(sink.clone(), ms(400));

        // signals at 0, 300, ..., 2700; refreshes at 400, 1000, 1600, 2200, 2800
        for _ in 0..10 {
            notifier.notify();
            tokio::time::sleep(ms(300)).await;
        }
        tokio::time::sleep(ms(500)).await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = DebouncedRefresh::new(sink.clone(), ms(400));

        notifier.notify();
        tokio::time::sleep(ms(500)).await;
        notifier.notify();
        tokio::time::sleep(ms(500)).await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let notifier = DebouncedRefresh::new(sink.clone(), ms(10));

        notifier.notify();
        tokio::time::sleep(ms(50)).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notify_outside_runtime_is_dropped() {
        let sink = Arc::new(RecordingSink::default());
        DebouncedRefresh::new(sink.clone(), ms(10)).notify();
        NoopNotifier.notify();
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }
}
