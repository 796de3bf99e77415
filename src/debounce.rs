// Search-box debouncing: only the last keystroke of a burst gets through,
// once the input has been quiet for the full period.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(350);

pub struct Debouncer {
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            quiet,
            pending: None,
            tx,
            rx,
        }
    }

    /// Restart the quiet period with `text` as the candidate value.
    /// Must be called from within a tokio runtime.
    pub fn keystroke(&mut self, text: impl Into<String>) {
        self.cancel();
        let text = text.into();
        let tx = self.tx.clone();
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            // Receiver gone means the debouncer was dropped
            let _ = tx.send(text);
        }));
    }

    /// Forget any pending value without delivering it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                debug!("Search timer superseded");
            }
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the next value that survived its quiet period.
    pub async fn settled(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Debouncer::settled`].
    pub fn try_settled(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_value_of_burst_is_delivered() {
        let mut debouncer = Debouncer::new(DEFAULT_QUIET_PERIOD);
        debouncer.keystroke("u");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.keystroke("up");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.keystroke("upd");

        // 349ms after the last keystroke: nothing yet
        tokio::time::sleep(Duration::from_millis(349)).await;
        assert_eq!(debouncer.try_settled(), None);

        assert_eq!(debouncer.settled().await.as_deref(), Some("upd"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(debouncer.try_settled(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_each_deliver() {
        let mut debouncer = Debouncer::new(Duration::from_millis(350));
        debouncer.keystroke("imsi");
        assert_eq!(debouncer.settled().await.as_deref(), Some("imsi"));
        debouncer.keystroke("msisdn");
        assert_eq!(debouncer.settled().await.as_deref(), Some("msisdn"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let mut debouncer = Debouncer::new(Duration::from_millis(350));
        debouncer.keystroke("abc");
        assert!(debouncer.is_pending());
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(debouncer.try_settled(), None);
        assert!(!debouncer.is_pending());
    }
}
