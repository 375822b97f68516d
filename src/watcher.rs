//! Background polling loop feeding snapshots to observers.
//!
//! One long-lived thread polls the probe at a fixed interval and
//! publishes each snapshot on a bounded channel. The loop shares
//! nothing with the controller's synchronization, so transitional
//! states keep flowing to the display while a start/stop/restart is
//! underway.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, TrySendError, bounded, tick};
use log::debug;

use crate::cancel::CancelToken;
use crate::probe::ServiceProbe;
use crate::status::ServiceSnapshot;

/// Snapshot bus size - small fixed size; a slow observer drops
/// refreshes rather than stalling the loop.
const BUS_BOUND: usize = 64;

/// Handle to the polling loop. Dropping it without `stop()` leaves the
/// thread running until the receiver disconnects.
pub struct StatusWatcher {
    snapshots: Receiver<ServiceSnapshot>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl StatusWatcher {
    /// Spawn the loop. The first snapshot is published immediately so
    /// observers are not blank for a full interval.
    pub fn spawn(
        probe: ServiceProbe,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let cancel = CancelToken::new();
        let (tx, rx) = bounded(BUS_BOUND);
        let loop_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("svc-watch".into())
            .spawn(move || {
                if tx.send(probe.snapshot()).is_err() {
                    return;
                }

                let ticker = tick(interval);
                loop {
                    if ticker.recv().is_err() || loop_cancel.is_cancelled() {
                        break;
                    }
                    match tx.try_send(probe.snapshot()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            debug!("snapshot bus full, refresh dropped");
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
            })?;

        Ok(Self {
            snapshots: rx,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn snapshots(&self) -> &Receiver<ServiceSnapshot> {
        &self.snapshots
    }

    /// End the loop and join the thread. Returns within roughly one
    /// interval.
    pub fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::control::fake::FakeControl;
    use crate::status::ServiceStatus;

    #[test]
    fn publishes_fresh_snapshots_at_interval() {
        let fake = Arc::new(FakeControl::new(ServiceStatus::Running));
        let probe = ServiceProbe::new("Spooler", fake);
        let watcher =
            StatusWatcher::spawn(probe, Duration::from_millis(10)).unwrap();

        let mut seen = 0;
        for _ in 0..3 {
            let snap = watcher
                .snapshots()
                .recv_timeout(Duration::from_secs(2))
                .expect("watcher stopped publishing");
            assert_eq!(snap.status, Some(ServiceStatus::Running));
            seen += 1;
        }
        assert_eq!(seen, 3);

        watcher.stop();
    }

    #[test]
    fn missing_service_still_produces_snapshots() {
        let fake = Arc::new(FakeControl::missing("ghost"));
        let probe = ServiceProbe::new("ghost", fake);
        let watcher =
            StatusWatcher::spawn(probe, Duration::from_millis(10)).unwrap();

        let snap = watcher
            .snapshots()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert!(!snap.exists);
        assert_eq!(snap.status, None);

        watcher.stop();
    }
}
