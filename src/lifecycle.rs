//! Lifecycle controller: the exclusive gate for mutating a service's
//! run state.
//!
//! Exactly one operation may be in flight per controller. The busy
//! flag is an atomic acquired by compare-exchange and released by an
//! RAII guard, so the controller can never be left permanently busy by
//! an error path. A second start/stop/restart that races an in-flight
//! operation is dropped silently; the caller's prior request is still
//! running.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use log::{debug, info};

use crate::cancel::CancelToken;
use crate::control::{ControlError, ServiceControl};
use crate::probe::ServiceProbe;
use crate::status::{ServiceSnapshot, ServiceStatus};

/// How often the controller re-reads status while waiting for a
/// terminal state.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Slack the bounded runner grants past the operation's own wait
/// budget before it abandons the call.
pub const COMPLETION_GRACE: Duration = Duration::from_secs(5);

/// Outcome of a lifecycle operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LifecycleError {
    #[error("service '{0}' was not found")]
    NotFound(String),
    #[error("timed out after {waited:?} waiting for service to become {target}")]
    Timeout {
        target: ServiceStatus,
        waited: Duration,
    },
    #[error("{0}")]
    OperationFailed(String),
    #[error("operation cancelled")]
    Cancelled,
}

impl From<ControlError> for LifecycleError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::NotFound(name) => LifecycleError::NotFound(name),
            other => LifecycleError::OperationFailed(other.to_string()),
        }
    }
}

/// A requested transition toward a target terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOperation {
    Start,
    Stop,
    Restart,
}

impl LifecycleOperation {
    /// Terminal state the operation drives toward.
    pub fn target(self) -> ServiceStatus {
        match self {
            LifecycleOperation::Start | LifecycleOperation::Restart => {
                ServiceStatus::Running
            }
            LifecycleOperation::Stop => ServiceStatus::Stopped,
        }
    }

    /// Worst-case wait: restart gives each leg the full timeout.
    pub fn wait_budget(self, timeout: Duration) -> Duration {
        match self {
            LifecycleOperation::Restart => timeout * 2,
            _ => timeout,
        }
    }
}

impl fmt::Display for LifecycleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleOperation::Start => "start",
            LifecycleOperation::Stop => "stop",
            LifecycleOperation::Restart => "restart",
        })
    }
}

/// Clears the busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Serialized start/stop/restart for one named service, with bounded
/// waits and cooperative cancellation.
pub struct ServiceLifecycleController {
    service_name: String,
    control: Arc<dyn ServiceControl>,
    busy: AtomicBool,
    poll_interval: Duration,
}

impl ServiceLifecycleController {
    /// Controller over the platform service manager.
    pub fn new(service_name: &str) -> Self {
        let control = crate::control::for_service(service_name);
        Self::with_control(service_name, control)
    }

    /// Controller over an explicit backend (shared with the probe, or
    /// a test double).
    pub fn with_control(
        service_name: &str,
        control: Arc<dyn ServiceControl>,
    ) -> Self {
        Self {
            service_name: service_name.to_string(),
            control,
            busy: AtomicBool::new(false),
            poll_interval: WAIT_POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether an operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Probe sharing this controller's backend, for polling loops.
    pub fn probe(&self) -> ServiceProbe {
        ServiceProbe::new(&self.service_name, Arc::clone(&self.control))
    }

    /// Non-blocking status read; never blocks behind an in-flight
    /// operation.
    pub fn snapshot(&self) -> ServiceSnapshot {
        self.probe().snapshot()
    }

    pub fn start(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), LifecycleError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!(
                "start of '{}' ignored: another operation is in flight",
                self.service_name
            );
            return Ok(());
        };
        self.start_inner(timeout, cancel)
    }

    pub fn stop(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), LifecycleError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!(
                "stop of '{}' ignored: another operation is in flight",
                self.service_name
            );
            return Ok(());
        };
        self.stop_inner(timeout, cancel)
    }

    /// Stop, then start. The legs run under one busy acquisition and
    /// each gets the full timeout; a stop failure short-circuits.
    pub fn restart(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), LifecycleError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!(
                "restart of '{}' ignored: another operation is in flight",
                self.service_name
            );
            return Ok(());
        };
        self.stop_inner(timeout, cancel)?;
        self.start_inner(timeout, cancel)
    }

    pub fn apply(
        &self,
        op: LifecycleOperation,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), LifecycleError> {
        match op {
            LifecycleOperation::Start => self.start(timeout, cancel),
            LifecycleOperation::Stop => self.stop(timeout, cancel),
            LifecycleOperation::Restart => self.restart(timeout, cancel),
        }
    }

    fn start_inner(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), LifecycleError> {
        if cancel.is_cancelled() {
            return Err(LifecycleError::Cancelled);
        }

        let status = self.control.query_status()?;
        if status == ServiceStatus::Running {
            info!("'{}' is already running", self.service_name);
            return Ok(());
        }

        if cancel.is_cancelled() {
            return Err(LifecycleError::Cancelled);
        }

        info!("starting '{}'", self.service_name);
        self.control.start()?;
        self.wait_for(ServiceStatus::Running, timeout, cancel)
    }

    fn stop_inner(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), LifecycleError> {
        if cancel.is_cancelled() {
            return Err(LifecycleError::Cancelled);
        }

        let status = self.control.query_status()?;
        if status == ServiceStatus::Stopped {
            info!("'{}' is already stopped", self.service_name);
            return Ok(());
        }

        if cancel.is_cancelled() {
            return Err(LifecycleError::Cancelled);
        }

        info!("stopping '{}'", self.service_name);
        self.control.stop()?;
        self.wait_for(ServiceStatus::Stopped, timeout, cancel)
    }

    /// Bounded poll until the service reports `target`.
    ///
    /// Cancellation is checked on every iteration; the OS transition
    /// already requested is left alone either way.
    fn wait_for(
        &self,
        target: ServiceStatus,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), LifecycleError> {
        let deadline = Instant::now() + timeout;

        loop {
            if cancel.is_cancelled() {
                return Err(LifecycleError::Cancelled);
            }

            if self.control.query_status()? == target {
                info!("'{}' reached {}", self.service_name, target);
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(LifecycleError::Timeout {
                    target,
                    waited: timeout,
                });
            }

            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

/// Caller-facing wrapper: run the operation on a background thread and
/// never wait past its budget plus `grace`, even if the underlying
/// wait misbehaves. On ceiling expiry the token is cancelled so the
/// worker unwinds at its next poll.
pub fn run_bounded(
    controller: Arc<ServiceLifecycleController>,
    op: LifecycleOperation,
    timeout: Duration,
    cancel: CancelToken,
    grace: Duration,
) -> Result<(), LifecycleError> {
    let (tx, rx) = bounded(1);
    let worker_cancel = cancel.clone();
    let worker = Arc::clone(&controller);

    thread::Builder::new()
        .name(format!("svc-{op}"))
        .spawn(move || {
            let _ = tx.send(worker.apply(op, timeout, &worker_cancel));
        })
        .map_err(|e| {
            LifecycleError::OperationFailed(format!(
                "failed to spawn worker thread: {e}"
            ))
        })?;

    let ceiling = op.wait_budget(timeout) + grace;
    match rx.recv_timeout(ceiling) {
        Ok(result) => result,
        Err(_) => {
            cancel.cancel();
            Err(LifecycleError::Timeout {
                target: op.target(),
                waited: ceiling,
            })
        }
    }
}
