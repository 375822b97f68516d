//! Service control backends - delegate to the OS-native service manager
//!
//! Provides a unified seam over the platform service managers:
//! - Windows: Service Control Manager (Windows API)
//! - Linux: systemd (systemctl)
//! - macOS: launchd (launchctl)
//!
//! Everything above this module (probe, lifecycle controller, CLI)
//! talks to the [`ServiceControl`] trait only, so tests can substitute
//! a scripted fake for the real service manager.

use std::sync::Arc;

use thiserror::Error;

use crate::status::ServiceStatus;

// Platform-specific implementations
cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        mod windows_control;
        use windows_control as platform;
    } else if #[cfg(target_os = "linux")] {
        mod systemd_control;
        use systemd_control as platform;
    } else if #[cfg(target_os = "macos")] {
        mod launchd_control;
        use launchd_control as platform;
    }
}

/// Failure reported by the OS service manager. Message text is passed
/// through verbatim so the operator sees what the OS said.
#[derive(Debug, Clone, Error)]
pub enum ControlError {
    #[error("service '{0}' was not found")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("{0}")]
    Os(String),
}

/// One named service as seen by the OS service manager.
///
/// Implementations are stateless per call: every operation opens the
/// service fresh and closes it before returning, so the trait is safe
/// to use concurrently from the polling loop and an in-flight
/// lifecycle operation.
pub trait ServiceControl: Send + Sync {
    /// Read the current run state.
    fn query_status(&self) -> Result<ServiceStatus, ControlError>;

    /// Ask the OS to start the service. Returns as soon as the request
    /// is accepted; reaching `Running` is the caller's wait.
    fn start(&self) -> Result<(), ControlError>;

    /// Ask the OS to stop the service. Returns as soon as the request
    /// is accepted; reaching `Stopped` is the caller's wait.
    fn stop(&self) -> Result<(), ControlError>;
}

/// Backend for the named service on the current platform.
pub fn for_service(name: &str) -> Arc<dyn ServiceControl> {
    Arc::new(platform::PlatformControl::new(name))
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted service-manager double used across the crate's tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use super::{ControlError, ServiceControl};
    use crate::status::ServiceStatus;

    #[derive(Default)]
    struct Script {
        settle_after: Option<Duration>,
        fail_start: Option<ControlError>,
        fail_stop: Option<ControlError>,
        query_delay: Option<Duration>,
    }

    /// Fake service manager with call counters, scripted transition
    /// delays and failure injection.
    pub(crate) struct FakeControl {
        script: Mutex<Script>,
        status: Arc<Mutex<Result<ServiceStatus, ControlError>>>,
        pub query_calls: AtomicUsize,
        pub start_calls: AtomicUsize,
        pub stop_calls: AtomicUsize,
        ops: Mutex<Vec<&'static str>>,
    }

    impl FakeControl {
        pub fn new(initial: ServiceStatus) -> Self {
            Self {
                script: Mutex::new(Script::default()),
                status: Arc::new(Mutex::new(Ok(initial))),
                query_calls: AtomicUsize::new(0),
                start_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
                ops: Mutex::new(Vec::new()),
            }
        }

        /// A service the OS does not know about.
        pub fn missing(name: &str) -> Self {
            let fake = Self::new(ServiceStatus::Stopped);
            *fake.status.lock().unwrap() =
                Err(ControlError::NotFound(name.to_string()));
            fake
        }

        /// Reach the terminal state this long after start()/stop() is
        /// accepted. Without this the service stays pending forever.
        pub fn settle_after(self, delay: Duration) -> Self {
            self.script.lock().unwrap().settle_after = Some(delay);
            self
        }

        pub fn fail_stop_with(self, err: ControlError) -> Self {
            self.script.lock().unwrap().fail_stop = Some(err);
            self
        }

        pub fn fail_start_with(self, err: ControlError) -> Self {
            self.script.lock().unwrap().fail_start = Some(err);
            self
        }

        /// Make every status query block, to exercise ceiling guards.
        pub fn query_delay(self, delay: Duration) -> Self {
            self.script.lock().unwrap().query_delay = Some(delay);
            self
        }

        pub fn recorded_ops(&self) -> Vec<&'static str> {
            self.ops.lock().unwrap().clone()
        }

        fn transition(&self, pending: ServiceStatus, terminal: ServiceStatus) {
            *self.status.lock().unwrap() = Ok(pending);
            if let Some(delay) = self.script.lock().unwrap().settle_after {
                let status = Arc::clone(&self.status);
                thread::spawn(move || {
                    thread::sleep(delay);
                    *status.lock().unwrap() = Ok(terminal);
                });
            }
        }
    }

    impl ServiceControl for FakeControl {
        fn query_status(&self) -> Result<ServiceStatus, ControlError> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.script.lock().unwrap().query_delay {
                thread::sleep(delay);
            }
            self.status.lock().unwrap().clone()
        }

        fn start(&self) -> Result<(), ControlError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            self.ops.lock().unwrap().push("start");
            if let Some(err) = self.script.lock().unwrap().fail_start.clone() {
                return Err(err);
            }
            self.transition(ServiceStatus::StartPending, ServiceStatus::Running);
            Ok(())
        }

        fn stop(&self) -> Result<(), ControlError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.ops.lock().unwrap().push("stop");
            if let Some(err) = self.script.lock().unwrap().fail_stop.clone() {
                return Err(err);
            }
            self.transition(ServiceStatus::StopPending, ServiceStatus::Stopped);
            Ok(())
        }
    }
}
