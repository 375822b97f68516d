//! Service status data model shared by the probe, controller and UI.

use std::fmt;

/// Run state as reported by the OS service manager, mapped 1:1.
///
/// `Unknown` carries the raw OS value for states this enum does not
/// name, so a newer OS never turns into a hard error here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
    Paused,
    StartPending,
    StopPending,
    ContinuePending,
    PausePending,
    Unknown(String),
}

impl ServiceStatus {
    /// Terminal states are the ones lifecycle operations wait for.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceStatus::Running | ServiceStatus::Stopped)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Paused => "paused",
            ServiceStatus::StartPending => "starting",
            ServiceStatus::StopPending => "stopping",
            ServiceStatus::ContinuePending => "resuming",
            ServiceStatus::PausePending => "pausing",
            ServiceStatus::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time read of a service's existence and status.
///
/// Invariant: `exists == false ⇒ status == None` and
/// `exists == true ⇒ status == Some(_)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSnapshot {
    pub exists: bool,
    pub status: Option<ServiceStatus>,
    pub error: Option<String>,
}

impl ServiceSnapshot {
    pub fn present(status: ServiceStatus) -> Self {
        Self {
            exists: true,
            status: Some(status),
            error: None,
        }
    }

    pub fn missing(error: String) -> Self {
        Self {
            exists: false,
            status: None,
            error: Some(error),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == Some(ServiceStatus::Running)
    }
}

/// Which panel actions are currently allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSet {
    pub start: bool,
    pub stop: bool,
    pub restart: bool,
}

impl ActionSet {
    pub const NONE: ActionSet = ActionSet {
        start: false,
        stop: false,
        restart: false,
    };
}

/// Derive action enablement from the latest snapshot and the busy flag.
///
/// Recomputed from scratch on every refresh; callers must not cache or
/// diff the result.
pub fn derive_actions(snapshot: &ServiceSnapshot, busy: bool) -> ActionSet {
    if busy || !snapshot.exists {
        return ActionSet::NONE;
    }

    let status = match &snapshot.status {
        Some(s) => s,
        None => return ActionSet::NONE,
    };

    ActionSet {
        start: !matches!(
            status,
            ServiceStatus::Running | ServiceStatus::StartPending
        ),
        stop: !matches!(
            status,
            ServiceStatus::Stopped | ServiceStatus::StopPending
        ),
        restart: !matches!(
            status,
            ServiceStatus::StartPending | ServiceStatus::StopPending
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(status: ServiceStatus) -> ServiceSnapshot {
        ServiceSnapshot::present(status)
    }

    #[test]
    fn busy_disables_everything() {
        let actions = derive_actions(&snap(ServiceStatus::Running), true);
        assert_eq!(actions, ActionSet::NONE);
    }

    #[test]
    fn missing_service_disables_everything() {
        let missing = ServiceSnapshot::missing("no such service".into());
        assert_eq!(derive_actions(&missing, false), ActionSet::NONE);
    }

    #[test]
    fn running_allows_stop_and_restart() {
        let actions = derive_actions(&snap(ServiceStatus::Running), false);
        assert!(!actions.start);
        assert!(actions.stop);
        assert!(actions.restart);
    }

    #[test]
    fn stopped_allows_start_and_restart() {
        let actions = derive_actions(&snap(ServiceStatus::Stopped), false);
        assert!(actions.start);
        assert!(!actions.stop);
        assert!(actions.restart);
    }

    #[test]
    fn start_pending_only_allows_stop() {
        let actions = derive_actions(&snap(ServiceStatus::StartPending), false);
        assert!(!actions.start);
        assert!(actions.stop);
        assert!(!actions.restart);
    }

    #[test]
    fn stop_pending_only_allows_start() {
        let actions = derive_actions(&snap(ServiceStatus::StopPending), false);
        assert!(actions.start);
        assert!(!actions.stop);
        assert!(!actions.restart);
    }

    #[test]
    fn paused_allows_all() {
        let actions = derive_actions(&snap(ServiceStatus::Paused), false);
        assert!(actions.start && actions.stop && actions.restart);
    }

    #[test]
    fn unknown_status_keeps_raw_text() {
        let status = ServiceStatus::Unknown("maintenance".into());
        assert_eq!(status.to_string(), "maintenance");
        assert!(!status.is_terminal());
    }

    #[test]
    fn terminal_states() {
        assert!(ServiceStatus::Running.is_terminal());
        assert!(ServiceStatus::Stopped.is_terminal());
        assert!(!ServiceStatus::StartPending.is_terminal());
    }
}
