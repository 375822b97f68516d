//! Linux backend using systemd (systemctl)
//!
//! Talks to the system manager regardless of uid: status reads work
//! unprivileged, and an unprivileged start/stop surfaces the polkit
//! refusal verbatim instead of silently targeting a per-user manager.

use std::process::Command;

use super::{ControlError, ServiceControl};
use crate::status::ServiceStatus;

pub struct PlatformControl {
    service_name: String,
}

impl PlatformControl {
    pub fn new(name: &str) -> Self {
        Self {
            service_name: name.to_string(),
        }
    }

    fn unit(&self) -> String {
        // "nginx" and "nginx.service" both address the same unit.
        if self.service_name.contains('.') {
            self.service_name.clone()
        } else {
            format!("{}.service", self.service_name)
        }
    }

    fn run(&self, verb: &str) -> Result<(), ControlError> {
        let unit = self.unit();
        let output = Command::new("systemctl")
            .args([verb, &unit])
            .output()
            .map_err(|e| {
                ControlError::Os(format!("failed to execute systemctl {verb}: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&self.service_name, stderr.trim()));
        }

        Ok(())
    }
}

impl ServiceControl for PlatformControl {
    fn query_status(&self) -> Result<ServiceStatus, ControlError> {
        let unit = self.unit();
        let output = Command::new("systemctl")
            .args(["show", &unit, "--property=LoadState", "--property=ActiveState"])
            .output()
            .map_err(|e| {
                ControlError::Os(format!("failed to execute systemctl show: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&self.service_name, stderr.trim()));
        }

        parse_show_output(
            &self.service_name,
            &String::from_utf8_lossy(&output.stdout),
        )
    }

    fn start(&self) -> Result<(), ControlError> {
        self.run("start")
    }

    fn stop(&self) -> Result<(), ControlError> {
        self.run("stop")
    }
}

/// Interpret `systemctl show --property=LoadState --property=ActiveState`.
fn parse_show_output(
    name: &str,
    stdout: &str,
) -> Result<ServiceStatus, ControlError> {
    let mut load_state = None;
    let mut active_state = None;

    for line in stdout.lines() {
        if let Some(value) = line.strip_prefix("LoadState=") {
            load_state = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("ActiveState=") {
            active_state = Some(value.trim());
        }
    }

    match load_state {
        Some("not-found") => {
            return Err(ControlError::NotFound(name.to_string()));
        }
        Some(_) => {}
        None => {
            return Err(ControlError::Os(format!(
                "systemctl show returned no LoadState for '{name}'"
            )));
        }
    }

    // ActiveState values per systemd: active, inactive, activating,
    // deactivating, reloading, failed, maintenance.
    let status = match active_state {
        Some("active") => ServiceStatus::Running,
        Some("inactive") => ServiceStatus::Stopped,
        Some("activating") => ServiceStatus::StartPending,
        Some("deactivating") => ServiceStatus::StopPending,
        Some(other) => ServiceStatus::Unknown(other.to_string()),
        None => {
            return Err(ControlError::Os(format!(
                "systemctl show returned no ActiveState for '{name}'"
            )));
        }
    };

    Ok(status)
}

fn classify_failure(name: &str, stderr: &str) -> ControlError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("not found")
        || lower.contains("could not be found")
        || lower.contains("not loaded")
    {
        ControlError::NotFound(name.to_string())
    } else if lower.contains("access denied")
        || lower.contains("authentication required")
        || lower.contains("permission denied")
    {
        ControlError::AccessDenied(stderr.to_string())
    } else {
        ControlError::Os(stderr.to_string())
    }
}
