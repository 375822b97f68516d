//! macOS backend using launchd (launchctl)
//!
//! A panel must not load or unload the job, so start/stop use
//! kickstart/kill against the already-registered label, with the
//! legacy start/stop verbs as fallback for older launchctl builds.

use std::process::Command;

use super::{ControlError, ServiceControl};
use crate::status::ServiceStatus;

pub struct PlatformControl {
    label: String,
}

impl PlatformControl {
    pub fn new(name: &str) -> Self {
        Self {
            label: name.to_string(),
        }
    }

    fn target(&self) -> String {
        format!("system/{}", self.label)
    }

    fn launchctl(&self, args: &[&str]) -> Result<std::process::Output, ControlError> {
        Command::new("launchctl").args(args).output().map_err(|e| {
            ControlError::Os(format!("failed to execute launchctl: {e}"))
        })
    }
}

impl ServiceControl for PlatformControl {
    fn query_status(&self) -> Result<ServiceStatus, ControlError> {
        let output = self.launchctl(&["list", &self.label])?;

        // launchctl list exits non-zero when the label is not loaded.
        if !output.status.success() {
            return Err(ControlError::NotFound(self.label.clone()));
        }

        // Output format: "PID\tStatus\tLabel"; a PID of "-" means the
        // job is loaded but not running.
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            if line.contains(&self.label) {
                let mut parts = line.split_whitespace();
                if let Some(pid) = parts.next() {
                    return Ok(if pid == "-" {
                        ServiceStatus::Stopped
                    } else {
                        ServiceStatus::Running
                    });
                }
            }
        }

        Ok(ServiceStatus::Stopped)
    }

    fn start(&self) -> Result<(), ControlError> {
        let target = self.target();
        let output = self.launchctl(&["kickstart", &target])?;

        if !output.status.success() {
            // Fallback to the legacy start verb
            let legacy = self.launchctl(&["start", &self.label])?;
            if !legacy.status.success() {
                return Err(classify_failure(
                    &self.label,
                    String::from_utf8_lossy(&legacy.stderr).trim(),
                ));
            }
        }

        Ok(())
    }

    fn stop(&self) -> Result<(), ControlError> {
        let target = self.target();
        let output = self.launchctl(&["kill", "SIGTERM", &target])?;

        if !output.status.success() {
            // Fallback to the legacy stop verb
            let legacy = self.launchctl(&["stop", &self.label])?;
            if !legacy.status.success() {
                return Err(classify_failure(
                    &self.label,
                    String::from_utf8_lossy(&legacy.stderr).trim(),
                ));
            }
        }

        Ok(())
    }
}

fn classify_failure(label: &str, stderr: &str) -> ControlError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("could not find") || lower.contains("no such process") {
        ControlError::NotFound(label.to_string())
    } else if lower.contains("not privileged") || lower.contains("operation not permitted") {
        ControlError::AccessDenied(stderr.to_string())
    } else {
        ControlError::Os(stderr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_label_classifies_as_not_found() {
        let err = classify_failure(
            "com.example.svc",
            "Could not find service \"com.example.svc\" in domain for system",
        );
        assert!(matches!(err, ControlError::NotFound(_)));
    }

    #[test]
    fn privilege_refusal_classifies_as_access_denied() {
        let err = classify_failure("com.example.svc", "Not privileged to signal service.");
        assert!(matches!(err, ControlError::AccessDenied(_)));
    }
}
