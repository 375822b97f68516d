//! Windows backend using the Service Control Manager (SCM) API

use std::mem;

use windows::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_SERVICE_DOES_NOT_EXIST,
};
use windows::Win32::System::Services::{
    CloseServiceHandle, ControlService, OpenSCManagerW, OpenServiceW,
    QueryServiceStatusEx, SC_HANDLE, SC_MANAGER_CONNECT,
    SC_STATUS_PROCESS_INFO, SERVICE_CONTROL_STOP, SERVICE_CONTINUE_PENDING,
    SERVICE_PAUSE_PENDING, SERVICE_PAUSED, SERVICE_QUERY_STATUS,
    SERVICE_RUNNING, SERVICE_START, SERVICE_START_PENDING, SERVICE_STATUS,
    SERVICE_STATUS_PROCESS, SERVICE_STOP, SERVICE_STOP_PENDING,
    SERVICE_STOPPED,
};
use windows::core::{HRESULT, PCWSTR};

use super::{ControlError, ServiceControl};
use crate::status::ServiceStatus;

/// RAII wrapper for SC_HANDLE (Service Control Manager handle)
struct ScManagerHandle(SC_HANDLE);

impl ScManagerHandle {
    fn connect() -> Result<Self, ControlError> {
        let handle = unsafe {
            OpenSCManagerW(PCWSTR::null(), PCWSTR::null(), SC_MANAGER_CONNECT.0)
        };

        if handle.is_invalid() {
            return Err(classify(windows::core::Error::from_win32(), ""));
        }

        Ok(ScManagerHandle(handle))
    }

    fn handle(&self) -> SC_HANDLE {
        self.0
    }
}

impl Drop for ScManagerHandle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = CloseServiceHandle(self.0);
            }
        }
    }
}

/// RAII wrapper for SC_HANDLE (Service handle)
struct ServiceHandle(SC_HANDLE);

impl ServiceHandle {
    fn handle(&self) -> SC_HANDLE {
        self.0
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = CloseServiceHandle(self.0);
            }
        }
    }
}

pub struct PlatformControl {
    service_name: String,
}

impl PlatformControl {
    pub fn new(name: &str) -> Self {
        Self {
            service_name: name.to_string(),
        }
    }

    /// Open the named service with the given access rights.
    fn open_service(
        &self,
        sc_manager: &ScManagerHandle,
        access: u32,
    ) -> Result<ServiceHandle, ControlError> {
        let wide: Vec<u16> =
            self.service_name.encode_utf16().chain(Some(0)).collect();

        let handle = unsafe {
            OpenServiceW(sc_manager.handle(), PCWSTR(wide.as_ptr()), access)
        };

        if handle.is_invalid() {
            return Err(classify(
                windows::core::Error::from_win32(),
                &self.service_name,
            ));
        }

        Ok(ServiceHandle(handle))
    }
}

impl ServiceControl for PlatformControl {
    fn query_status(&self) -> Result<ServiceStatus, ControlError> {
        let sc_manager = ScManagerHandle::connect()?;
        let service =
            self.open_service(&sc_manager, SERVICE_QUERY_STATUS.0)?;

        let mut status: SERVICE_STATUS_PROCESS = unsafe { mem::zeroed() };
        let mut bytes_needed: u32 = 0;

        unsafe {
            QueryServiceStatusEx(
                service.handle(),
                SC_STATUS_PROCESS_INFO,
                Some(&mut status as *mut _ as *mut u8),
                mem::size_of::<SERVICE_STATUS_PROCESS>() as u32,
                &mut bytes_needed,
            )
        }
        .map_err(|e| classify(e, &self.service_name))?;

        Ok(map_state(status.dwCurrentState))
    }

    fn start(&self) -> Result<(), ControlError> {
        let sc_manager = ScManagerHandle::connect()?;
        let service = self.open_service(&sc_manager, SERVICE_START.0)?;

        unsafe { StartServiceW(service.handle(), None) }
            .map_err(|e| classify(e, &self.service_name))?;

        Ok(())
    }

    fn stop(&self) -> Result<(), ControlError> {
        let sc_manager = ScManagerHandle::connect()?;
        let service = self.open_service(&sc_manager, SERVICE_STOP.0)?;

        let mut status: SERVICE_STATUS = unsafe { mem::zeroed() };

        unsafe {
            ControlService(service.handle(), SERVICE_CONTROL_STOP, &mut status)
        }
        .map_err(|e| classify(e, &self.service_name))?;

        Ok(())
    }
}

/// Map dwCurrentState onto the shared status enum.
fn map_state(state: u32) -> ServiceStatus {
    match state {
        s if s == SERVICE_STOPPED.0 => ServiceStatus::Stopped,
        s if s == SERVICE_START_PENDING.0 => ServiceStatus::StartPending,
        s if s == SERVICE_STOP_PENDING.0 => ServiceStatus::StopPending,
        s if s == SERVICE_RUNNING.0 => ServiceStatus::Running,
        s if s == SERVICE_CONTINUE_PENDING.0 => ServiceStatus::ContinuePending,
        s if s == SERVICE_PAUSE_PENDING.0 => ServiceStatus::PausePending,
        s if s == SERVICE_PAUSED.0 => ServiceStatus::Paused,
        other => ServiceStatus::Unknown(format!("service state {other}")),
    }
}

fn classify(err: windows::core::Error, name: &str) -> ControlError {
    if err.code() == HRESULT::from_win32(ERROR_SERVICE_DOES_NOT_EXIST.0) {
        ControlError::NotFound(name.to_string())
    } else if err.code() == HRESULT::from_win32(ERROR_ACCESS_DENIED.0) {
        ControlError::AccessDenied(err.message())
    } else {
        ControlError::Os(err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_documented_scm_states() {
        assert_eq!(map_state(1), ServiceStatus::Stopped);
        assert_eq!(map_state(2), ServiceStatus::StartPending);
        assert_eq!(map_state(3), ServiceStatus::StopPending);
        assert_eq!(map_state(4), ServiceStatus::Running);
        assert_eq!(map_state(5), ServiceStatus::ContinuePending);
        assert_eq!(map_state(6), ServiceStatus::PausePending);
        assert_eq!(map_state(7), ServiceStatus::Paused);
    }

    #[test]
    fn unexpected_state_becomes_unknown() {
        assert_eq!(
            map_state(42),
            ServiceStatus::Unknown("service state 42".into())
        );
    }
}
