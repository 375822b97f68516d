//! Elevation detection, used only to hint the operator before an
//! operation fails with access-denied. Never gates anything.

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        use std::mem;

        use windows::Win32::Foundation::{CloseHandle, HANDLE};
        use windows::Win32::Security::{
            GetTokenInformation, TOKEN_ELEVATION, TOKEN_QUERY, TokenElevation,
        };
        use windows::Win32::System::Threading::{
            GetCurrentProcess, OpenProcessToken,
        };

        /// Whether the process token is elevated. Any query failure
        /// reads as not elevated; the worst outcome is a spurious hint.
        pub fn is_elevated() -> bool {
            let mut token_handle: HANDLE = HANDLE::default();

            unsafe {
                if OpenProcessToken(
                    GetCurrentProcess(),
                    TOKEN_QUERY,
                    &mut token_handle,
                )
                .is_err()
                {
                    return false;
                }

                let mut elevation: TOKEN_ELEVATION = mem::zeroed();
                let mut return_length: u32 = 0;

                let queried = GetTokenInformation(
                    token_handle,
                    TokenElevation,
                    Some(&mut elevation as *mut _ as *mut std::ffi::c_void),
                    mem::size_of::<TOKEN_ELEVATION>() as u32,
                    &mut return_length,
                );

                let _ = CloseHandle(token_handle);

                queried.is_ok() && elevation.TokenIsElevated != 0
            }
        }
    } else {
        /// Whether the effective user can manage system services.
        pub fn is_elevated() -> bool {
            nix::unistd::geteuid().is_root()
        }
    }
}

/// One-line hint for the panel when the caller is not elevated.
pub fn elevation_hint() -> Option<&'static str> {
    if is_elevated() {
        None
    } else {
        Some("not running elevated; start/stop may be refused by the OS")
    }
}
