//! Opaque handles for detached child processes
//!
//! Servers and tunnel controllers are external processes skyhook only
//! tracks by id. A [`ProcessHandle`] exposes the two capabilities the
//! core needs: ask whether the process still exists, and request
//! termination. Note that a long-lived system can see pid recycling
//! collide with a stale record; callers treat signal failures as
//! non-fatal for exactly that reason.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

/// Handle to a detached process, tracked by numeric id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessHandle(u32);

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self(pid)
    }

    /// Raw process id
    pub fn id(&self) -> u32 {
        self.0
    }

    /// Check if the process is still alive
    ///
    /// On Unix, uses kill(pid, 0) to check if the process exists.
    /// On Windows, uses OpenProcess to check if the process exists.
    #[cfg(unix)]
    pub fn is_alive(&self) -> bool {
        // kill(pid, 0) returns 0 if the process exists and we have permission
        // to signal it; EPERM means it exists but we cannot signal it
        unsafe {
            let result = libc::kill(self.0 as libc::pid_t, 0);
            if result == 0 {
                return true;
            }
            let err = io::Error::last_os_error();
            err.raw_os_error() == Some(libc::EPERM)
        }
    }

    #[cfg(windows)]
    pub fn is_alive(&self) -> bool {
        use std::ptr;
        use windows_sys::Win32::Foundation::{CloseHandle, INVALID_HANDLE_VALUE};
        use windows_sys::Win32::System::Threading::{
            OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
        };

        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, self.0);
            if handle == INVALID_HANDLE_VALUE || handle == ptr::null_mut() {
                return false;
            }
            CloseHandle(handle);
            true
        }
    }

    /// Ask the process to terminate
    ///
    /// Returns an error if the signal could not be delivered (most commonly
    /// because the process has already exited).
    #[cfg(unix)]
    pub fn terminate(&self) -> io::Result<()> {
        let result = unsafe { libc::kill(self.0 as libc::pid_t, libc::SIGTERM) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(windows)]
    pub fn terminate(&self) -> io::Result<()> {
        use std::ptr;
        use windows_sys::Win32::Foundation::{CloseHandle, INVALID_HANDLE_VALUE};
        use windows_sys::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, 0, self.0);
            if handle == INVALID_HANDLE_VALUE || handle == ptr::null_mut() {
                return Err(io::Error::last_os_error());
            }
            let result = TerminateProcess(handle, 1);
            CloseHandle(handle);
            if result == 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(())
            }
        }
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessHandle {
    fn from(pid: u32) -> Self {
        Self(pid)
    }
}
