//! Win32 named events backing the system debug channel.

use crate::{BufferReady, DataReady, SignalError, WaitOutcome};
use std::time::Duration;
use windows::Win32::Foundation::{
    CloseHandle, HANDLE, WAIT_ABANDONED, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows::Win32::System::Threading::{
    CreateEventW, EVENT_MODIFY_STATE, OpenEventW, SYNCHRONIZATION_SYNCHRONIZE, SetEvent,
    WaitForSingleObject,
};
use windows::core::{Error, PCWSTR};

impl From<Error> for SignalError {
    fn from(err: Error) -> Self {
        SignalError::Os {
            code: err.code().0,
            message: err.message().to_string(),
        }
    }
}

/// Auto-reset event identified by a kernel object name.
pub struct NamedEvent {
    handle: HANDLE,
    name: String,
}

// SAFETY: event handles may be used and closed from any thread.
unsafe impl Send for NamedEvent {}
unsafe impl Sync for NamedEvent {}

fn wide(name: &str) -> Vec<u16> {
    name.encode_utf16().chain(std::iter::once(0)).collect()
}

impl NamedEvent {
    /// Creates the event, or opens it if another process already created it.
    pub fn create(name: &str, initial_state: bool) -> Result<Self, SignalError> {
        let name_wide = wide(name);
        let handle =
            unsafe { CreateEventW(None, false, initial_state, PCWSTR(name_wide.as_ptr()))? };
        Ok(Self {
            handle,
            name: name.to_owned(),
        })
    }

    /// Opens an existing event with wait and set rights.
    pub fn open(name: &str) -> Result<Self, SignalError> {
        let name_wide = wide(name);
        let handle = unsafe {
            OpenEventW(
                SYNCHRONIZATION_SYNCHRONIZE | EVENT_MODIFY_STATE,
                false,
                PCWSTR(name_wide.as_ptr()),
            )?
        };
        Ok(Self {
            handle,
            name: name.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl BufferReady for NamedEvent {
    fn raise(&self) -> Result<(), SignalError> {
        unsafe { SetEvent(self.handle)? };
        Ok(())
    }
}

impl DataReady for NamedEvent {
    fn wait(&self, timeout: Duration) -> Result<WaitOutcome, SignalError> {
        // u32::MAX is INFINITE; clamp just below it.
        let millis = timeout.as_millis().min(u128::from(u32::MAX - 1)) as u32;
        let status = unsafe { WaitForSingleObject(self.handle, millis) };

        if status == WAIT_OBJECT_0 {
            Ok(WaitOutcome::Signaled)
        } else if status == WAIT_TIMEOUT {
            Ok(WaitOutcome::TimedOut)
        } else if status == WAIT_ABANDONED {
            Err(SignalError::Abandoned)
        } else if status == WAIT_FAILED {
            Err(Error::from_win32().into())
        } else {
            Err(SignalError::Os {
                code: status.0 as i32,
                message: format!("unexpected wait status on {}", self.name),
            })
        }
    }
}

impl Drop for NamedEvent {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}
