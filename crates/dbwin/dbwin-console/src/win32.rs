use crate::OutputDebugString;
use std::io;
use windows::Win32::System::Diagnostics::Debug::OutputDebugStringW;
use windows::core::PCWSTR;

/// `OutputDebugStringW`: hands the string to the attached debugger, or to the
/// system debug buffer when none is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32DebugOutput;

impl OutputDebugString for Win32DebugOutput {
    fn output(&self, message: &str) -> io::Result<()> {
        let wide: Vec<u16> = message.encode_utf16().chain(std::iter::once(0)).collect();
        unsafe { OutputDebugStringW(PCWSTR(wide.as_ptr())) };
        Ok(())
    }
}
