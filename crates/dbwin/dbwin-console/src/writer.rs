use std::io::{self, Write};

/// Sink used where no debugger output facility exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWriter;

impl Write for NullWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The platform call that hands one string to an attached debugger.
pub trait OutputDebugString {
    fn output(&self, message: &str) -> io::Result<()>;
}

/// Forwards each write, as one string, to an [`OutputDebugString`] facility.
///
/// Bytes are decoded as UTF-8 with lossy replacement before forwarding.
#[derive(Debug, Default, Clone)]
pub struct DebuggerWriter<O> {
    output: O,
}

impl<O: OutputDebugString> DebuggerWriter<O> {
    pub fn new(output: O) -> Self {
        Self { output }
    }

    pub fn get_ref(&self) -> &O {
        &self.output
    }
}

impl<O: OutputDebugString> Write for DebuggerWriter<O> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.output(&String::from_utf8_lossy(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
