//! Sinks for text sent *to* the debug channel.
//!
//! A [`Console`] owns one sink and is passed explicitly to whatever needs to
//! emit debug text. [`Console::default`] picks the platform sink: the system
//! debugger output on Windows, a discarding sink elsewhere. Tests construct a
//! `Console` over their own writer to capture output.

mod writer;
#[cfg(windows)]
pub mod win32;

pub use writer::{DebuggerWriter, NullWriter, OutputDebugString};

use std::fmt;
use std::io::{self, Write};

pub struct Console {
    sink: Box<dyn Write + Send>,
}

impl Console {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// A console that discards everything.
    pub fn null() -> Self {
        Self::new(NullWriter)
    }

    /// Sends `text` as a single debug string.
    pub fn println(&mut self, text: &str) -> io::Result<usize> {
        self.write_once(text.as_bytes())
    }

    /// Formats `args` and sends the result as a single debug string.
    ///
    /// ```
    /// let mut console = dbwin_console::Console::null();
    /// console.printf(format_args!("Hello {}", "World!")).unwrap();
    /// ```
    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> io::Result<usize> {
        match args.as_str() {
            Some(text) => self.write_once(text.as_bytes()),
            None => self.write_once(fmt::format(args).as_bytes()),
        }
    }

    /// One `write` call per message: debug sinks treat each call as one string.
    fn write_once(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let n = self.sink.write(bytes)?;
        if n != bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sink accepted {n} of {} bytes", bytes.len()),
            ));
        }
        Ok(n)
    }
}

impl Default for Console {
    #[cfg(windows)]
    fn default() -> Self {
        Self::new(DebuggerWriter::new(win32::Win32DebugOutput))
    }

    #[cfg(not(windows))]
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}
