//! Line-oriented output handle
//!
//! Every external emission (transport wire, member notifications, console
//! replies) goes through an `Output`. Each `write_line` call holds the writer
//! lock for the whole line, so concurrent writers never interleave partial
//! lines.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Cloneable, line-atomic writer
#[derive(Clone)]
pub struct Output {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Output {
    /// Output to the process stdout
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Wrap an arbitrary writer
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// In-memory output, returning the handle used to read it back
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        let output = Self::from_writer(CaptureWriter(captured.buf.clone()));
        (output, captured)
    }

    /// Write one full line and flush
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("output lock poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

/// Read side of a captured output
#[derive(Debug, Clone, Default)]
pub struct Captured {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Captured {
    /// Everything written so far
    pub fn contents(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }

    /// Written lines, without terminators
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::other("capture buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
