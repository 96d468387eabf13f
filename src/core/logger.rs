//! Staging log output.
//!
//! Lines follow the buildpack convention: `-----> ` for a new step and a
//! seven-space indent for everything that belongs to it.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

const STEP_PREFIX: &str = "-----> ";
const DETAIL_PREFIX: &str = "       ";

pub struct Logger {
    out: Box<dyn Write + Send>,
}

impl Logger {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Logger writing into a shared buffer, for inspecting output in tests.
    pub fn buffered() -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        (Self::new(Box::new(buffer.clone())), buffer)
    }

    pub fn begin_step(&mut self, message: impl AsRef<str>) {
        self.line(STEP_PREFIX, message.as_ref());
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.line(DETAIL_PREFIX, message.as_ref());
    }

    pub fn warning(&mut self, message: impl AsRef<str>) {
        self.line(&format!("{}**WARNING** ", DETAIL_PREFIX), message.as_ref());
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.line(&format!("{}**ERROR** ", DETAIL_PREFIX), message.as_ref());
    }

    // A staging log that cannot be written must not fail the step.
    fn line(&mut self, prefix: &str, message: &str) {
        let _ = writeln!(self.out, "{}{}", prefix, message);
        let _ = self.out.flush();
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
