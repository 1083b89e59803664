#![allow(unused)]

use spin::Mutex;
use std::{io, sync::Arc};
use tracing_subscriber::fmt::MakeWriter;

/// Captures everything a subscriber writes, for assertions on log output.
#[derive(Debug, Clone, Default)]
pub struct CaptureWriter {
    buf: Arc<Mutex<String>>,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> String {
        self.buf.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.buf.lock().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.buf.lock().clear();
    }
}

#[derive(Debug)]
pub struct CaptureHandle {
    buf: Arc<Mutex<String>>,
}

impl io::Write for CaptureHandle {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.lock().push_str(&String::from_utf8_lossy(bytes));
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureHandle;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureHandle {
            buf: Arc::clone(&self.buf),
        }
    }
}
