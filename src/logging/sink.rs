use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

/// Where a log scope sends its records
#[derive(Default)]
pub enum LogSink {
    /// Standard error, the default destination
    #[default]
    Stderr,
    /// A file, created or truncated on entry
    File(PathBuf),
    /// Any writer owned by the scope
    Stream(Box<dyn Write + Send>),
    /// An in-memory buffer the caller keeps a handle to
    Buffer(LogBuffer),
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSink::Stderr => f.write_str("Stderr"),
            LogSink::File(path) => f.debug_tuple("File").field(path).finish(),
            LogSink::Stream(_) => f.write_str("Stream(..)"),
            LogSink::Buffer(_) => f.write_str("Buffer(..)"),
        }
    }
}

impl LogSink {
    pub(crate) fn open(self) -> Result<Box<dyn Write + Send>> {
        Ok(match self {
            LogSink::Stderr => Box::new(io::stderr()),
            LogSink::File(path) => Box::new(
                File::create(&path)
                    .with_context(|| format!("Failed to open log file {}", path.display()))?,
            ),
            LogSink::Stream(writer) => writer,
            LogSink::Buffer(buffer) => Box::new(buffer),
        })
    }
}

/// Shared in-memory log destination
#[derive(Clone, Default)]
pub struct LogBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Serializes records from every thread onto one destination.
///
/// Each record is written under the lock and flushed before the lock is
/// released. Once closed, further records are discarded.
#[derive(Clone)]
pub(crate) struct Funnel {
    target: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
}

impl Funnel {
    pub(crate) fn new(target: Box<dyn Write + Send>) -> Self {
        Self {
            target: Arc::new(Mutex::new(Some(target))),
        }
    }

    /// Flush and release the destination
    pub(crate) fn close(&self) -> io::Result<()> {
        let taken = self
            .target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for Funnel {
    type Writer = FunnelGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        FunnelGuard {
            guard: self.target.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

pub(crate) struct FunnelGuard<'a> {
    guard: MutexGuard<'a, Option<Box<dyn Write + Send>>>,
}

impl Write for FunnelGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.guard.as_mut() {
            Some(writer) => writer.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.guard.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for FunnelGuard<'_> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
