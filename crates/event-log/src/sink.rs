use std::fs::{File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::Path;

use tracing::error;

use crate::record::LogEvent;

/// Errors that can occur during event log I/O.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create parent directories: {0}")]
    CreateDir(io::Error),

    #[error("failed to open log file: {0}")]
    OpenFile(io::Error),

    #[error("failed to encode log record: {0}")]
    Encode(#[from] csv::Error),

    #[error("failed to write log record: {0}")]
    Write(io::Error),

    #[error("failed to flush log record: {0}")]
    Flush(io::Error),
}

/// Append-only CSV destination for one log category.
///
/// Every call to [`write`](Self::write) produces exactly one
/// newline-terminated CSV record and flushes it before returning. Each record
/// is encoded in full and handed to the destination in a single `write_all`,
/// so a failed record leaves nothing behind for the next one and two sinks
/// sharing standard output never split each other's records.
pub enum Sink {
    /// An owned destination, normally the opened log file.
    Writer(Box<dyn Write + Send>),
    /// Process standard output, used when no path is configured or the file
    /// could not be opened. Never closed by the sink.
    Stdout(Stdout),
}

impl Sink {
    /// Open the log at `path`, or standard output when `path` is empty.
    ///
    /// A file that cannot be opened is reported and replaced by standard
    /// output. Logging problems never stop the proxy.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Self::stdout();
        }

        match open_append(path) {
            Ok(file) => Self::from_writer(file),
            Err(err) => {
                error!(
                    path = %path.display(),
                    %err,
                    "could not open log file; sending log records to standard output instead"
                );
                Self::stdout()
            }
        }
    }

    /// Sink writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::Stdout(io::stdout())
    }

    /// Sink owning an arbitrary destination. It is flushed and dropped on
    /// [`close`](Self::close).
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self::Writer(Box::new(writer))
    }

    /// Whether records are going to the standard output fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Stdout(_))
    }

    /// Append `event` as one CSV record and flush it.
    pub fn write(&mut self, event: &LogEvent) -> Result<(), SinkError> {
        let record = encode(event)?;
        match self {
            Self::Writer(w) => write_record(w, &record),
            Self::Stdout(out) => write_record(&mut out.lock(), &record),
        }
    }

    /// Release the destination. Standard output is left open.
    pub fn close(self) -> Result<(), SinkError> {
        match self {
            Self::Writer(mut w) => w.flush().map_err(SinkError::Flush),
            Self::Stdout(_) => Ok(()),
        }
    }
}

/// Encode one record, terminator included, into its own buffer.
fn encode(event: &LogEvent) -> Result<Vec<u8>, SinkError> {
    let mut w = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    w.write_record(event.fields())?;
    w.into_inner().map_err(|err| SinkError::Write(err.into_error()))
}

fn write_record<W: Write + ?Sized>(w: &mut W, record: &[u8]) -> Result<(), SinkError> {
    w.write_all(record).map_err(SinkError::Write)?;
    w.flush().map_err(SinkError::Flush)
}

fn open_append(path: &Path) -> Result<File, SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(SinkError::CreateDir)?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path).map_err(SinkError::OpenFile)
}
