use crate::infra::Observer;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Routes formatted log records into the observer's log buffer so they show
/// up in the Logs tab instead of corrupting the terminal.
#[derive(Clone)]
pub struct LogSink {
    observer: Arc<Observer>,
}

impl LogSink {
    pub fn new(observer: Arc<Observer>) -> Self {
        Self { observer }
    }
}

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.observer.write_log(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn init_logging(observer: Arc<Observer>, filter: &str) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_new(filter).map_err(|error| LoggingError::InvalidFilter {
        filter: filter.to_string(),
        message: error.to_string(),
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(LogSink::new(observer))
        .try_init()
        .map_err(|error| LoggingError::Install(error.to_string()))
}
