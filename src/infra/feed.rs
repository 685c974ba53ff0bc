use crate::domain::{DispatchId, ObserveError, Outcome, RequestEvent, ResponseEvent, ResponseObservation};
use crate::infra::Observer;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::SystemTime;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Where the monitor reads its newline-delimited JSON events from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeedSource {
    Stdin,
    File(PathBuf),
}

impl FeedSource {
    pub fn label(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// One decoded line of the feed.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    Request {
        #[serde(default)]
        root_id: DispatchId,
        #[serde(default)]
        parent_id: DispatchId,
        id: DispatchId,
        #[serde(default)]
        function: String,
        #[serde(default)]
        creation_time: Option<String>,
        #[serde(default)]
        expiration_time: Option<String>,
    },
    Response {
        id: DispatchId,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        status_code: Option<u16>,
        #[serde(default)]
        outcome: Option<Outcome>,
    },
    Log {
        line: String,
    },
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read event feed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to open event feed {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("refusing to read events from an interactive terminal; pipe a feed or pass a file")]
    InteractiveStdin,

    #[error("undecodable event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid {field} timestamp {value:?}: {message}")]
    Timestamp {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error(transparent)]
    Observe(#[from] ObserveError),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FeedStats {
    pub requests: usize,
    pub responses: usize,
    pub logs: usize,
    pub rejected: usize,
}

pub fn open_feed(source: &FeedSource) -> Result<Box<dyn BufRead + Send>, FeedError> {
    match source {
        FeedSource::Stdin => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                return Err(FeedError::InteractiveStdin);
            }
            Ok(Box::new(BufReader::new(stdin)))
        }
        FeedSource::File(path) => {
            let file = File::open(path).map_err(|source| FeedError::Open {
                path: path.clone(),
                source,
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

pub fn parse_timestamp(field: &'static str, value: &str) -> Result<SystemTime, FeedError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .map(SystemTime::from)
        .map_err(|error| FeedError::Timestamp {
            field,
            value: value.to_string(),
            message: error.to_string(),
        })
}

fn parse_optional_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<SystemTime>, FeedError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => parse_timestamp(field, raw).map(Some),
        _ => Ok(None),
    }
}

impl FeedEvent {
    pub fn decode(line: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Feeds this event into the observer.
    pub fn apply(self, observer: &Observer, stats: &mut FeedStats) -> Result<(), FeedError> {
        match self {
            Self::Request {
                root_id,
                parent_id,
                id,
                function,
                creation_time,
                expiration_time,
            } => {
                let root_id = if root_id.is_empty() { id.clone() } else { root_id };
                let event = RequestEvent {
                    root_id,
                    parent_id,
                    id,
                    function,
                    creation_time: parse_optional_timestamp(
                        "creation_time",
                        creation_time.as_deref(),
                    )?,
                    expiration_time: parse_optional_timestamp(
                        "expiration_time",
                        expiration_time.as_deref(),
                    )?,
                };
                observer.observe_request(&event)?;
                stats.requests += 1;
            }
            Self::Response {
                id,
                error,
                status_code,
                outcome,
            } => {
                let event = ResponseEvent {
                    id,
                    error,
                    status_code,
                    outcome,
                };
                if observer.observe_response(&event) == ResponseObservation::UnknownDispatch {
                    tracing::warn!(id = %event.id, "response for a dispatch that was never requested");
                }
                stats.responses += 1;
            }
            Self::Log { line } => {
                let mut bytes = line.into_bytes();
                bytes.push(b'\n');
                let _ = observer.write_log(&bytes);
                stats.logs += 1;
            }
        }
        Ok(())
    }
}

/// Applies every line of `reader` to the observer. Bad lines are reported and
/// skipped; only read failures end the feed early.
pub fn run_feed(reader: impl BufRead, observer: &Observer) -> Result<FeedStats, FeedError> {
    let mut stats = FeedStats::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let applied = FeedEvent::decode(&line).and_then(|event| event.apply(observer, &mut stats));
        if let Err(error) = applied {
            stats.rejected += 1;
            tracing::warn!(line = index + 1, %error, "skipping feed event");
        }
    }
    Ok(stats)
}

pub fn spawn_feed(
    source: FeedSource,
    reader: Box<dyn BufRead + Send>,
    observer: Arc<Observer>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        tracing::info!(source = %source.label(), "reading events");
        match run_feed(reader, &observer) {
            Ok(stats) => tracing::info!(
                requests = stats.requests,
                responses = stats.responses,
                logs = stats.logs,
                rejected = stats.rejected,
                "event feed ended"
            ),
            Err(error) => tracing::error!(%error, "event feed failed"),
        }
    })
}
