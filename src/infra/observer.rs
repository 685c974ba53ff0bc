use crate::domain::{
    CallForest, CallTreeSnapshot, NodeStorage, ObserveError, RequestEvent, ResponseEvent,
    ResponseObservation, UnboundedNodes, snapshot,
};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

struct ObserverState<S> {
    forest: CallForest<S>,
    logs: Vec<u8>,
}

/// Shared call-tree store fed by concurrent producers and read by the UI.
///
/// The forest and the log buffer sit behind a single lock. Every operation
/// takes it for its own duration only and none of them perform I/O while
/// holding it.
pub struct Observer<S = UnboundedNodes> {
    state: Mutex<ObserverState<S>>,
}

impl Observer<UnboundedNodes> {
    pub fn new() -> Self {
        Self::with_storage(UnboundedNodes::default())
    }
}

impl Default for Observer<UnboundedNodes> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: NodeStorage> Observer<S> {
    pub fn with_storage(nodes: S) -> Self {
        Self {
            state: Mutex::new(ObserverState {
                forest: CallForest::with_storage(nodes),
                logs: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ObserverState<S>> {
        // A producer that panicked mid-update must not blind the monitor.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn observe_request(&self, event: &RequestEvent) -> Result<(), ObserveError> {
        self.observe_request_at(event, SystemTime::now())
    }

    pub fn observe_request_at(
        &self,
        event: &RequestEvent,
        now: SystemTime,
    ) -> Result<(), ObserveError> {
        self.lock().forest.observe_request(event, now)
    }

    pub fn observe_response(&self, event: &ResponseEvent) -> ResponseObservation {
        self.observe_response_at(event, SystemTime::now())
    }

    pub fn observe_response_at(&self, event: &ResponseEvent, now: SystemTime) -> ResponseObservation {
        self.lock().forest.observe_response(event, now)
    }

    pub fn has_calls(&self) -> bool {
        self.lock().forest.has_calls()
    }

    /// Rows for every root tree as of `now`, built under the lock and
    /// returned detached from it.
    pub fn snapshot(&self, now: SystemTime) -> CallTreeSnapshot {
        let state = self.lock();
        snapshot(&state.forest, now)
    }

    pub fn write_log(&self, bytes: &[u8]) -> usize {
        self.lock().logs.extend_from_slice(bytes);
        bytes.len()
    }

    /// Drains up to `buf.len()` buffered log bytes.
    pub fn read_log(&self, buf: &mut [u8]) -> usize {
        let mut state = self.lock();
        let count = buf.len().min(state.logs.len());
        buf[..count].copy_from_slice(&state.logs[..count]);
        state.logs.drain(..count);
        count
    }

    /// Non-destructive copy of the buffered logs for display.
    pub fn logs_text(&self) -> String {
        String::from_utf8_lossy(&self.lock().logs).into_owned()
    }

    pub fn log_len(&self) -> usize {
        self.lock().logs.len()
    }
}

impl<S: NodeStorage> io::Write for &Observer<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_log(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: NodeStorage> io::Read for &Observer<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_log(buf))
    }
}
