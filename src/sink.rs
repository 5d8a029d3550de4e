use crate::error::SinkError;
use crate::record::FlushPayload;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// Asynchronous destination for [`FlushPayload`]s produced by the agent.
///
/// Implementations transport one payload per call to a concrete backend
/// (the logpush ingester over HTTP, an in-memory recorder, etc).
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a single flush payload.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the payload.
    /// - `Err(..)` if the request could not be completed or the backend
    ///   rejected it. The agent keeps the entries queued and does not
    ///   retry on its own.
    async fn push(&self, payload: &FlushPayload) -> Result<(), SinkError>;
}

/// A sink that keeps every accepted payload in memory.
///
/// Useful for tests and dry runs. While [`reject_with`](Self::reject_with)
/// is set, pushes fail with that status and body and nothing is recorded.
#[derive(Default)]
pub struct MemorySink {
    payloads: Mutex<Vec<FlushPayload>>,
    rejection: Mutex<Option<(u16, String)>>,
    attempts: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_with(&self, status: u16, body: impl Into<String>) {
        *self.rejection.lock().unwrap_or_else(PoisonError::into_inner) = Some((status, body.into()));
    }

    pub fn accept(&self) {
        *self.rejection.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Payloads accepted so far, oldest first.
    pub fn payloads(&self) -> Vec<FlushPayload> {
        self.payloads.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of push calls, accepted or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn push(&self, payload: &FlushPayload) -> Result<(), SinkError> {
        *self.attempts.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        let rejection = self.rejection.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some((status, body)) = rejection {
            return Err(SinkError::Rejected { status, body });
        }
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());
        Ok(())
    }
}
