//! Trailing-edge debounce of inference requests.
//!
//! Each inference kind has its own channel holding at most one pending timer.
//! Arming a channel aborts its pending timer, so N arms inside the quiet
//! window produce a single request, timed from the last arm and carrying the
//! last snapshot. Requests run in their own task: re-arming never aborts a
//! request already in flight. A request that returns after its channel has
//! been armed again is stale and its result is dropped, whatever the newer
//! arm ends up returning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::inference::{Inference, InferenceKind, InferenceService};
use crate::output::text_preview;

/// A non-sentinel inference result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Channel that produced the result
    pub kind: InferenceKind,
    /// Generation of the arm that issued the request
    pub generation: u64,
    /// Buffer content the request was made with
    pub snapshot: String,
    /// Suggested text
    pub text: String,
}

/// Quiet windows per channel
#[derive(Debug, Clone, Copy)]
pub struct DebounceWindows {
    /// Prediction channel window
    pub prediction: Duration,
    /// Correction channel window
    pub correction: Duration,
}

struct Channel {
    window: Duration,
    /// Generation of the most recent arm, read by in-flight requests
    latest: Arc<AtomicU64>,
    timer: Option<JoinHandle<()>>,
}

impl Channel {
    fn new(window: Duration) -> Self {
        Self {
            window,
            latest: Arc::new(AtomicU64::new(0)),
            timer: None,
        }
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Debounced dispatcher with one channel per inference kind
///
/// Owned by a single task; must be used inside a tokio runtime.
pub struct Dispatcher {
    service: Arc<dyn InferenceService>,
    prediction: Channel,
    correction: Channel,
}

impl Dispatcher {
    /// Create a dispatcher with idle channels
    #[must_use]
    pub fn new(service: Arc<dyn InferenceService>, windows: DebounceWindows) -> Self {
        Self {
            service,
            prediction: Channel::new(windows.prediction),
            correction: Channel::new(windows.correction),
        }
    }

    /// Restart the quiet window for `kind` with a new snapshot
    ///
    /// `on_result` runs once the request returns a suggestion; it is skipped
    /// for the no-result sentinel and for errors. Returns the arm's generation.
    pub fn arm<F>(&mut self, kind: InferenceKind, snapshot: String, on_result: F) -> u64
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let channel = self.channel_mut(kind);
        channel.cancel();
        let generation = channel.latest.fetch_add(1, Ordering::AcqRel) + 1;

        let latest = Arc::clone(&channel.latest);
        let window = channel.window;
        channel.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            tokio::spawn(request(service, kind, generation, latest, snapshot, on_result));
        }));

        generation
    }

    /// Abort the pending timer of `kind`, if any
    fn cancel(&mut self, kind: InferenceKind) {
        self.channel_mut(kind).cancel();
    }

    #[cfg(test)]
    fn generation(&self, kind: InferenceKind) -> u64 {
        match kind {
            InferenceKind::Prediction => self.prediction.latest.load(Ordering::Acquire),
            InferenceKind::Correction => self.correction.latest.load(Ordering::Acquire),
        }
    }

    fn channel_mut(&mut self, kind: InferenceKind) -> &mut Channel {
        match kind {
            InferenceKind::Prediction => &mut self.prediction,
            InferenceKind::Correction => &mut self.correction,
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.cancel(InferenceKind::Prediction);
        self.cancel(InferenceKind::Correction);
    }
}

async fn request<F>(
    service: Arc<dyn InferenceService>,
    kind: InferenceKind,
    generation: u64,
    latest: Arc<AtomicU64>,
    snapshot: String,
    on_result: F,
) where
    F: FnOnce(Completion),
{
    debug!(?kind, generation, snapshot = %text_preview(&snapshot), "debounce fired");

    let result = kind.request(service.as_ref(), &snapshot).await;

    let current = latest.load(Ordering::Acquire);
    if generation < current {
        debug!(?kind, generation, current, "channel re-armed during request, dropping result");
        return;
    }

    match result {
        Ok(Inference::Suggestion(text)) => on_result(Completion {
            kind,
            generation,
            snapshot,
            text,
        }),
        Ok(Inference::NoResult) => {
            debug!(?kind, generation, "backend returned no suggestion");
        }
        Err(e) => {
            warn!(?kind, generation, error = %e, "inference request failed");
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    text: Option<String>,
}

/// Latest accepted suggestion, shared between the request tasks that write it
/// and the keyboard task that reads it
#[derive(Debug, Default)]
pub struct LatestSuggestion {
    slot: Mutex<Slot>,
}

impl LatestSuggestion {
    /// Create an empty cell
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` unless a result from the same or a newer generation is
    /// already stored; returns whether it was stored
    pub fn offer(&self, generation: u64, text: String) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.text.is_some() && generation <= slot.generation {
            debug!(
                generation,
                current = slot.generation,
                "dropping stale suggestion"
            );
            return false;
        }
        slot.generation = generation;
        slot.text = Some(text);
        true
    }

    /// Current suggestion
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .text
            .clone()
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }
}
