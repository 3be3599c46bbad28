use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};

use crate::buffer::TextBuffer;
use crate::config::Config;
use crate::dispatch::{DebounceWindows, Dispatcher, LatestSuggestion};
use crate::gesture::{AcceptanceGesture, GestureOutcome};
use crate::inference::{InferenceKind, InferenceService};
use crate::input::keymap;
use crate::input::router;
use crate::input::{EventKind, RawInputEvent};
use crate::output::{text_preview, OutputSink};

/// Values the keyboard consumer is built from
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Key code that deletes the last character
    pub backspace_key: u32,
    /// Multiset of key codes whose release commits the prediction
    pub accept_keys: Vec<u32>,
    /// Buffer overflow threshold, in characters
    pub max_len: usize,
    /// Debounce quiet windows
    pub windows: DebounceWindows,
    /// Whether the correction channel is armed
    pub correction: bool,
    /// Pause between synthetic keystrokes on commit
    pub inter_key_delay: Duration,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            backspace_key: config.keys.backspace,
            accept_keys: config.keys.accept.clone(),
            max_len: config.buffer.max_len,
            windows: DebounceWindows {
                prediction: config.debounce.prediction_window(),
                correction: config.debounce.correction_window(),
            },
            correction: config.inference.correction,
            inter_key_delay: config.output.inter_key_delay(),
        }
    }
}

/// Keyboard consumer: owns the text buffer, the acceptance gesture and the
/// debounce timers
pub struct KeyboardPipeline {
    buffer: TextBuffer,
    gesture: AcceptanceGesture,
    dispatcher: Dispatcher,
    prediction: Arc<LatestSuggestion>,
    correction: Arc<LatestSuggestion>,
    sink: Arc<dyn OutputSink>,
    backspace_key: u32,
    correction_enabled: bool,
    inter_key_delay: Duration,
}

impl KeyboardPipeline {
    /// Build the consumer state
    #[must_use]
    pub fn new(
        settings: &PipelineSettings,
        service: Arc<dyn InferenceService>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            buffer: TextBuffer::new(settings.max_len),
            gesture: AcceptanceGesture::new(settings.accept_keys.clone()),
            dispatcher: Dispatcher::new(service, settings.windows),
            prediction: Arc::new(LatestSuggestion::new()),
            correction: Arc::new(LatestSuggestion::new()),
            sink,
            backspace_key: settings.backspace_key,
            correction_enabled: settings.correction,
            inter_key_delay: settings.inter_key_delay,
        }
    }

    /// Consume keyboard events until the stream closes
    pub async fn run(mut self, events: flume::Receiver<RawInputEvent>) {
        info!("keyboard consumer started");
        while let Ok(event) = events.recv_async().await {
            self.handle(event).await;
        }
        info!("keyboard stream closed, keyboard consumer exiting");
    }

    /// Process one keyboard event
    pub async fn handle(&mut self, event: RawInputEvent) {
        trace!(kind = ?event.kind, keycode = event.keycode, "keyboard event");
        match event.kind {
            EventKind::KeyDown => self.on_key_down(&event),
            EventKind::KeyUp => self.on_key_up(event.keycode).await,
            other => debug!(kind = ?other, "ignoring non-keyboard event"),
        }
    }

    /// Current buffer content
    #[must_use]
    pub fn buffer(&self) -> &str {
        self.buffer.as_str()
    }

    /// Prediction a commit would type
    #[must_use]
    pub fn prediction(&self) -> Option<String> {
        self.prediction.get()
    }

    /// Latest accepted correction
    #[must_use]
    pub fn correction(&self) -> Option<String> {
        self.correction.get()
    }

    fn on_key_down(&mut self, event: &RawInputEvent) {
        let action = keymap::resolve(event, self.backspace_key);
        let Some(edit) = self.buffer.apply(&action) else {
            return;
        };

        let snapshot = self.buffer.as_str().to_owned();
        debug!(?edit, len = self.buffer.len(), "buffer updated");
        self.sink.notify_buffer_changed(&snapshot);
        self.arm_inference(snapshot);
    }

    fn arm_inference(&mut self, snapshot: String) {
        if self.correction_enabled {
            let latest = Arc::clone(&self.correction);
            let sink = Arc::clone(&self.sink);
            self.dispatcher
                .arm(InferenceKind::Correction, snapshot.clone(), move |done| {
                    if latest.offer(done.generation, done.text.clone()) {
                        sink.notify_correction(&done.text);
                    }
                });
        }

        let latest = Arc::clone(&self.prediction);
        let sink = Arc::clone(&self.sink);
        self.dispatcher
            .arm(InferenceKind::Prediction, snapshot, move |done| {
                if latest.offer(done.generation, done.text.clone()) {
                    sink.notify_prediction(&done.text);
                }
            });
    }

    async fn on_key_up(&mut self, keycode: u32) {
        if self.gesture.release(keycode) == GestureOutcome::Commit {
            self.commit().await;
        }
    }

    async fn commit(&self) {
        let Some(text) = self.prediction.get().filter(|t| !t.is_empty()) else {
            info!("acceptance gesture with no prediction, nothing to type");
            return;
        };

        info!(prediction = %text_preview(&text), "committing prediction");
        let sink = Arc::clone(&self.sink);
        let delay = self.inter_key_delay;
        match tokio::task::spawn_blocking(move || sink.type_text(&text, delay)).await {
            Ok(Ok(())) => debug!("prediction typed"),
            Ok(Err(e)) => error!(error = %e, "failed to type prediction"),
            Err(e) => error!(error = %e, "typing task panicked"),
        }
    }
}

/// Mouse consumer: forwards clicks to the sink until the stream closes
pub async fn run_mouse(events: flume::Receiver<RawInputEvent>, sink: Arc<dyn OutputSink>) {
    info!("mouse consumer started");
    while let Ok(event) = events.recv_async().await {
        let (x, y) = event.position;
        sink.notify_mouse_click(x, y);
    }
    info!("mouse stream closed, mouse consumer exiting");
}

/// Route the raw source stream and run both consumers until it closes
///
/// # Errors
/// Returns error if the router thread cannot be spawned or a consumer panics
pub async fn run(
    source: flume::Receiver<RawInputEvent>,
    settings: &PipelineSettings,
    service: Arc<dyn InferenceService>,
    sink: Arc<dyn OutputSink>,
) -> Result<()> {
    let streams = router::spawn(source).context("failed to start input router")?;

    let keyboard = KeyboardPipeline::new(settings, service, Arc::clone(&sink));
    let keyboard = tokio::spawn(keyboard.run(streams.keyboard));
    let mouse = tokio::spawn(run_mouse(streams.mouse, sink));

    let (keyboard, mouse) = tokio::join!(keyboard, mouse);
    keyboard.context("keyboard consumer failed")?;
    mouse.context("mouse consumer failed")?;

    let router = streams.handle;
    tokio::task::spawn_blocking(move || router.join())
        .await
        .context("failed to join input router")?
        .map_err(|_| anyhow!("input router panicked"))?;

    info!("pipeline stopped");
    Ok(())
}
