//! Type Buddy - inline text prediction for any application
//!
//! Watches global keystrokes, asks a local model for a continuation once
//! typing pauses, and types the prediction when the acceptance keys are
//! released.

/// Rolling text buffer
pub mod buffer;
/// Configuration management
pub mod config;
/// Debounced inference dispatch
pub mod dispatch;
/// Acceptance gesture state machine
pub mod gesture;
/// Prediction and correction backends
pub mod inference;
/// Input capture and routing
pub mod input;
/// Notifications and synthetic typing
pub mod output;
/// macOS permission checks
pub mod permissions;
/// Keyboard and mouse consumers
pub mod pipeline;
/// Logging setup
pub mod telemetry;
