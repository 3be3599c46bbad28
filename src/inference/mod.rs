//! Text prediction and correction backends.

use futures_util::future::BoxFuture;
use thiserror::Error;

/// Ollama chat backend
pub mod ollama;

pub use ollama::OllamaClient;

/// Reply meaning "no usable suggestion"
pub const NO_RESULT_SENTINEL: &str = "{KO}";

/// Kind of inference request, one debounce channel each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferenceKind {
    /// Continue the typed text
    Prediction,
    /// Rewrite the typed text if it is wrong
    Correction,
}

impl InferenceKind {
    /// Issue the request of this kind against a service
    pub fn request(self, service: &dyn InferenceService, text: &str) -> InferenceFuture {
        match self {
            Self::Prediction => service.predict(text),
            Self::Correction => service.correct(text),
        }
    }
}

/// Outcome of a successful request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inference {
    /// Text to show or type
    Suggestion(String),
    /// The backend declined to answer
    NoResult,
}

impl Inference {
    /// Interpret raw model output, mapping the sentinel and blank replies to `NoResult`
    ///
    /// A leading space is kept: it separates a new word from the typed text.
    #[must_use]
    pub fn from_reply(reply: &str) -> Self {
        let trimmed = reply.trim();
        if trimmed.is_empty() || trimmed == NO_RESULT_SENTINEL {
            return Self::NoResult;
        }
        let text = reply.trim_start_matches(['\r', '\n']).trim_end();
        Self::Suggestion(text.to_owned())
    }
}

/// Errors talking to the inference backend
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Request could not be sent or the connection failed
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("inference backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Backend reply was not the expected JSON
    #[error("malformed inference reply: {0}")]
    Decode(#[from] serde_json::Error),

    /// Backend reported an error in its payload
    #[error("inference backend error: {0}")]
    Backend(String),
}

/// Future returned by inference requests
pub type InferenceFuture = BoxFuture<'static, Result<Inference, InferenceError>>;

/// Request/response text inference
///
/// Futures own everything they need so they can outlive the caller.
pub trait InferenceService: Send + Sync {
    /// Predict up to a few words continuing `text`, completing a trailing partial word
    fn predict(&self, text: &str) -> InferenceFuture;

    /// Return a corrected `text` if it is meaningfully wrong
    fn correct(&self, text: &str) -> InferenceFuture;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_no_result() {
        assert_eq!(Inference::from_reply("{KO}"), Inference::NoResult);
        assert_eq!(Inference::from_reply("  {KO}\n"), Inference::NoResult);
    }

    #[test]
    fn test_blank_reply_is_no_result() {
        assert_eq!(Inference::from_reply(""), Inference::NoResult);
        assert_eq!(Inference::from_reply(" \n "), Inference::NoResult);
    }

    #[test]
    fn test_suggestion_trailing_whitespace_is_trimmed() {
        assert_eq!(
            Inference::from_reply("ox\n"),
            Inference::Suggestion("ox".to_owned())
        );
        assert_eq!(
            Inference::from_reply("\n jumps over \n"),
            Inference::Suggestion(" jumps over".to_owned())
        );
    }

    #[test]
    fn test_sentinel_inside_text_is_kept() {
        assert_eq!(
            Inference::from_reply("use {KO} marker"),
            Inference::Suggestion("use {KO} marker".to_owned())
        );
    }
}
