use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::input::keymap;

/// Top-level configuration loaded from `~/.type-buddy.toml`
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub keys: KeysConfig,
    pub buffer: BufferConfig,
    pub debounce: DebounceConfig,
    pub inference: InferenceConfig,
    pub output: OutputConfig,
    pub telemetry: TelemetryConfig,
}

/// Key codes, in the numbering produced by the event source (X11 keysyms)
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeysConfig {
    pub backspace: u32,
    /// Multiset of keys whose release commits the prediction
    pub accept: Vec<u32>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            backspace: keymap::BACKSPACE,
            accept: vec![keymap::CONTROL_L, keymap::CONTROL_L],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BufferConfig {
    /// Buffer is cleared once it grows past this many characters
    pub max_len: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { max_len: 100 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DebounceConfig {
    pub prediction_ms: u64,
    pub correction_ms: u64,
}

impl DebounceConfig {
    #[must_use]
    pub const fn prediction_window(&self) -> Duration {
        Duration::from_millis(self.prediction_ms)
    }

    #[must_use]
    pub const fn correction_window(&self) -> Duration {
        Duration::from_millis(self.correction_ms)
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            prediction_ms: 300,
            correction_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    pub model: String,
    /// Backend base URL (overridden by `OLLAMA_HOST`)
    pub host: String,
    pub timeout_secs: u64,
    pub correction: bool,
    pub pull_missing_model: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_owned(),
            host: "http://localhost:11434".to_owned(),
            timeout_secs: 30,
            correction: true,
            pull_missing_model: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub inter_key_delay_ms: u64,
}

impl OutputConfig {
    #[must_use]
    pub const fn inter_key_delay(&self) -> Duration {
        Duration::from_millis(self.inter_key_delay_ms)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            inter_key_delay_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub log_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: "~/.type-buddy/type-buddy.log".to_owned(),
        }
    }
}

const DEFAULT_CONFIG: &str = r#"[keys]
# X11 keysym numbering: 65288 = BackSpace, 65507 = Control_L
backspace = 65288
accept = [65507, 65507]

[buffer]
max_len = 100

[debounce]
prediction_ms = 300
correction_ms = 500

[inference]
model = "llama3.2"
host = "http://localhost:11434"
timeout_secs = 30
correction = true
pull_missing_model = true

[output]
inter_key_delay_ms = 10

[telemetry]
enabled = false
log_path = "~/.type-buddy/type-buddy.log"
"#;

impl Config {
    /// Load config from ~/.type-buddy.toml, writing the defaults first if missing
    ///
    /// # Errors
    /// Returns error if the file cannot be created, read, parsed or fails validation
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        Self::load_from(&config_path)
    }

    /// Load and validate config from an explicit path
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or fails validation
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents).context("failed to parse config TOML")?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    ///
    /// # Errors
    /// Returns error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.keys.accept.is_empty() {
            bail!("keys.accept must list at least one key code");
        }
        if self.buffer.max_len == 0 {
            bail!("buffer.max_len must be > 0");
        }
        if self.debounce.prediction_ms == 0 || self.debounce.correction_ms == 0 {
            bail!("debounce windows must be > 0 ms");
        }
        if self.inference.model.trim().is_empty() {
            bail!("inference.model must not be empty");
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".type-buddy.toml"))
    }

    fn create_default(path: &Path) -> Result<()> {
        fs::write(path, DEFAULT_CONFIG).context("failed to write default config")?;
        Ok(())
    }

    /// Expand ~ in paths to home directory
    ///
    /// # Errors
    /// Returns error if the path starts with `~/` and `HOME` is not set
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}
