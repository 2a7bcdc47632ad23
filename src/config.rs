use crate::defaults;
use crate::error::{IntervoiceError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub detection: DetectionConfig,
    pub timing: TimingConfig,
    pub recognition: RecognitionConfig,
    pub speech: SpeechConfig,
    pub history: HistoryConfig,
}

/// Answer service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; `/ask` and `/ws` are resolved against it.
    pub url: String,
    /// Try the persistent WebSocket channel before falling back to HTTP.
    pub websocket: bool,
    pub request_timeout_ms: u64,
}

/// Question detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub min_chars: usize,
    pub interim_complete_chars: usize,
    pub duplicate_ratio: f32,
}

/// Debounce, fallback and presentation timers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub final_debounce_ms: u64,
    pub interim_debounce_ms: u64,
    pub fallback_ms: u64,
    pub typewriter_ms: u64,
    pub cooldown_ms: u64,
}

/// Speech recognition supervision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    pub language: String,
    pub max_restart_attempts: u32,
    pub restart_backoff_ms: u64,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// Initial state of the audio-enabled switch.
    pub enabled: bool,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Synthesizer program override (spd-say, espeak-ng, say).
    pub command: Option<String>,
    /// Say "Ready for next question" after each live-mode answer.
    pub announce_ready: bool,
}

/// Question history configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub path: Option<PathBuf>,
    pub user: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: defaults::SERVICE_URL.to_string(),
            websocket: true,
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_chars: defaults::MIN_QUESTION_CHARS,
            interim_complete_chars: defaults::INTERIM_COMPLETE_CHARS,
            duplicate_ratio: defaults::DUPLICATE_RATIO,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            final_debounce_ms: defaults::FINAL_DEBOUNCE_MS,
            interim_debounce_ms: defaults::INTERIM_DEBOUNCE_MS,
            fallback_ms: defaults::FALLBACK_MS,
            typewriter_ms: defaults::TYPEWRITER_MS,
            cooldown_ms: defaults::COOLDOWN_MS,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: defaults::RECOGNITION_LANGUAGE.to_string(),
            max_restart_attempts: defaults::MAX_RESTART_ATTEMPTS,
            restart_backoff_ms: defaults::RESTART_BACKOFF_MS,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: defaults::SPEECH_RATE,
            pitch: defaults::SPEECH_PITCH,
            volume: defaults::SPEECH_VOLUME,
            command: None,
            announce_ready: true,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            user: None,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl TimingConfig {
    pub fn final_debounce(&self) -> Duration {
        Duration::from_millis(self.final_debounce_ms)
    }

    pub fn interim_debounce(&self) -> Duration {
        Duration::from_millis(self.interim_debounce_ms)
    }

    pub fn fallback(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }

    pub fn typewriter(&self) -> Duration {
        Duration::from_millis(self.typewriter_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl RecognitionConfig {
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }
}

impl HistoryConfig {
    /// Resolve the history file, defaulting to `$XDG_DATA_HOME/intervoice/history.jsonl`.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("intervoice").join("history.jsonl"))
            .ok_or(IntervoiceError::NoHomeDirectory { kind: "data" })
    }

    /// Resolve the user the history is associated with.
    pub fn resolved_user(&self) -> String {
        self.user
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| "local".to_string())
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IntervoiceError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                IntervoiceError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(IntervoiceError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - INTERVOICE_URL → service.url
    /// - INTERVOICE_AUDIO → speech.enabled ("on"/"off", "true"/"false", "1"/"0")
    /// - INTERVOICE_USER → history.user
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("INTERVOICE_URL")
            && !url.is_empty()
        {
            self.service.url = url;
        }

        if let Ok(audio) = std::env::var("INTERVOICE_AUDIO")
            && let Some(enabled) = parse_switch(&audio)
        {
            self.speech.enabled = enabled;
        }

        if let Ok(user) = std::env::var("INTERVOICE_USER")
            && !user.is_empty()
        {
            self.history.user = Some(user);
        }

        self
    }

    /// Check cross-field constraints the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        let ratio = self.detection.duplicate_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(invalid("detection.duplicate_ratio", "must be in (0, 1]"));
        }
        if self.timing.typewriter_ms == 0 {
            return Err(invalid("timing.typewriter_ms", "must be positive"));
        }
        if self.timing.fallback_ms <= self.timing.final_debounce_ms
            || self.timing.fallback_ms <= self.timing.interim_debounce_ms
        {
            return Err(invalid(
                "timing.fallback_ms",
                "must be longer than both debounce delays",
            ));
        }
        if !(self.speech.rate > 0.1 && self.speech.rate <= 10.0) {
            return Err(invalid("speech.rate", "must be in (0.1, 10]"));
        }
        if !(0.0..=1.0).contains(&self.speech.volume) {
            return Err(invalid("speech.volume", "must be in [0, 1]"));
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/intervoice/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("intervoice").join("config.toml"))
            .ok_or(IntervoiceError::NoHomeDirectory { kind: "config" })
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| IntervoiceError::Other(e.to_string()))
    }
}

/// Parse an on/off switch value.
pub fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, message: &str) -> IntervoiceError {
    IntervoiceError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_intervoice_env() {
        remove_env("INTERVOICE_URL");
        remove_env("INTERVOICE_AUDIO");
        remove_env("INTERVOICE_USER");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.service.url, "http://127.0.0.1:8000");
        assert!(config.service.websocket);
        assert_eq!(config.detection.min_chars, 10);
        assert_eq!(config.detection.interim_complete_chars, 20);
        assert_eq!(config.detection.duplicate_ratio, 0.7);
        assert_eq!(config.timing.final_debounce_ms, 1200);
        assert_eq!(config.timing.interim_debounce_ms, 2500);
        assert_eq!(config.timing.fallback_ms, 4000);
        assert_eq!(config.timing.typewriter_ms, 30);
        assert_eq!(config.recognition.max_restart_attempts, 3);
        assert!(config.speech.enabled);
        assert_eq!(config.speech.rate, 0.9);
        assert_eq!(config.speech.volume, 0.8);
        assert!(config.history.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [service]
            url = "https://answers.example.com"
            websocket = false

            [detection]
            duplicate_ratio = 0.5

            [timing]
            final_debounce_ms = 800
            fallback_ms = 3000

            [speech]
            enabled = false
            command = "espeak-ng"

            [history]
            path = "/tmp/history.jsonl"
            user = "alice"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.service.url, "https://answers.example.com");
        assert!(!config.service.websocket);
        assert_eq!(config.detection.duplicate_ratio, 0.5);
        assert_eq!(config.timing.final_debounce_ms, 800);
        assert_eq!(config.timing.fallback_ms, 3000);
        assert!(!config.speech.enabled);
        assert_eq!(config.speech.command.as_deref(), Some("espeak-ng"));
        assert_eq!(
            config.history.path,
            Some(PathBuf::from("/tmp/history.jsonl"))
        );
        assert_eq!(config.history.resolved_user(), "alice");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [timing]
            typewriter_ms = 10
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.timing.typewriter_ms, 10);
        assert_eq!(config.timing.final_debounce_ms, 1200);
        assert_eq!(config.service, ServiceConfig::default());
        assert_eq!(config.speech, SpeechConfig::default());
    }

    #[test]
    fn test_env_override_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_intervoice_env();

        set_env("INTERVOICE_URL", "http://10.0.0.2:9000");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.service.url, "http://10.0.0.2:9000");
        assert!(config.speech.enabled);

        clear_intervoice_env();
    }

    #[test]
    fn test_env_override_audio_and_user() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_intervoice_env();

        set_env("INTERVOICE_AUDIO", "off");
        set_env("INTERVOICE_USER", "bob");
        let config = Config::default().with_env_overrides();

        assert!(!config.speech.enabled);
        assert_eq!(config.history.user.as_deref(), Some("bob"));

        clear_intervoice_env();
    }

    #[test]
    fn test_env_override_empty_or_garbage_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_intervoice_env();

        set_env("INTERVOICE_URL", "");
        set_env("INTERVOICE_AUDIO", "maybe");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.service.url, defaults::SERVICE_URL);
        assert!(config.speech.enabled);

        clear_intervoice_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [service
            url = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(matches!(
            Config::load(temp_file.path()),
            Err(IntervoiceError::Config(_))
        ));
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_intervoice_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path().unwrap();
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("intervoice"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        let mut config = Config::default();
        config.detection.duplicate_ratio = 0.0;
        assert!(config.validate().is_err());
        config.detection.duplicate_ratio = 1.5;
        assert!(config.validate().is_err());
        config.detection.duplicate_ratio = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_fallback_shorter_than_debounce() {
        let mut config = Config::default();
        config.timing.fallback_ms = 2000;
        match config.validate() {
            Err(IntervoiceError::ConfigInvalidValue { key, .. }) => {
                assert_eq!(key, "timing.fallback_ms");
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_typewriter_and_bad_volume() {
        let mut config = Config::default();
        config.timing.typewriter_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.speech.volume = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch("on"), Some(true));
        assert_eq!(parse_switch(" OFF "), Some(false));
        assert_eq!(parse_switch("1"), Some(true));
        assert_eq!(parse_switch("later"), None);
    }

    #[test]
    fn test_to_toml_roundtrips_defaults() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
