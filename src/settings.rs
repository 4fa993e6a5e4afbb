// Import necessary libraries and modules for file I/O and serialization.
use crate::error::StorageError;
use crate::storage::{Storage, default_data_dir};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Fixed storage key for the narration settings blob.
pub const SETTINGS_KEY: &str = "fateweaver_settings";

// Define a structure to hold application settings with serialization and
// deserialization capabilities.
#[derive(Serialize, Deserialize, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>, // Optional API key for the model provider.
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            openai_api_key: None, // No API key by default.
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Settings {
    fn default_path() -> PathBuf {
        default_data_dir().join("settings.json")
    }

    // Load settings from the default file path, falling back to defaults when
    // no file exists yet.
    pub fn load() -> io::Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    // Save current settings to the default file path.
    pub fn save(&self) -> io::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Narration preferences, persisted under [`SETTINGS_KEY`].
///
/// Loaded field-by-field: fields missing from (or mistyped in) the stored
/// blob keep their defaults, so new fields can be added without breaking old
/// blobs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSettings {
    pub enabled: bool,
    #[serde(rename = "voiceURI")]
    pub voice_uri: Option<String>,
    pub rate: f64,
    pub pitch: f64,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        SpeechSettings {
            enabled: false,
            voice_uri: None,
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

impl SpeechSettings {
    /// Loads from the blob store, merging stored fields over the defaults.
    /// An unreadable blob yields the defaults rather than an error.
    pub fn load(storage: &impl Storage) -> Result<Self, StorageError> {
        let mut settings = Self::default();
        let Some(raw) = storage.read(SETTINGS_KEY)? else {
            return Ok(settings);
        };
        let Ok(stored) = serde_json::from_str::<Value>(&raw) else {
            return Ok(settings);
        };

        if let Some(enabled) = stored.get("enabled").and_then(Value::as_bool) {
            settings.enabled = enabled;
        }
        match stored.get("voiceURI") {
            Some(Value::String(uri)) => settings.voice_uri = Some(uri.clone()),
            Some(Value::Null) => settings.voice_uri = None,
            _ => {}
        }
        if let Some(rate) = stored.get("rate").and_then(Value::as_f64) {
            settings.rate = rate;
        }
        if let Some(pitch) = stored.get("pitch").and_then(Value::as_f64) {
            settings.pitch = pitch;
        }
        Ok(settings)
    }

    pub fn save(&self, storage: &impl Storage) -> Result<(), StorageError> {
        let data = serde_json::to_string(self).expect("SpeechSettings serializes");
        storage.write(SETTINGS_KEY, &data)
    }
}
