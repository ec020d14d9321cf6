//! Settings Storage
//!
//! User settings live behind an injected [`ConfigStore`] instead of global
//! state. What is allowed to reach the store is decided by a
//! [`PersistencePolicy`]: the API key is only written when the user opted
//! in, and saved action configs and presets only when presets are allowed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Store keys
pub mod keys {
    pub const PROVIDER: &str = "provider";
    pub const API_KEY: &str = "apiKey";
    pub const LOCAL_URL: &str = "localUrl";
    pub const LOCAL_MODEL: &str = "localModel";
    pub const MODEL: &str = "model";
    pub const CUSTOM_PROMPT: &str = "customPrompt";
    pub const GLOSSARY_REPLACE: &str = "glossaryReplace";
    pub const GLOSSARY_AVOID: &str = "glossaryAvoid";
    pub const ACTION_CONFIGS: &str = "actionConfigs";
    pub const USER_PRESETS: &str = "userPresets";
    pub const PERSIST_API_KEY: &str = "privacySaveKey";
    pub const PERSIST_PRESETS: &str = "privacySavePresets";
    pub const CONTEXT_AWARENESS: &str = "contextAwareness";
    /// Unknown settings fields, kept together under one key
    pub const EXTRA_SETTINGS: &str = "extraSettings";

    /// Keys an unknown settings field may never write
    pub const RESERVED: [&str; 14] = [
        PROVIDER,
        API_KEY,
        LOCAL_URL,
        LOCAL_MODEL,
        MODEL,
        CUSTOM_PROMPT,
        GLOSSARY_REPLACE,
        GLOSSARY_AVOID,
        ACTION_CONFIGS,
        USER_PRESETS,
        PERSIST_API_KEY,
        PERSIST_PRESETS,
        CONTEXT_AWARENESS,
        EXTRA_SETTINGS,
    ];
}

/// Version written into exported settings files
pub const EXPORT_VERSION: &str = "1.0";

/// Key/value settings storage
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Non-empty string value for `key`
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key)?.and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }))
    }

    /// Boolean value for `key`, accepting `true` and `"true"`
    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(match self.get(key)? {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s == "true",
            _ => default,
        })
    }
}

/// In-memory store (for development/testing)
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object on disk, rewritten on every change
#[derive(Debug)]
pub struct JsonFileConfigStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonFileConfigStore {
    /// Open `path`, starting empty if the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = values.len(), "settings file opened");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// What may be written to the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistencePolicy {
    pub persist_api_key: bool,
    pub persist_presets: bool,
}

impl Default for PersistencePolicy {
    fn default() -> Self {
        Self {
            persist_api_key: false,
            persist_presets: true,
        }
    }
}

/// User-editable settings, as carried in the export file's `settings` object
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub local_url: String,
    #[serde(default)]
    pub local_model: String,
    #[serde(default)]
    pub custom_prompt: String,
    #[serde(default)]
    pub glossary_replace: String,
    #[serde(default)]
    pub glossary_avoid: String,

    /// Fields this version does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Settings export/import file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsExport {
    pub version: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub settings: EditorSettings,
    #[serde(default)]
    pub action_configs: Map<String, Value>,
    #[serde(default)]
    pub user_presets: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SettingsExport {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Reads and writes settings through a [`ConfigStore`], applying the persistence policy
#[derive(Clone)]
pub struct SettingsManager {
    store: Arc<dyn ConfigStore>,
}

impl SettingsManager {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    pub fn policy(&self) -> Result<PersistencePolicy> {
        let defaults = PersistencePolicy::default();
        Ok(PersistencePolicy {
            persist_api_key: self.store.get_bool(keys::PERSIST_API_KEY, defaults.persist_api_key)?,
            persist_presets: self.store.get_bool(keys::PERSIST_PRESETS, defaults.persist_presets)?,
        })
    }

    /// Change the policy. Turning off key persistence forgets any stored key.
    pub fn set_policy(&self, policy: PersistencePolicy) -> Result<()> {
        self.store.set(keys::PERSIST_API_KEY, Value::Bool(policy.persist_api_key))?;
        self.store.set(keys::PERSIST_PRESETS, Value::Bool(policy.persist_presets))?;
        if !policy.persist_api_key {
            self.store.remove(keys::API_KEY)?;
        }
        Ok(())
    }

    /// Whether runs should see an excerpt of the document
    pub fn context_awareness(&self) -> Result<bool> {
        self.store.get_bool(keys::CONTEXT_AWARENESS, true)
    }

    pub fn set_context_awareness(&self, enabled: bool) -> Result<()> {
        self.store.set(keys::CONTEXT_AWARENESS, Value::Bool(enabled))
    }

    pub fn load(&self) -> Result<EditorSettings> {
        let policy = self.policy()?;
        let string = |key: &str| -> Result<String> { Ok(self.store.get_string(key)?.unwrap_or_default()) };

        Ok(EditorSettings {
            provider: self.store.get_string(keys::PROVIDER)?.unwrap_or_else(|| "openai".into()),
            api_key: if policy.persist_api_key {
                string(keys::API_KEY)?
            } else {
                String::new()
            },
            local_url: string(keys::LOCAL_URL)?,
            local_model: string(keys::LOCAL_MODEL)?,
            custom_prompt: string(keys::CUSTOM_PROMPT)?,
            glossary_replace: string(keys::GLOSSARY_REPLACE)?,
            glossary_avoid: string(keys::GLOSSARY_AVOID)?,
            extra: self.object(keys::EXTRA_SETTINGS)?,
        })
    }

    pub fn save(&self, settings: &EditorSettings) -> Result<()> {
        let policy = self.policy()?;

        if policy.persist_api_key {
            self.store.set(keys::API_KEY, Value::String(settings.api_key.clone()))?;
        } else {
            tracing::debug!("api key not persisted by policy");
        }

        for (key, value) in [
            (keys::PROVIDER, &settings.provider),
            (keys::LOCAL_URL, &settings.local_url),
            (keys::LOCAL_MODEL, &settings.local_model),
            (keys::CUSTOM_PROMPT, &settings.custom_prompt),
            (keys::GLOSSARY_REPLACE, &settings.glossary_replace),
            (keys::GLOSSARY_AVOID, &settings.glossary_avoid),
        ] {
            self.store.set(key, Value::String(value.clone()))?;
        }
        let mut extra = Map::new();
        for (key, value) in &settings.extra {
            if keys::RESERVED.contains(&key.as_str()) {
                tracing::warn!(key = %key, "reserved settings key ignored");
                continue;
            }
            extra.insert(key.clone(), value.clone());
        }
        self.store.set(keys::EXTRA_SETTINGS, Value::Object(extra))?;
        Ok(())
    }

    fn object(&self, key: &str) -> Result<Map<String, Value>> {
        Ok(match self.store.get(key)? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        })
    }

    pub fn action_configs(&self) -> Result<Map<String, Value>> {
        if !self.policy()?.persist_presets {
            return Ok(Map::new());
        }
        self.object(keys::ACTION_CONFIGS)
    }

    pub fn user_presets(&self) -> Result<Map<String, Value>> {
        if !self.policy()?.persist_presets {
            return Ok(Map::new());
        }
        self.object(keys::USER_PRESETS)
    }

    /// Store the configuration of one action. Returns `false` when the policy forbids it.
    pub fn save_action_config(&self, action: &str, config: Value) -> Result<bool> {
        self.save_entry(keys::ACTION_CONFIGS, action, config)
    }

    /// Store a named preset. Returns `false` when the policy forbids it.
    pub fn save_user_preset(&self, name: &str, preset: Value) -> Result<bool> {
        self.save_entry(keys::USER_PRESETS, name, preset)
    }

    fn save_entry(&self, key: &str, name: &str, value: Value) -> Result<bool> {
        if !self.policy()?.persist_presets {
            return Ok(false);
        }
        let mut map = self.object(key)?;
        map.insert(name.to_string(), value);
        self.store.set(key, Value::Object(map))?;
        Ok(true)
    }

    /// Snapshot everything into an export file
    pub fn export(&self) -> Result<SettingsExport> {
        Ok(SettingsExport {
            version: EXPORT_VERSION.to_string(),
            date: Some(Utc::now()),
            settings: self.load()?,
            action_configs: self.action_configs()?,
            user_presets: self.user_presets()?,
            extra: Map::new(),
        })
    }

    /// Apply an export file. Empty action config and preset maps leave the stored ones alone.
    pub fn import(&self, export: &SettingsExport) -> Result<()> {
        self.save(&export.settings)?;

        if self.policy()?.persist_presets {
            if !export.action_configs.is_empty() {
                self.store
                    .set(keys::ACTION_CONFIGS, Value::Object(export.action_configs.clone()))?;
            }
            if !export.user_presets.is_empty() {
                self.store
                    .set(keys::USER_PRESETS, Value::Object(export.user_presets.clone()))?;
            }
        }

        tracing::info!(version = %export.version, "settings imported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn manager() -> SettingsManager {
        SettingsManager::new(Arc::new(MemoryConfigStore::new()))
    }

    #[test]
    fn api_key_is_not_persisted_by_default() {
        let settings = manager();
        settings
            .save(&EditorSettings {
                provider: "claude".into(),
                api_key: "sk-secret".into(),
                ..Default::default()
            })
            .unwrap();

        assert!(settings.store().get(keys::API_KEY).unwrap().is_none());
        let loaded = settings.load().unwrap();
        assert_eq!(loaded.provider, "claude");
        assert!(loaded.api_key.is_empty());
    }

    #[test]
    fn imported_settings_cannot_change_the_policy() {
        let settings = manager();
        let export = SettingsExport::from_json(
            r#"{"version":"1.0","settings":{"privacySaveKey":true,"contextAwareness":false,"theme":"dark"}}"#,
        )
        .unwrap();
        settings.import(&export).unwrap();

        assert!(!settings.policy().unwrap().persist_api_key);
        assert!(settings.context_awareness().unwrap());

        let export = SettingsExport::from_json(r#"{"version":"1.0","settings":{"apiKey":"sk-leak"}}"#).unwrap();
        settings.import(&export).unwrap();
        assert!(settings.store().get(keys::API_KEY).unwrap().is_none());
    }

    #[test]
    fn unknown_settings_survive_import_and_export() {
        let settings = manager();
        let export = SettingsExport::from_json(
            r#"{"version":"1.0","settings":{"provider":"gemini","theme":"dark","fontScale":1.25}}"#,
        )
        .unwrap();
        settings.import(&export).unwrap();

        let exported = settings.export().unwrap();
        assert_eq!(exported.settings.provider, "gemini");
        assert_eq!(exported.settings.extra["theme"], "dark");
        assert_eq!(exported.settings.extra["fontScale"], 1.25);
        assert!(settings.store().get("theme").unwrap().is_none());

        let json: Value = serde_json::from_str(&exported.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["settings"]["theme"], "dark");
    }

    #[test]
    fn api_key_persisted_when_allowed_and_forgotten_when_revoked() {
        let settings = manager();
        settings
            .set_policy(PersistencePolicy {
                persist_api_key: true,
                persist_presets: true,
            })
            .unwrap();
        settings
            .save(&EditorSettings {
                api_key: "sk-secret".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.load().unwrap().api_key, "sk-secret");

        settings.set_policy(PersistencePolicy::default()).unwrap();
        assert!(settings.store().get(keys::API_KEY).unwrap().is_none());
    }

    #[test]
    fn presets_respect_policy() {
        let settings = manager();
        assert!(settings.save_user_preset("terse", json!({"tone": "neutral"})).unwrap());
        assert_eq!(settings.user_presets().unwrap().len(), 1);

        settings
            .set_policy(PersistencePolicy {
                persist_api_key: false,
                persist_presets: false,
            })
            .unwrap();
        assert!(!settings.save_action_config("formal", json!({})).unwrap());
        assert!(settings.user_presets().unwrap().is_empty());
    }

    #[test]
    fn export_preserves_unknown_fields() {
        let text = r#"{
            "version": "1.0",
            "date": "2024-05-01T12:00:00.000Z",
            "settings": { "provider": "gemini", "theme": "dark" },
            "actionConfigs": { "formal": { "tone": "authoritative" } },
            "userPresets": {},
            "exportedBy": "desktop"
        }"#;

        let export = SettingsExport::from_json(text).unwrap();
        assert_eq!(export.settings.provider, "gemini");
        assert_eq!(export.settings.extra["theme"], "dark");
        assert_eq!(export.extra["exportedBy"], "desktop");

        let value: Value = serde_json::from_str(&export.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["settings"]["theme"], "dark");
        assert_eq!(value["exportedBy"], "desktop");
        assert_eq!(value["actionConfigs"]["formal"]["tone"], "authoritative");
    }

    #[test]
    fn import_then_export_round_trips_settings() {
        let settings = manager();
        let mut incoming = SettingsExport::from_json(
            r#"{"version":"1.0","settings":{"provider":"local","localUrl":"http://127.0.0.1:8080/v1/chat/completions","glossaryAvoid":"utilize"}}"#,
        )
        .unwrap();
        incoming.action_configs.insert("concise".into(), json!({"instructions": "short"}));
        settings.import(&incoming).unwrap();

        let exported = settings.export().unwrap();
        assert_eq!(exported.version, EXPORT_VERSION);
        assert_eq!(exported.settings.provider, "local");
        assert_eq!(exported.settings.glossary_avoid, "utilize");
        assert_eq!(exported.action_configs["concise"]["instructions"], "short");
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonFileConfigStore::open(&path).unwrap();
        store.set(keys::PROVIDER, json!("claude")).unwrap();
        store.set(keys::CONTEXT_AWARENESS, json!(false)).unwrap();
        drop(store);

        let reopened = JsonFileConfigStore::open(&path).unwrap();
        assert_eq!(reopened.get_string(keys::PROVIDER).unwrap().as_deref(), Some("claude"));
        assert!(!reopened.get_bool(keys::CONTEXT_AWARENESS, true).unwrap());

        reopened.remove(keys::PROVIDER).unwrap();
        let again = JsonFileConfigStore::open(&path).unwrap();
        assert!(again.get(keys::PROVIDER).unwrap().is_none());
    }
}
