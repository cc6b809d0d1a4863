use super::store::KeyValueStore;
use std::sync::Arc;

pub const KEY_API_KEY: &str = "kmn_openrouter_key";
pub const KEY_MODEL: &str = "kmn_openrouter_model";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPreference {
    pub api_key: String,
    pub model_id: String,
}

impl Default for ModelPreference {
    fn default() -> Self {
        Self { api_key: String::new(), model_id: DEFAULT_MODEL.to_string() }
    }
}

impl ModelPreference {
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model_id: model_id.into() }
    }

    /// Both a key and a model are present.
    pub fn is_ready(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.model_id.trim().is_empty()
    }
}

/// Storage failures are logged and swallowed; callers always get a usable preference.
#[derive(Clone)]
pub struct PreferenceStore {
    store: Arc<dyn KeyValueStore>,
}

impl PreferenceStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> ModelPreference {
        let api_key = match self.store.get(KEY_API_KEY) {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                log::warn!("Could not read API key preference: {e}");
                String::new()
            }
        };
        let model_id = match self.store.get(KEY_MODEL) {
            Ok(Some(m)) => m,
            Ok(None) => DEFAULT_MODEL.to_string(),
            Err(e) => {
                log::warn!("Could not read model preference: {e}");
                DEFAULT_MODEL.to_string()
            }
        };
        ModelPreference { api_key, model_id }
    }

    /// Writes both values and returns what was stored. A blank key removes the entry.
    pub fn save(&self, pref: &ModelPreference) -> ModelPreference {
        let api_key = pref.api_key.trim().to_string();
        let model_id = match pref.model_id.trim() {
            "" => DEFAULT_MODEL.to_string(),
            m => m.to_string(),
        };

        let key_result = if api_key.is_empty() {
            self.store.remove(KEY_API_KEY)
        } else {
            self.store.set(KEY_API_KEY, &api_key)
        };
        if let Err(e) = key_result {
            log::warn!("Could not persist API key: {e}");
        }
        if let Err(e) = self.store.set(KEY_MODEL, &model_id) {
            log::warn!("Could not persist model preference: {e}");
        }

        ModelPreference { api_key, model_id }
    }

    /// Removes the key only; the model choice survives.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(KEY_API_KEY) {
            log::warn!("Could not remove API key: {e}");
        }
    }
}
