use crate::ai::client::OPENROUTER_URL;
use std::path::PathBuf;

pub const DEFAULT_APP_URL: &str = "http://localhost:5173/";
const APP_DIR_NAME: &str = "prompt-studio";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` when either auth setting is missing.
    pub auth: Option<AuthConfig>,
    /// The app's own origin and path, sent as referer and used as the reset redirect.
    pub app_url: String,
    pub llm_endpoint: String,
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let auth = match (non_blank("SUPABASE_URL"), non_blank("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(AuthConfig { url, anon_key }),
            _ => {
                log::warn!("SUPABASE_URL / SUPABASE_ANON_KEY not set; auth is unavailable");
                None
            }
        };

        Self {
            auth,
            app_url: non_blank("PROMPT_STUDIO_APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            llm_endpoint: non_blank("PROMPT_STUDIO_LLM_ENDPOINT").unwrap_or_else(|| OPENROUTER_URL.to_string()),
            data_dir: non_blank("PROMPT_STUDIO_DATA_DIR")
                .map(PathBuf::from)
                .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR_NAME))),
        }
    }
}
