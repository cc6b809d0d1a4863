use super::session::{unix_now, Session, User};
use crate::error::StudioError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Remote email/password auth service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, StudioError>;

    /// `None` when the account still awaits email confirmation.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, StudioError>;

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), StudioError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), StudioError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, StudioError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl From<TokenResponse> for Session {
    fn from(t: TokenResponse) -> Self {
        let expires_at = t.expires_at.or_else(|| t.expires_in.map(|secs| unix_now() + secs));
        Session {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            expires_at,
            user: t.user,
        }
    }
}

/// Client for a hosted GoTrue-style auth REST API (`{url}/auth/v1/...`).
pub struct SupabaseProvider {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseProvider {
    pub fn new(url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        }
    }

    async fn post(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
        body: Value,
        fallback: &str,
    ) -> Result<Value, StudioError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("Auth request: POST {url}");

        let res = self
            .client
            .post(&url)
            .query(query)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| StudioError::Auth(format!("{fallback}: {e}")))?;

        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            log::warn!("Auth request to {endpoint} rejected with status {status}");
            return Err(StudioError::Auth(
                provider_message(&parsed).unwrap_or_else(|| fallback.to_string()),
            ));
        }
        Ok(parsed)
    }
}

fn provider_message(body: &Value) -> Option<String> {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

fn parse_session(body: Value, fallback: &str) -> Result<Session, StudioError> {
    serde_json::from_value::<TokenResponse>(body)
        .map(Session::from)
        .map_err(|e| StudioError::Auth(format!("{fallback}: {e}")))
}

#[async_trait]
impl AuthProvider for SupabaseProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, StudioError> {
        let fallback = "Sign-in failed";
        let body = self
            .post(
                "token",
                &[("grant_type", "password")],
                None,
                json!({ "email": email, "password": password }),
                fallback,
            )
            .await?;
        parse_session(body, fallback)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, StudioError> {
        let fallback = "Sign-up failed";
        let body = self
            .post("signup", &[], None, json!({ "email": email, "password": password }), fallback)
            .await?;
        if body.get("access_token").is_some() {
            parse_session(body, fallback).map(Some)
        } else {
            Ok(None)
        }
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), StudioError> {
        self.post(
            "recover",
            &[("redirect_to", redirect_to)],
            None,
            json!({ "email": email }),
            "Password reset failed",
        )
        .await?;
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), StudioError> {
        self.post("logout", &[], Some(access_token), json!({}), "Sign-out failed")
            .await?;
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, StudioError> {
        let fallback = "Session refresh failed";
        let body = self
            .post(
                "token",
                &[("grant_type", "refresh_token")],
                None,
                json!({ "refresh_token": refresh_token }),
                fallback,
            )
            .await?;
        parse_session(body, fallback)
    }
}
