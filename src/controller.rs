use crate::ai::client::RefinementClient;
use crate::auth::gateway::{AuthGateway, AuthSubscription};
use crate::auth::session::{AuthChange, Session};
use crate::core::preferences::{ModelPreference, PreferenceStore, DEFAULT_MODEL};
use crate::core::template::{self, Field, PromptFields, ToolMode};
use crate::error::StudioError;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const FLASH_DURATION: Duration = Duration::from_millis(1400);

const SIGN_UP_NOTICE: &str =
    "Sign-up succeeded. If email verification is enabled, confirm via the link sent to your inbox.";
const RESET_NOTICE: &str = "Password reset email sent. Check your inbox and spam folder.";
const MISSING_CONFIG: &str = "SUPABASE_URL and SUPABASE_ANON_KEY must be set";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthView {
    #[default]
    Login,
    Signup,
    Reset,
}

impl FromStr for AuthView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "login" => Ok(AuthView::Login),
            "signup" => Ok(AuthView::Signup),
            "reset" => Ok(AuthView::Reset),
            other => Err(format!("unknown view '{other}' (expected login, signup or reset)")),
        }
    }
}

impl fmt::Display for AuthView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthView::Login => "login",
            AuthView::Signup => "signup",
            AuthView::Reset => "reset",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Booting,
    Unauthenticated(AuthView),
    Authenticated(ToolMode),
}

#[derive(Debug, Clone, Copy)]
struct Flash {
    text: &'static str,
    until: Instant,
}

impl Flash {
    fn new(text: &'static str, now: Instant) -> Self {
        Self { text, until: now + FLASH_DURATION }
    }

    fn visible_at(&self, now: Instant) -> Option<&'static str> {
        (now < self.until).then_some(self.text)
    }
}

#[derive(Debug, Default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub busy: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Default)]
pub struct SettingsDialog {
    pub open: bool,
    pub draft_key: String,
    pub draft_model: String,
    pub show_key: bool,
    saved: Option<Flash>,
}

impl SettingsDialog {
    pub fn flash_at(&self, now: Instant) -> Option<&'static str> {
        self.saved.and_then(|f| f.visible_at(now))
    }

    pub fn displayed_key(&self) -> String {
        if self.show_key {
            self.draft_key.clone()
        } else {
            "•".repeat(self.draft_key.chars().count())
        }
    }
}

/// A refinement request captured at the generation it was started in.
#[derive(Debug, Clone)]
pub struct PendingRefinement {
    pub generation: u64,
    api_key: String,
    model: String,
    draft: String,
}

impl PendingRefinement {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub async fn run(self, client: &RefinementClient) -> RefinementOutcome {
        let result = client.refine(&self.api_key, &self.model, &self.draft).await;
        RefinementOutcome { generation: self.generation, result }
    }
}

#[derive(Debug)]
pub struct RefinementOutcome {
    pub generation: u64,
    pub result: Result<String, StudioError>,
}

/// Owns all view state. Every mutation happens in response to one event at a time.
pub struct Controller {
    gateway: Option<Arc<AuthGateway>>,
    subscription: Option<AuthSubscription>,
    prefs: PreferenceStore,
    redirect_url: String,

    booting: bool,
    session: Option<Session>,
    auth_view: AuthView,
    pub auth: AuthForm,

    tool: ToolMode,
    pub fields: PromptFields,
    output: String,
    copied: Option<Flash>,
    ai_error: Option<String>,
    in_flight: Option<u64>,
    generation: u64,

    preference: ModelPreference,
    pub settings: SettingsDialog,
}

impl Controller {
    pub fn new(gateway: Option<Arc<AuthGateway>>, prefs: PreferenceStore, redirect_url: impl Into<String>) -> Self {
        let subscription = gateway.as_ref().map(|g| g.subscribe());
        let preference = prefs.load();
        Self {
            gateway,
            subscription,
            prefs,
            redirect_url: redirect_url.into(),
            booting: true,
            session: None,
            auth_view: AuthView::default(),
            auth: AuthForm::default(),
            tool: ToolMode::default(),
            fields: PromptFields::prefilled(),
            output: String::new(),
            copied: None,
            ai_error: None,
            in_flight: None,
            generation: 0,
            preference,
            settings: SettingsDialog::default(),
        }
    }

    /// Resolve the current session. Without auth configuration this settles immediately.
    pub async fn boot(&mut self) {
        match self.gateway.clone() {
            Some(gateway) => {
                gateway.get_session().await;
                self.drain_auth_changes();
            }
            None => log::warn!("Auth is not configured"),
        }
        self.booting = false;
    }

    pub fn state(&self) -> AppState {
        if self.booting {
            AppState::Booting
        } else if self.session.is_some() {
            AppState::Authenticated(self.tool)
        } else {
            AppState::Unauthenticated(self.auth_view)
        }
    }

    pub fn config_missing(&self) -> bool {
        self.gateway.is_none()
    }

    pub fn user_email(&self) -> &str {
        self.session.as_ref().map(Session::email).unwrap_or_default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn ai_error(&self) -> Option<&str> {
        self.ai_error.as_deref()
    }

    pub fn ai_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn copied_at(&self, now: Instant) -> bool {
        self.copied.and_then(|f| f.visible_at(now)).is_some()
    }

    pub fn preference(&self) -> &ModelPreference {
        &self.preference
    }

    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    fn is_authenticated(&self) -> bool {
        matches!(self.state(), AppState::Authenticated(_))
    }

    // --- session ---

    pub async fn next_auth_change(&mut self) -> Option<AuthChange> {
        match &mut self.subscription {
            Some(sub) => sub.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Apply every change the gateway has queued so far, in order.
    fn drain_auth_changes(&mut self) {
        while let Some(change) = self.subscription.as_mut().and_then(AuthSubscription::try_recv) {
            self.handle_auth_change(change);
        }
    }

    pub fn handle_auth_change(&mut self, change: AuthChange) {
        log::debug!("Auth change: {:?}", change.event);
        self.apply_session(change.session);
        self.booting = false;
    }

    fn apply_session(&mut self, session: Option<Session>) {
        if session.is_none() && self.session.is_some() {
            self.on_signed_out();
        }
        self.session = session;
    }

    fn on_signed_out(&mut self) {
        self.session = None;
        self.output.clear();
        self.copied = None;
        self.fields.topic.clear();
        self.fields.context.clear();
        self.auth_view = AuthView::Login;
        self.auth.notice = None;
        self.auth.error = None;
        self.ai_error = None;
        self.abandon_in_flight();
    }

    fn abandon_in_flight(&mut self) {
        self.generation += 1;
        if let Some(generation) = self.in_flight.take() {
            log::debug!("Abandoning refinement from generation {generation}");
        }
    }

    // --- auth actions ---

    pub fn set_auth_view(&mut self, view: AuthView) {
        self.auth_view = view;
    }

    fn gateway_for_action(&mut self) -> Option<Arc<AuthGateway>> {
        self.auth.error = None;
        self.auth.notice = None;
        match &self.gateway {
            Some(g) => Some(g.clone()),
            None => {
                self.auth.error = Some(StudioError::Configuration(MISSING_CONFIG.into()).to_string());
                None
            }
        }
    }

    fn credentials_present(&mut self, need_password: bool) -> bool {
        if self.auth.email.trim().is_empty() || (need_password && self.auth.password.is_empty()) {
            self.auth.error = Some(if need_password {
                "Enter your email and password.".into()
            } else {
                "Enter your email.".into()
            });
            return false;
        }
        true
    }

    pub async fn sign_in(&mut self) {
        let Some(gateway) = self.gateway_for_action() else { return };
        if !self.credentials_present(true) {
            return;
        }
        self.auth.busy = true;
        match gateway.sign_in(&self.auth.email, &self.auth.password).await {
            Ok(_) => {
                self.auth.password.clear();
                self.drain_auth_changes();
            }
            Err(e) => self.auth.error = Some(e.to_string()),
        }
        self.auth.busy = false;
    }

    pub async fn sign_up(&mut self) {
        let Some(gateway) = self.gateway_for_action() else { return };
        if !self.credentials_present(true) {
            return;
        }
        self.auth.busy = true;
        match gateway.sign_up(&self.auth.email, &self.auth.password).await {
            Ok(_) => {
                self.auth.notice = Some(SIGN_UP_NOTICE.into());
                self.auth.password.clear();
                self.drain_auth_changes();
            }
            Err(e) => self.auth.error = Some(e.to_string()),
        }
        self.auth.busy = false;
    }

    pub async fn request_password_reset(&mut self) {
        let Some(gateway) = self.gateway_for_action() else { return };
        if !self.credentials_present(false) {
            return;
        }
        self.auth.busy = true;
        match gateway.request_password_reset(&self.auth.email, &self.redirect_url).await {
            Ok(()) => self.auth.notice = Some(RESET_NOTICE.into()),
            Err(e) => self.auth.error = Some(e.to_string()),
        }
        self.auth.busy = false;
    }

    pub async fn sign_out(&mut self) {
        let Some(gateway) = self.gateway.clone() else { return };
        match gateway.sign_out().await {
            Ok(()) => self.drain_auth_changes(),
            Err(e) => log::warn!("Sign-out failed: {e}"),
        }
    }

    pub async fn refresh_session(&mut self) {
        let Some(gateway) = self.gateway_for_action() else { return };
        match gateway.refresh().await {
            Ok(_) => self.drain_auth_changes(),
            Err(e) => self.auth.error = Some(e.to_string()),
        }
    }

    /// Unregister from the gateway. Dropping the controller does the same.
    pub fn shutdown(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
    }

    // --- prompt actions ---

    pub fn select_tool(&mut self, tool: ToolMode) {
        self.tool = tool;
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.fields.set(field, value);
    }

    fn ready_to_generate(&mut self) -> bool {
        self.ai_error = None;
        if !self.is_authenticated() {
            self.ai_error = Some("Sign in to generate prompts.".into());
            return false;
        }
        if self.ai_busy() {
            self.ai_error = Some("A refinement is already running.".into());
            return false;
        }
        if self.fields.topic.trim().is_empty() {
            self.ai_error = Some("Enter a topic first.".into());
            return false;
        }
        true
    }

    pub fn generate_template(&mut self) {
        if !self.ready_to_generate() {
            return;
        }
        self.output = template::render(self.tool, &self.fields);
        self.copied = None;
    }

    /// Validate and capture a refinement request. `None` means nothing should be sent.
    pub fn begin_refinement(&mut self) -> Option<PendingRefinement> {
        if !self.ready_to_generate() {
            return None;
        }
        let api_key = self.preference.api_key.trim().to_string();
        if api_key.is_empty() {
            self.ai_error = Some("No API key set yet. Add one in settings.".into());
            return None;
        }
        let model = match self.preference.model_id.trim() {
            "" => DEFAULT_MODEL.to_string(),
            m => m.to_string(),
        };

        self.in_flight = Some(self.generation);
        Some(PendingRefinement {
            generation: self.generation,
            api_key,
            model,
            draft: template::render(self.tool, &self.fields),
        })
    }

    /// Apply a finished refinement. Returns false when its generation is stale.
    pub fn finish_refinement(&mut self, outcome: RefinementOutcome) -> bool {
        if outcome.generation != self.generation {
            log::info!(
                "Discarding refinement from generation {} (now {})",
                outcome.generation,
                self.generation
            );
            return false;
        }
        self.in_flight = None;
        match outcome.result {
            Ok(text) => {
                self.output = text;
                self.copied = None;
            }
            Err(e) => {
                log::warn!("Refinement failed: {e}");
                self.ai_error = Some(e.to_string());
            }
        }
        true
    }

    /// Clear topic, context and output. Refused while a refinement is running.
    pub fn reset_form(&mut self) -> bool {
        if self.ai_busy() {
            return false;
        }
        self.fields.topic.clear();
        self.fields.context.clear();
        self.output.clear();
        self.copied = None;
        self.ai_error = None;
        self.generation += 1;
        true
    }

    /// Write the output to `sink`. Failures are ignored.
    pub fn copy_output(&mut self, sink: &mut impl Write, now: Instant) {
        if self.output.is_empty() {
            return;
        }
        match writeln!(sink, "{}", self.output).and_then(|_| sink.flush()) {
            Ok(()) => self.copied = Some(Flash::new("Copied", now)),
            Err(e) => log::debug!("Copy failed: {e}"),
        }
    }

    // --- settings ---

    pub fn open_settings(&mut self) {
        self.settings = SettingsDialog {
            open: true,
            draft_key: self.preference.api_key.clone(),
            draft_model: self.preference.model_id.clone(),
            show_key: false,
            saved: None,
        };
    }

    pub fn close_settings(&mut self) {
        self.settings.open = false;
    }

    pub fn save_settings(&mut self, now: Instant) {
        let draft = ModelPreference::new(self.settings.draft_key.clone(), self.settings.draft_model.clone());
        self.preference = self.prefs.save(&draft);
        self.settings.draft_key = self.preference.api_key.clone();
        self.settings.draft_model = self.preference.model_id.clone();
        self.settings.saved = Some(Flash::new("Saved", now));
    }

    pub fn clear_key(&mut self, now: Instant) {
        self.settings.draft_key.clear();
        self.preference.api_key.clear();
        self.prefs.clear();
        self.settings.saved = Some(Flash::new("Key removed", now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::gateway::tests::{session_for, FakeProvider};
    use crate::auth::gateway::KEY_SESSION;
    use crate::auth::session::AuthEvent;
    use crate::core::preferences::KEY_API_KEY;
    use crate::core::store::{KeyValueStore, MemoryStore};
    use std::sync::atomic::Ordering;

    struct Harness {
        provider: Arc<FakeProvider>,
        store: Arc<MemoryStore>,
        gateway: Arc<AuthGateway>,
    }

    impl Harness {
        fn new() -> Self {
            let provider = Arc::new(FakeProvider::default());
            let store = Arc::new(MemoryStore::new());
            let gateway = Arc::new(AuthGateway::new(provider.clone(), store.clone()));
            Self { provider, store, gateway }
        }

        fn controller(&self) -> Controller {
            Controller::new(
                Some(self.gateway.clone()),
                PreferenceStore::new(self.store.clone()),
                "http://localhost:5173/",
            )
        }

        fn calls(&self) -> usize {
            self.provider.calls.load(Ordering::SeqCst)
        }
    }

    async fn signed_in(h: &Harness) -> Controller {
        let mut c = h.controller();
        c.boot().await;
        c.auth.email = "dev@example.com".into();
        c.auth.password = "secret".into();
        c.sign_in().await;
        assert_eq!(c.state(), AppState::Authenticated(ToolMode::Coding));
        c
    }

    fn with_key(c: &mut Controller) {
        c.open_settings();
        c.settings.draft_key = "sk-test".into();
        c.save_settings(Instant::now());
    }

    #[tokio::test]
    async fn missing_configuration_blocks_auth() {
        let mut c = Controller::new(None, PreferenceStore::new(Arc::new(MemoryStore::new())), "http://x/");
        assert_eq!(c.state(), AppState::Booting);
        c.boot().await;

        assert!(c.config_missing());
        assert_eq!(c.state(), AppState::Unauthenticated(AuthView::Login));

        c.auth.email = "dev@example.com".into();
        c.auth.password = "secret".into();
        c.sign_in().await;
        assert!(c.auth.error.as_deref().unwrap().starts_with("Configuration missing"));
        assert_eq!(c.state(), AppState::Unauthenticated(AuthView::Login));
    }

    #[tokio::test]
    async fn boot_restores_persisted_session() {
        let h = Harness::new();
        let session = session_for("dev@example.com", None);
        h.store.set(KEY_SESSION, &serde_json::to_string(&session).unwrap()).unwrap();

        let mut c = h.controller();
        c.boot().await;
        assert_eq!(c.state(), AppState::Authenticated(ToolMode::Coding));
        assert_eq!(c.user_email(), "dev@example.com");
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn sign_in_clears_password_and_authenticates() {
        let h = Harness::new();
        let c = signed_in(&h).await;
        assert!(c.auth.password.is_empty());
        assert_eq!(c.auth.error, None);
        assert!(!c.auth.busy);
    }

    #[tokio::test]
    async fn rejected_sign_in_is_reported_inline() {
        let h = Harness::new();
        let mut c = h.controller();
        c.boot().await;
        c.auth.email = "dev@example.com".into();
        c.auth.password = "wrong".into();
        c.sign_in().await;

        assert_eq!(c.auth.error.as_deref(), Some("Invalid login credentials"));
        assert_eq!(c.auth.password, "wrong");
        assert_eq!(c.state(), AppState::Unauthenticated(AuthView::Login));
    }

    #[tokio::test]
    async fn blank_credentials_skip_the_provider() {
        let h = Harness::new();
        let mut c = h.controller();
        c.boot().await;

        c.auth.email = "   ".into();
        c.auth.password = "secret".into();
        c.sign_in().await;
        c.request_password_reset().await;
        c.auth.email = "dev@example.com".into();
        c.auth.password.clear();
        c.sign_up().await;

        assert_eq!(h.calls(), 0);
        assert_eq!(c.auth.error.as_deref(), Some("Enter your email and password."));
    }

    #[tokio::test]
    async fn sign_up_and_reset_surface_notices() {
        let h = Harness::new();
        let mut c = h.controller();
        c.boot().await;
        c.set_auth_view(AuthView::Reset);
        c.auth.email = "dev@example.com".into();
        c.request_password_reset().await;
        assert_eq!(c.auth.notice.as_deref(), Some(RESET_NOTICE));
        assert_eq!(c.state(), AppState::Unauthenticated(AuthView::Reset));

        c.set_auth_view(AuthView::Signup);
        c.auth.password = "pw".into();
        c.sign_up().await;
        assert_eq!(c.auth.notice.as_deref(), Some(SIGN_UP_NOTICE));
        assert!(c.auth.password.is_empty());
        assert_eq!(c.state(), AppState::Authenticated(ToolMode::Coding));
    }

    #[tokio::test]
    async fn template_generation_requires_topic() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;

        c.generate_template();
        assert_eq!(c.ai_error(), Some("Enter a topic first."));
        assert!(c.output().is_empty());

        c.select_tool(ToolMode::Video);
        c.set_field(Field::Topic, "Sunrise over Bagan");
        c.generate_template();
        assert_eq!(c.ai_error(), None);
        assert!(c.output().contains("Scene: Sunrise over Bagan"));
        assert_eq!(c.state(), AppState::Authenticated(ToolMode::Video));
    }

    #[tokio::test]
    async fn generation_is_gated_on_session() {
        let h = Harness::new();
        let mut c = h.controller();
        c.boot().await;
        c.set_field(Field::Topic, "anything");
        c.generate_template();
        assert!(c.output().is_empty());
        assert!(c.begin_refinement().is_none());
    }

    #[tokio::test]
    async fn refinement_without_key_sends_nothing() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        c.set_field(Field::Topic, "JWT login");

        assert!(c.begin_refinement().is_none());
        assert!(c.ai_error().unwrap().contains("API key"));
        assert!(!c.ai_busy());
    }

    #[tokio::test]
    async fn refinement_result_is_applied_for_current_generation() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        with_key(&mut c);
        c.set_field(Field::Topic, "JWT login");

        let pending = c.begin_refinement().unwrap();
        assert!(pending.draft().contains("JWT login"));
        assert!(c.ai_busy());
        assert!(c.begin_refinement().is_none());

        let applied = c.finish_refinement(RefinementOutcome {
            generation: pending.generation,
            result: Ok("Refined prompt".into()),
        });
        assert!(applied);
        assert_eq!(c.output(), "Refined prompt");
        assert!(!c.ai_busy());
    }

    #[tokio::test]
    async fn refinement_error_is_reported_inline() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        with_key(&mut c);
        c.set_field(Field::Topic, "JWT login");

        let pending = c.begin_refinement().unwrap();
        c.finish_refinement(RefinementOutcome {
            generation: pending.generation,
            result: Err(StudioError::Request { status: 401, detail: "bad key".into() }),
        });
        assert_eq!(c.ai_error(), Some("request failed (401): bad key"));
        assert!(c.output().is_empty());
    }

    #[tokio::test]
    async fn sign_out_discards_pending_refinement() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        with_key(&mut c);
        c.set_field(Field::Topic, "JWT login");
        c.generate_template();
        assert!(!c.output().is_empty());

        let pending = c.begin_refinement().unwrap();
        c.sign_out().await;
        assert!(c.output().is_empty());
        assert!(c.fields.topic.is_empty());
        assert_eq!(c.state(), AppState::Unauthenticated(AuthView::Login));

        let applied = c.finish_refinement(RefinementOutcome {
            generation: pending.generation,
            result: Ok("late result".into()),
        });
        assert!(!applied);
        assert!(c.output().is_empty());
    }

    #[tokio::test]
    async fn pushed_sign_out_clears_output() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        c.set_field(Field::Topic, "JWT login");
        c.generate_template();

        h.gateway.sign_out().await.unwrap();
        loop {
            let change = c.next_auth_change().await.unwrap();
            let done = change.event == AuthEvent::SignedOut;
            c.handle_auth_change(change);
            if done {
                break;
            }
        }
        assert!(c.output().is_empty());
        assert_eq!(c.state(), AppState::Unauthenticated(AuthView::Login));
    }

    #[tokio::test]
    async fn reset_form_is_refused_while_busy() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        with_key(&mut c);
        c.set_field(Field::Topic, "JWT login");
        c.set_field(Field::Context, "Axum backend");

        let pending = c.begin_refinement().unwrap();
        assert!(!c.reset_form());
        assert_eq!(c.fields.topic, "JWT login");

        c.finish_refinement(RefinementOutcome { generation: pending.generation, result: Ok("x".into()) });
        assert!(c.reset_form());
        assert!(c.fields.topic.is_empty());
        assert!(c.fields.context.is_empty());
        assert!(c.output().is_empty());
        assert_eq!(c.fields.language, "TypeScript");
    }

    #[tokio::test]
    async fn settings_persist_and_flash() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        let now = Instant::now();

        c.open_settings();
        assert!(c.settings.open);
        assert_eq!(c.settings.draft_model, DEFAULT_MODEL);
        c.settings.draft_key = " sk-live ".into();
        c.settings.draft_model = "deepseek/deepseek-chat".into();
        assert_eq!(c.settings.displayed_key(), "•••••••••");
        c.save_settings(now);

        assert_eq!(c.preference(), &ModelPreference::new("sk-live", "deepseek/deepseek-chat"));
        assert_eq!(c.settings.flash_at(now), Some("Saved"));
        assert_eq!(c.settings.flash_at(now + FLASH_DURATION), None);

        c.clear_key(now);
        assert_eq!(h.store.get(KEY_API_KEY).unwrap(), None);
        assert_eq!(c.preference().model_id, "deepseek/deepseek-chat");
        assert_eq!(c.settings.flash_at(now), Some("Key removed"));

        let reloaded = h.controller();
        assert_eq!(reloaded.preference(), &ModelPreference::new("", "deepseek/deepseek-chat"));
    }

    #[tokio::test]
    async fn copy_writes_output_and_flashes() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        let now = Instant::now();
        let mut sink = Vec::new();

        c.copy_output(&mut sink, now);
        assert!(sink.is_empty());
        assert!(!c.copied_at(now));

        c.set_field(Field::Topic, "JWT login");
        c.generate_template();
        c.copy_output(&mut sink, now);
        assert_eq!(String::from_utf8(sink).unwrap(), format!("{}\n", c.output()));
        assert!(c.copied_at(now));
        assert!(!c.copied_at(now + FLASH_DURATION));
    }

    #[tokio::test]
    async fn refresh_delivers_token_refreshed() {
        let h = Harness::new();
        let mut c = signed_in(&h).await;
        c.refresh_session().await;
        assert_eq!(c.auth.error, None);
        assert_eq!(c.state(), AppState::Authenticated(ToolMode::Coding));

        c.sign_out().await;
        c.refresh_session().await;
        assert_eq!(c.auth.error.as_deref(), Some("No session to refresh"));
    }

    #[tokio::test]
    async fn shutdown_unsubscribes() {
        let h = Harness::new();
        let mut c = h.controller();
        c.shutdown();
        assert_eq!(h.gateway.listener_count(), 0);
    }

    #[tokio::test]
    async fn dropping_controller_unsubscribes() {
        let h = Harness::new();
        let c = h.controller();
        assert_eq!(h.gateway.listener_count(), 1);
        drop(c);
        assert_eq!(h.gateway.listener_count(), 0);
    }
}
