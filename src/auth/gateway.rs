use super::provider::AuthProvider;
use super::session::{AuthChange, AuthEvent, Session};
use crate::core::store::KeyValueStore;
use crate::error::StudioError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use uuid::Uuid;

pub const KEY_SESSION: &str = "kmn_auth_session";

type Listeners = HashMap<Uuid, mpsc::UnboundedSender<AuthChange>>;

#[derive(Default)]
struct Shared {
    session: Option<Session>,
    listeners: Listeners,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the current session and fans session transitions out to subscribers.
pub struct AuthGateway {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn KeyValueStore>,
    shared: Arc<Mutex<Shared>>,
}

/// A registered listener. Dropping it unregisters.
pub struct AuthSubscription {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<AuthChange>,
    shared: Weak<Mutex<Shared>>,
}

impl AuthSubscription {
    pub async fn recv(&mut self) -> Option<AuthChange> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AuthChange> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared).listeners.remove(&self.id);
            log::debug!("Auth listener {} removed", self.id);
        }
    }
}

impl AuthGateway {
    pub fn new(provider: Arc<dyn AuthProvider>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { provider, store, shared: Arc::new(Mutex::new(Shared::default())) }
    }

    pub fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        lock(&self.shared).listeners.insert(id, tx);
        log::debug!("Auth listener {id} registered");
        AuthSubscription { id, rx, shared: Arc::downgrade(&self.shared) }
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        lock(&self.shared).listeners.len()
    }

    pub fn session(&self) -> Option<Session> {
        lock(&self.shared).session.clone()
    }

    /// Resolve the session persisted by a previous run, refreshing it when expired.
    pub async fn get_session(&self) -> Option<Session> {
        let stored = self.load_persisted();

        let session = match stored {
            Some(s) if s.is_expired() => match s.refresh_token.as_deref() {
                Some(token) => match self.provider.refresh_session(token).await {
                    Ok(fresh) => {
                        log::info!("Restored session refreshed");
                        self.commit(Some(fresh.clone()), AuthEvent::TokenRefreshed);
                        Some(fresh)
                    }
                    Err(e) => {
                        log::warn!("Could not refresh stored session: {e}");
                        None
                    }
                },
                None => None,
            },
            other => other,
        };

        self.commit(session.clone(), AuthEvent::InitialSession);
        session
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, StudioError> {
        let session = self.provider.sign_in_with_password(email.trim(), password).await?;
        log::info!("Signed in");
        self.commit(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, StudioError> {
        let session = self.provider.sign_up(email.trim(), password).await?;
        if let Some(s) = &session {
            log::info!("Signed up and signed in");
            self.commit(Some(s.clone()), AuthEvent::SignedIn);
        } else {
            log::info!("Signed up, awaiting email confirmation");
        }
        Ok(session)
    }

    pub async fn request_password_reset(&self, email: &str, redirect_url: &str) -> Result<(), StudioError> {
        self.provider.reset_password_for_email(email.trim(), redirect_url).await?;
        log::info!("Password reset email requested");
        Ok(())
    }

    /// The local session is always dropped; a remote failure is only logged.
    pub async fn sign_out(&self) -> Result<(), StudioError> {
        if let Some(session) = self.session() {
            if let Err(e) = self.provider.sign_out(&session.access_token).await {
                log::warn!("Remote sign-out failed: {e}");
            }
        }
        self.commit(None, AuthEvent::SignedOut);
        log::info!("Signed out");
        Ok(())
    }

    pub async fn refresh(&self) -> Result<Session, StudioError> {
        let token = self
            .session()
            .and_then(|s| s.refresh_token)
            .ok_or_else(|| StudioError::Auth("No session to refresh".into()))?;
        let fresh = self.provider.refresh_session(&token).await?;
        self.commit(Some(fresh.clone()), AuthEvent::TokenRefreshed);
        Ok(fresh)
    }

    fn load_persisted(&self) -> Option<Session> {
        let raw = match self.store.get(KEY_SESSION) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("Could not read stored session: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("Discarding unreadable stored session: {e}");
                None
            }
        }
    }

    fn persist(&self, session: Option<&Session>) {
        let result = match session {
            Some(s) => serde_json::to_string(s)
                .map_err(StudioError::from)
                .and_then(|raw| self.store.set(KEY_SESSION, &raw)),
            None => self.store.remove(KEY_SESSION),
        };
        if let Err(e) = result {
            log::warn!("Could not persist session: {e}");
        }
    }

    fn commit(&self, session: Option<Session>, event: AuthEvent) {
        self.persist(session.as_ref());
        let mut shared = lock(&self.shared);
        shared.session = session.clone();
        let change = AuthChange { event, session };
        shared.listeners.retain(|_, tx| tx.send(change.clone()).is_ok());
    }
}
