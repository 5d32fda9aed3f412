use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::Role,
    protocol::{Credentials, Session, TokenResponse, User},
};
use storage::Storage;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ValidationError},
    transport::ApiTransport,
};

#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<Session>>;
    async fn save(&self, session: &Session) -> anyhow::Result<()>;
    async fn save_user(&self, user: Option<&User>) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl SessionPersistence for Storage {
    async fn load(&self) -> anyhow::Result<Option<Session>> {
        Ok(self.load_session().await?.map(|stored| stored.session))
    }

    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        self.save_session(session).await
    }

    async fn save_user(&self, user: Option<&User>) -> anyhow::Result<()> {
        Storage::save_user(self, user).await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.clear_session().await.map(|_| ())
    }
}

#[derive(Default)]
pub struct MemorySessionPersistence {
    session: Mutex<Option<Session>>,
}

impl MemorySessionPersistence {
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionPersistence for MemorySessionPersistence {
    async fn load(&self) -> anyhow::Result<Option<Session>> {
        Ok(self.session.lock().await.clone())
    }

    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn save_user(&self, user: Option<&User>) -> anyhow::Result<()> {
        if let Some(session) = self.session.lock().await.as_mut() {
            session.user = user.cloned();
        }
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.session.lock().await = None;
        Ok(())
    }
}

/// Single source of truth for "who is logged in".
///
/// Readers never observe a token without the user it was issued with being
/// either cached or explicitly absent; logout clears both under one write lock.
pub struct SessionStore {
    persistence: Arc<dyn SessionPersistence>,
    state: RwLock<Option<Session>>,
    user_tx: watch::Sender<Option<User>>,
}

impl SessionStore {
    pub async fn open(persistence: Arc<dyn SessionPersistence>) -> Result<Arc<Self>, ClientError> {
        let restored = persistence.load().await.map_err(ClientError::Storage)?;
        match restored.as_ref() {
            Some(session) => info!(
                role = session.role().map(Role::as_str).unwrap_or("unknown"),
                has_user = session.user.is_some(),
                "session: restored"
            ),
            None => debug!("session: nothing to restore"),
        }

        let (user_tx, _) = watch::channel(restored.as_ref().and_then(|s| s.user.clone()));
        Ok(Arc::new(Self {
            persistence,
            state: RwLock::new(restored),
            user_tx,
        }))
    }

    pub fn ephemeral() -> Arc<Self> {
        let (user_tx, _) = watch::channel(None);
        Arc::new(Self {
            persistence: Arc::new(MemorySessionPersistence::default()),
            state: RwLock::new(None),
            user_tx,
        })
    }

    pub async fn token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.user_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user_tx.subscribe()
    }

    pub async fn establish(&self, session: Session) -> Result<(), ClientError> {
        let mut guard = self.state.write().await;
        self.persistence
            .save(&session)
            .await
            .map_err(ClientError::Storage)?;
        let user = session.user.clone();
        *guard = Some(session);
        self.user_tx.send_replace(user);
        Ok(())
    }

    pub async fn set_user(&self, user: Option<User>) -> Result<(), ClientError> {
        let mut guard = self.state.write().await;
        let Some(session) = guard.as_mut() else {
            debug!("session: ignoring user update without a session");
            return Ok(());
        };
        self.persistence
            .save_user(user.as_ref())
            .await
            .map_err(ClientError::Storage)?;
        session.user = user.clone();
        self.user_tx.send_replace(user);
        Ok(())
    }

    /// Exchanges credentials for a token, fetches the user it belongs to and
    /// persists both together. Nothing is stored if either step fails.
    pub async fn login(
        &self,
        transport: &ApiTransport,
        credentials: &Credentials,
    ) -> Result<Session, ClientError> {
        let email = credentials.email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        if credentials.password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }
        let credentials = Credentials {
            email: email.to_string(),
            password: credentials.password.clone(),
        };

        let token: TokenResponse = transport
            .post("/auth/login")
            .anonymous()
            .json(&credentials)
            .send_json()
            .await
            .map_err(|err| match err {
                ClientError::Server { status, .. } if (400..500).contains(&status) => {
                    ClientError::Auth
                }
                ClientError::Unauthorized { .. } => ClientError::Auth,
                other => other,
            })?;

        let user: User = transport
            .get("/auth/me")
            .bearer(&token.access_token)
            .send_json()
            .await?;

        let session = Session {
            token: token.access_token,
            user: Some(user),
        };
        self.establish(session.clone()).await?;
        info!(
            user_id = %session.user.as_ref().map(|u| u.id.0).unwrap_or_default(),
            role = session.role().map(Role::as_str).unwrap_or("unknown"),
            "session: logged in"
        );
        Ok(session)
    }

    pub async fn refresh_user(&self, transport: &ApiTransport) -> Result<User, ClientError> {
        if !self.is_authenticated().await {
            return Err(ClientError::Unauthorized { message: None });
        }
        let user: User = transport.get("/auth/me").send_json().await?;
        self.set_user(Some(user.clone())).await?;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let mut guard = self.state.write().await;
        self.clear_locked(&mut guard).await
    }

    pub async fn logout_if_token(&self, token: &str) -> Result<bool, ClientError> {
        let mut guard = self.state.write().await;
        if guard.as_ref().map(|session| session.token.as_str()) != Some(token) {
            debug!("session: stale credential rejected, keeping current session");
            return Ok(false);
        }
        self.clear_locked(&mut guard).await?;
        Ok(true)
    }

    async fn clear_locked(&self, guard: &mut Option<Session>) -> Result<(), ClientError> {
        if let Err(err) = self.persistence.clear().await {
            warn!("session: failed to clear persisted session: {err:#}");
            return Err(ClientError::Storage(err));
        }
        let was_logged_in = guard.take().is_some();
        self.user_tx.send_replace(None);
        if was_logged_in {
            info!("session: logged out");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
