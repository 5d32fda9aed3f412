use std::sync::Arc;

use shared::protocol::{Credentials, Session, User};
use tracing::warn;

pub mod auth;
pub mod complaints;
pub mod config;
pub mod error;
pub mod list_state;
pub mod router;
pub mod session;
pub mod support;
pub mod transport;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use auth::{AuthApi, PasswordReset, Registration};
pub use complaints::{ComplaintRepository, PhotoAttachment, PhotoUpload, SubmittedComplaint};
pub use config::ClientConfig;
pub use error::{ClientError, TransitionError, ValidationError};
pub use list_state::ComplaintList;
pub use router::{Desk, Operation, RoleRouter, Screen, WorkflowSurface};
pub use session::{MemorySessionPersistence, SessionPersistence, SessionStore};
pub use support::SupportToggle;
pub use transport::ApiTransport;
pub use workflow::{transition, AssignmentWorkflow, OfficialFilter, WorkerRoster, WorkflowAction};

pub struct CityFlowClient {
    config: ClientConfig,
    session: Arc<SessionStore>,
    transport: Arc<ApiTransport>,
    auth: AuthApi,
    complaints: ComplaintRepository,
    support: SupportToggle,
    workflow: AssignmentWorkflow,
}

impl CityFlowClient {
    /// Restores the persisted session. A token without a cached user triggers
    /// one `/auth/me` refresh; its failure leaves the session as found.
    pub async fn connect(
        config: ClientConfig,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Self, ClientError> {
        let session = SessionStore::open(persistence).await?;
        let client = Self::with_session(config, session)?;

        if client.session.is_authenticated().await && client.session.current_user().is_none() {
            if let Err(err) = client.session.refresh_user(&client.transport).await {
                warn!("client: could not refresh user for restored session: {err}");
            }
        }
        Ok(client)
    }

    pub fn with_session(config: ClientConfig, session: Arc<SessionStore>) -> Result<Self, ClientError> {
        let transport = Arc::new(ApiTransport::new(&config, Arc::clone(&session))?);
        Ok(Self {
            auth: AuthApi::new(Arc::clone(&transport)),
            complaints: ComplaintRepository::new(Arc::clone(&transport)),
            support: SupportToggle::new(Arc::clone(&transport)),
            workflow: AssignmentWorkflow::new(Arc::clone(&transport)),
            config,
            session,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn transport(&self) -> &Arc<ApiTransport> {
        &self.transport
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    pub fn complaints(&self) -> &ComplaintRepository {
        &self.complaints
    }

    pub fn support(&self) -> &SupportToggle {
        &self.support
    }

    pub fn workflow(&self) -> &AssignmentWorkflow {
        &self.workflow
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.session.login(&self.transport, &credentials).await
    }

    pub async fn refresh_user(&self) -> Result<User, ClientError> {
        self.session.refresh_user(&self.transport).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.logout().await
    }

    pub fn desk(&self) -> Option<Desk> {
        let user = self.session.current_user()?;
        Some(RoleRouter::desk(
            user,
            self.complaints.clone(),
            self.support.clone(),
            self.workflow.clone(),
        ))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
