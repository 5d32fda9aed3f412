use std::sync::Arc;

use reqwest::{multipart::Form, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::error::ApiError;
use tracing::{debug, warn};

use crate::{config::ClientConfig, error::ClientError, session::SessionStore};

pub struct ApiTransport {
    http: Client,
    api_root: String,
    session: Arc<SessionStore>,
    logout_on_unauthorized: bool,
}

enum Credential {
    Session,
    Bearer(String),
    Anonymous,
}

pub struct ApiRequest<'a> {
    transport: &'a ApiTransport,
    method: Method,
    path: String,
    builder: RequestBuilder,
    credential: Credential,
}

impl ApiTransport {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            api_root: config.api_root(),
            session,
            logout_on_unauthorized: config.logout_on_unauthorized,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn request(&self, method: Method, path: &str) -> ApiRequest<'_> {
        let builder = self
            .http
            .request(method.clone(), format!("{}{path}", self.api_root));
        ApiRequest {
            transport: self,
            method,
            path: path.to_string(),
            builder,
            credential: Credential::Session,
        }
    }

    pub fn get(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::DELETE, path)
    }

    /// Server-relative photo paths are served from the API root; absolute
    /// URLs pass through untouched.
    pub fn resolve_photo_url(&self, raw: &str) -> String {
        resolve_photo_url(&self.api_root, raw)
    }
}

pub fn resolve_photo_url(api_root: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") || raw.is_empty() {
        return raw.to_string();
    }
    let root = api_root.trim_end_matches('/');
    if raw.starts_with('/') {
        format!("{root}{raw}")
    } else {
        format!("{root}/{raw}")
    }
}

impl<'a> ApiRequest<'a> {
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        self.builder = self.builder.query(query);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.builder = self.builder.multipart(form);
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.credential = Credential::Bearer(token.to_string());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.credential = Credential::Anonymous;
        self
    }

    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        let response = self.dispatch().await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn send_unit(self) -> Result<(), ClientError> {
        self.dispatch().await?;
        Ok(())
    }

    async fn dispatch(self) -> Result<Response, ClientError> {
        let ApiRequest {
            transport,
            method,
            path,
            mut builder,
            credential,
        } = self;

        let uses_session = matches!(credential, Credential::Session);
        let token = match credential {
            Credential::Session => transport.session.token().await,
            Credential::Bearer(token) => Some(token),
            Credential::Anonymous => None,
        };
        if let Some(token) = token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        debug!(%method, path = %path, authenticated = token.is_some(), "http: sending");
        let response = builder.send().await.map_err(|err| {
            warn!(%method, path = %path, "http: transport failure: {err}");
            ClientError::Transport(err)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(%method, path = %path, status = status.as_u16(), "http: ok");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let api_error = ApiError::from_response(status.as_u16(), &body);
        warn!(
            %method,
            path = %path,
            status = status.as_u16(),
            code = ?api_error.code,
            "http: request rejected"
        );

        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = token.as_deref().filter(|_| uses_session) {
                if transport.logout_on_unauthorized {
                    match transport.session.logout_if_token(token).await {
                        Ok(true) => warn!(path = %path, "http: credential rejected, session cleared"),
                        Ok(false) => {}
                        Err(err) => warn!("http: failed to clear session after 401: {err}"),
                    }
                }
            }
            return Err(ClientError::Unauthorized {
                message: api_error.message,
            });
        }

        Err(ClientError::Server {
            status: status.as_u16(),
            message: api_error.message,
        })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
