//! High-level API client with transparent token refresh

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::interceptor::{RefreshCoordinator, Ticket};
use crate::models::{
    AuthResponse, CurrentUserResponse, ErrorBody, RefreshResponse, TokenPair, User,
};
use crate::token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
use crate::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

const REFRESH_PATH: &str = "/auth/refresh";

/// What the UI should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    /// The session ended underneath the user; send them to the login screen
    LoginRequired,
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    coordinator: RefreshCoordinator,
    session: watch::Sender<SessionState>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        let (session, _) = watch::channel(SessionState::Anonymous);
        Self {
            transport,
            tokens,
            coordinator: RefreshCoordinator::new(),
            session,
        }
    }

    /// reqwest transport, with a file token store when one is configured
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(ReqwestTransport::new(&config.base_url)?);
        let tokens: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Ok(Self::new(transport, tokens))
    }

    /// Subscribe to session state changes
    pub fn session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Pick up a session persisted by an earlier run
    pub async fn restore_session(&self) -> Result<bool, ClientError> {
        let restored = self.tokens.get().await?.is_some();
        if restored {
            self.session.send_replace(SessionState::Authenticated);
        }
        Ok(restored)
    }

    /// Send a request with the cached access token, refreshing once on 401
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        request.bearer = self.tokens.get().await?.map(|t| t.access_token);

        let response = self.transport.execute(&request).await?;
        if response.status != 401 || request.retried {
            return into_result(response);
        }
        request.retried = true;

        let access_token = match self.coordinator.begin() {
            Ticket::Follower(outcome) => outcome
                .await
                .unwrap_or(Err(ClientError::RefreshAbandoned))?,
            Ticket::Leader(lease) => match self.lead_refresh(request.bearer.as_deref()).await {
                Ok(access_token) => {
                    lease.resolve(access_token.clone());
                    access_token
                }
                Err(e) => {
                    self.end_session().await;
                    lease.reject(e.clone());
                    return Err(e);
                }
            },
        };

        request.bearer = Some(access_token);
        into_result(self.transport.execute(&request).await?)
    }

    /// Obtain a usable access token as the refresh leader
    ///
    /// If the cache already holds a different access token than the one that
    /// was rejected, another refresh completed in the meantime and that token
    /// is reused without calling the server.
    async fn lead_refresh(&self, rejected: Option<&str>) -> Result<String, ClientError> {
        let Some(current) = self.tokens.get().await? else {
            tracing::debug!("401 with no session to refresh");
            return Err(ClientError::SessionExpired);
        };

        if rejected != Some(current.access_token.as_str()) {
            tracing::debug!("Replaying request with newer access token");
            return Ok(current.access_token);
        }

        // Bypasses `send` so a failing refresh cannot recurse into itself
        let mut request = ApiRequest::new(Method::POST, REFRESH_PATH)
            .with_body(json!({ "refreshToken": current.refresh_token }));
        request.retried = true;

        let response = self.transport.execute(&request).await?;
        if !response.is_success() {
            tracing::info!(status = response.status, "Refresh rejected, ending session");
            return Err(ClientError::SessionExpired);
        }

        let pair: TokenPair = decode::<RefreshResponse>(response.body)?.into();
        self.tokens.set(&pair).await?;
        tracing::debug!("Access token refreshed");
        Ok(pair.access_token)
    }

    async fn end_session(&self) {
        if let Err(e) = self.tokens.clear().await {
            tracing::error!(error = %e, "Failed to clear tokens");
        }
        self.session.send_replace(SessionState::LoginRequired);
    }

    /// Send a request that must not trigger a refresh (credentials, logout)
    async fn send_unauthenticated(
        &self,
        mut request: ApiRequest,
    ) -> Result<ApiResponse, ClientError> {
        request.retried = true;
        into_result(self.transport.execute(&request).await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(ApiRequest::new(Method::GET, path)).await?;
        decode(response.body)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = ApiRequest::new(Method::POST, path).with_body(to_value(body)?);
        decode(self.send(request).await?.body)
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = ApiRequest::new(Method::PUT, path).with_body(to_value(body)?);
        decode(self.send(request).await?.body)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(ApiRequest::new(Method::DELETE, path)).await?;
        decode(response.body)
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.authenticate("/auth/register", email, password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.authenticate("/auth/login", email, password).await
    }

    async fn authenticate(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        let request = ApiRequest::new(Method::POST, path)
            .with_body(json!({ "email": email, "password": password }));
        let auth: AuthResponse = decode(self.send_unauthenticated(request).await?.body)?;

        self.tokens.set(&auth.tokens()).await?;
        self.session.send_replace(SessionState::Authenticated);
        tracing::info!(user_id = %auth.user.id, "Signed in");
        Ok(auth.user)
    }

    /// Revoke the refresh token server-side and forget the session
    ///
    /// A refresh already in flight is allowed to finish first so the token
    /// revoked is the one it rotated in. Requests that hit a 401 while logout
    /// runs fail with [`ClientError::SessionExpired`]. Local tokens are
    /// cleared even if the server call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let lease = self.coordinator.acquire().await;

        if let Some(current) = self.tokens.get().await? {
            let request = ApiRequest::new(Method::POST, "/auth/logout")
                .with_body(json!({ "refreshToken": current.refresh_token }));
            if let Err(e) = self.send_unauthenticated(request).await {
                tracing::warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }

        self.tokens.clear().await?;
        self.session.send_replace(SessionState::Anonymous);
        lease.reject(ClientError::SessionExpired);
        Ok(())
    }

    pub async fn current_user(&self) -> Result<User, ClientError> {
        let response: CurrentUserResponse = self.get("/auth/me").await?;
        Ok(response.user)
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse, ClientError> {
    if response.is_success() {
        return Ok(response);
    }

    let body: ErrorBody = serde_json::from_value(response.body.clone()).unwrap_or_default();
    let message = body
        .error
        .or(body.code)
        .or_else(|| response.body.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", response.status));

    Err(ClientError::Api {
        status: response.status,
        message,
    })
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

fn to_value<B: Serialize>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}
