use anyhow::{Context, Result};

use super::users::validate_new_password;
use crate::{
    core::session::Session,
    protocol::{
        types::{AuthResponse, LoginRequest, RegisterRequest, User},
        ApiClient, ApiError,
    },
};

pub struct AuthService<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token pair and store it as the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let auth = self.authenticate("/auth/login", &request).await?;
        self.store(auth)
    }

    /// Create an account, then log in with the same credentials.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        validate_new_password(password)?;
        let request = RegisterRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            name: name.trim().to_string(),
        };
        self.client
            .post_public::<serde_json::Value, _>("/auth/register", &request)
            .await?;
        log::info!("Registered account {}", request.email);
        self.login(&request.email, password).await
    }

    /// Rotate the token pair now rather than waiting for a 401.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.client.refresh_now().await.map(|_| ())
    }

    pub fn logout(&self) -> Result<()> {
        self.client.session().clear()?;
        log::info!("Logged out");
        Ok(())
    }

    /// Browser entry point of the Google sign-in flow.
    pub fn google_auth_url(&self) -> String {
        self.client.url("/auth/oauth/google")
    }

    async fn authenticate(
        &self,
        path: &str,
        request: &LoginRequest,
    ) -> Result<AuthResponse, ApiError> {
        self.client
            .post_public::<AuthResponse, _>(path, request)
            .await?
            .ok_or_else(|| ApiError::MissingData {
                endpoint: path.to_string(),
            })
    }

    fn store(&self, auth: AuthResponse) -> Result<User> {
        let user = auth.user.clone();
        self.client
            .session()
            .set(Session::from(auth))
            .context("Failed to persist session")?;
        log::info!("Logged in as {}", user.email);
        Ok(user)
    }
}
