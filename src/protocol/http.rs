//! Authenticated HTTP client for the backend REST API.
//!
//! Every request carries the session's bearer token. A `401` on a request that
//! was sent with a token triggers at most one refresh-and-retry for that
//! request. Refreshes are single-flight: concurrent `401`s queue on
//! `refresh_gate`, and whoever enters after a successful refresh sees a token
//! different from the one that failed and simply retries with it.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{multipart::Form, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::{sync::Arc, time::Duration};

use super::{
    envelope::{decode_envelope, ApiEnvelope},
    error::ApiError,
    types::{RefreshRequest, RefreshedTokens},
};
use crate::core::{config::ClientConfig, session::SessionStore};

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode a value for use as one path segment.
pub fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Session,
    Anonymous,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionStore>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nutriscan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            refresh_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn from_config(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        Self::new(&config.api.base_url, config.request_timeout(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        self.execute::<T, _>(path, Auth::Session, || Ok(self.http.get(&url)))
            .await?
            .into_data(path)
    }

    /// GET whose `data` member may legitimately be absent.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let url = self.url(path);
        Ok(self
            .execute::<T, _>(path, Auth::Session, || Ok(self.http.get(&url)))
            .await?
            .data)
    }

    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        self.execute::<T, _>(path, Auth::Session, || Ok(self.http.get(&url).query(query)))
            .await?
            .into_data(path)
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        self.execute::<T, _>(path, Auth::Session, || Ok(self.http.post(&url).json(body)))
            .await?
            .into_data(path)
    }

    /// POST without the bearer token and without refresh handling (login, register).
    pub async fn post_public<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        Ok(self
            .execute::<T, _>(path, Auth::Anonymous, || Ok(self.http.post(&url).json(body)))
            .await?
            .data)
    }

    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        self.execute::<T, _>(path, Auth::Session, || Ok(self.http.put(&url).json(body)))
            .await?
            .into_data(path)
    }

    /// PUT where only success matters.
    pub async fn put_json_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let url = self.url(path);
        self.execute::<serde_json::Value, _>(path, Auth::Session, || {
            Ok(self.http.put(&url).json(body))
        })
        .await
        .map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.execute::<serde_json::Value, _>(path, Auth::Session, || Ok(self.http.delete(&url)))
            .await
            .map(|_| ())
    }

    /// Multipart POST. The form is rebuilt for the retry after a refresh.
    pub async fn post_multipart<T, F>(&self, path: &str, form: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> Result<Form, ApiError>,
    {
        let url = self.url(path);
        self.execute::<T, _>(path, Auth::Session, || {
            Ok(self.http.post(&url).multipart(form()?))
        })
        .await?
        .into_data(path)
    }

    /// Force a refresh of the current token pair.
    pub async fn refresh_now(&self) -> Result<String, ApiError> {
        let stale = self.session.access_token().unwrap_or_default();
        self.refresh_after(&stale).await
    }

    async fn execute<T, F>(
        &self,
        endpoint: &str,
        auth: Auth,
        build: F,
    ) -> Result<ApiEnvelope<T>, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> Result<RequestBuilder, ApiError>,
    {
        let token = match auth {
            Auth::Session => self.session.access_token(),
            Auth::Anonymous => None,
        };
        let mut response = self.send(&build, token.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(stale) = token {
                log::debug!("{endpoint} answered 401, refreshing session");
                let fresh = self.refresh_after(&stale).await?;
                response = self.send(&build, Some(&fresh)).await?;
                if response.status() == StatusCode::UNAUTHORIZED {
                    log::warn!("{endpoint} still unauthorized after refresh");
                    return Err(ApiError::SessionExpired);
                }
            }
        }

        read_envelope(endpoint, response).await
    }

    async fn send<F>(&self, build: &F, token: Option<&str>) -> Result<Response, ApiError>
    where
        F: Fn() -> Result<RequestBuilder, ApiError>,
    {
        let mut request = build()?;
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Obtain a token newer than `stale`, refreshing only if nobody else has.
    async fn refresh_after(&self, stale: &str) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.session.access_token() {
            if current != stale {
                log::debug!("Session already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            self.drop_session();
            return Err(ApiError::SessionExpired);
        };

        match self.request_refresh(&refresh_token).await {
            Ok(tokens) => {
                log::info!("Session refreshed");
                let access = tokens.access_token.clone();
                if let Err(err) = self.session.update_tokens(
                    tokens.access_token,
                    tokens.refresh_token,
                    tokens.expires_at,
                ) {
                    log::warn!("Refreshed tokens kept in memory only: {err:#}");
                }
                Ok(access)
            }
            Err(err) => {
                log::warn!("Token refresh failed: {err}");
                self.drop_session();
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let path = "/auth/refresh";
        let response = self
            .http
            .post(self.url(path))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        read_envelope::<RefreshedTokens>(path, response)
            .await?
            .into_data(path)
    }

    fn drop_session(&self) {
        if let Err(err) = self.session.clear() {
            log::warn!("Failed to clear session: {err:#}");
        }
    }
}

async fn read_envelope<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<ApiEnvelope<T>, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;
    decode_envelope(endpoint, status, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("5449000000996"), "5449000000996");
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
        assert_eq!(segment("x?y#z"), "x%3Fy%23z");
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let client = ApiClient::new(
            "http://localhost:8080/api/v1/",
            Duration::from_secs(5),
            Arc::new(SessionStore::in_memory()),
        )
        .unwrap();
        assert_eq!(client.url("/scan"), "http://localhost:8080/api/v1/scan");
    }
}
