use std::rc::Rc;

use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::types::{ApiError, CsrfTokenResponse};
use crate::config;
use crate::state::auth::SessionProvider;
use crate::utils::net::NetworkStatus;
use crate::utils::storage::CookieStore;

pub const API_PREFIX: &str = "/api";
pub const CSRF_COOKIE: &str = "_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";
const CSRF_TOKEN_PATH: &str = "/api/csrf-token";

/// Paths that always require a bearer credential, regardless of the
/// `require_auth` flag on the individual call.
const PROTECTED_PREFIXES: &[&str] = &["/api/admin", "/api/notifications"];

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub require_auth: bool,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
            require_auth: false,
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            require_auth: false,
        }
    }

    pub fn put(body: Value) -> Self {
        Self {
            method: Method::PUT,
            body: Some(body),
            require_auth: false,
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            body: None,
            require_auth: false,
        }
    }

    pub fn with_auth(mut self) -> Self {
        self.require_auth = true;
        self
    }
}

/// Builds authenticated, CSRF-protected requests against the remote API.
/// Leaf dependency for the cache, the prefetcher and the trackers; performs
/// no retries and interprets no status codes beyond error mapping.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Option<String>,
    session: Rc<dyn SessionProvider>,
    network: Rc<dyn NetworkStatus>,
    cookies: Rc<dyn CookieStore>,
}

impl ApiClient {
    pub fn new(
        session: Rc<dyn SessionProvider>,
        network: Rc<dyn NetworkStatus>,
        cookies: Rc<dyn CookieStore>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: None,
            session,
            network,
            cookies,
        }
    }

    pub fn new_with_base_url(
        base_url: impl Into<String>,
        session: Rc<dyn SessionProvider>,
        network: Rc<dyn NetworkStatus>,
        cookies: Rc<dyn CookieStore>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: Some(base_url.into()),
            session,
            network,
            cookies,
        }
    }

    /// Client wired to the browser runtime.
    #[cfg(target_arch = "wasm32")]
    pub fn browser() -> Self {
        use crate::state::auth::StoredSessionProvider;
        use crate::utils::net::BrowserNetworkStatus;
        use crate::utils::storage::{BrowserCookieStore, BrowserStorage};
        use crate::utils::time::SystemClock;

        Self::new(
            Rc::new(StoredSessionProvider::new(
                Rc::new(BrowserStorage),
                Rc::new(SystemClock),
            )),
            Rc::new(BrowserNetworkStatus),
            Rc::new(BrowserCookieStore),
        )
    }

    fn http_client(&self) -> &Client {
        &self.client
    }

    async fn resolved_base_url(&self) -> String {
        if let Some(base) = &self.base_url {
            base.clone()
        } else {
            config::await_api_base_url().await
        }
    }

    /// Offline requests keep the same-origin relative path so the service
    /// worker cache can intercept them; online requests go to the remote base.
    pub async fn resolve_request_url(&self, path: &str) -> String {
        if !self.network.is_online() {
            return path.to_string();
        }
        format!("{}{}", self.resolved_base_url().await, path)
    }

    fn bearer_for(&self, path: &str, require_auth: bool) -> Result<Option<String>, ApiError> {
        if !require_auth && !is_protected_path(path) {
            return Ok(None);
        }
        match self.session.current_session() {
            Some(session) => Ok(Some(session.access_token)),
            None => Err(ApiError::auth("No active session")),
        }
    }

    async fn ensure_csrf_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.cookies.get(CSRF_COOKIE) {
            return Ok(token);
        }
        let url = self.resolve_request_url(CSRF_TOKEN_PATH).await;
        let response = self
            .http_client()
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::request_failed(format!("Request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::http(status.as_u16(), "Failed to issue CSRF token"));
        }
        let body: CsrfTokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::unknown(format!("Failed to parse response: {}", e)))?;
        self.cookies.set(CSRF_COOKIE, &body.csrf_token);
        Ok(body.csrf_token)
    }

    /// The single request primitive everything else goes through.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Response, ApiError> {
        if !path.starts_with(API_PREFIX) {
            return Err(ApiError::validation(format!(
                "Path must start with {}: {}",
                API_PREFIX, path
            )));
        }
        let bearer = self.bearer_for(path, options.require_auth)?;
        let csrf_token = if is_idempotent(&options.method) {
            None
        } else {
            Some(self.ensure_csrf_token().await?)
        };

        let url = self.resolve_request_url(path).await;
        let mut request = self.http_client().request(options.method.clone(), &url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(token) = csrf_token {
            request = request.header(CSRF_HEADER, token);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }
        #[cfg(target_arch = "wasm32")]
        {
            request = request.fetch_credentials_include();
        }
        request
            .send()
            .await
            .map_err(|e| ApiError::request_failed(format!("Request failed: {}", e)))
    }

    pub async fn json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.request(path, options).await?;
        Self::map_json_response(response).await
    }

    /// Untyped read, used by the cache fetchers.
    pub async fn fetch_value(&self, path: &str) -> Result<Value, ApiError> {
        self.json(path, RequestOptions::get()).await
    }

    async fn map_json_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::unknown(format!("Failed to parse response: {}", e)))
        } else {
            match response.json::<ApiError>().await {
                Ok(error) => Err(error.with_status(status.as_u16())),
                Err(_) => Err(ApiError::http(
                    status.as_u16(),
                    format!("Request failed with HTTP {}", status.as_u16()),
                )),
            }
        }
    }
}

pub fn is_protected_path(path: &str) -> bool {
    PROTECTED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
