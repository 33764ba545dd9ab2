//! Dashboard request client implementation

use std::sync::Arc;

use log::{debug, error, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, Method, Url};
use serde_json::Value;

use super::normalize::Normalized;
use super::response::{Classification, classify, resolve_body};
use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError, Result};
use crate::platform::{CsrfTokenSource, LogNavigator, Navigator, NoCsrf, discover_csrf_token};
use crate::session::SessionAccessor;

/// Header carrying the anti-forgery token on mutating requests
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Methods that carry the anti-forgery token
const MUTATING_METHODS: [Method; 4] = [Method::POST, Method::PUT, Method::DELETE, Method::PATCH];

/// Options for [`RequestClient::get`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Neither read nor write the response cache
    pub skip_cache: bool,
}

impl GetOptions {
    /// Always go to the network
    pub fn fresh() -> Self {
        Self { skip_cache: true }
    }
}

/// Request client for the dashboard backend.
///
/// Every verb funnels through [`RequestClient::request`]: headers are built
/// from the session and anti-forgery sources, the body is resolved and
/// classified, and session errors tear the session down before the error is
/// returned. Successful GETs are cached by URL.
pub struct RequestClient {
    http: HttpClient,
    config: ClientConfig,
    session: Arc<dyn SessionAccessor>,
    csrf: Arc<dyn CsrfTokenSource>,
    navigator: Arc<dyn Navigator>,
    cache: ResponseCache,
}

impl RequestClient {
    /// Create a new client. No anti-forgery source and a logging navigator
    /// are installed until replaced with [`with_csrf`](Self::with_csrf) and
    /// [`with_navigator`](Self::with_navigator).
    pub fn new(config: ClientConfig, session: Arc<dyn SessionAccessor>) -> Result<Self> {
        config.validate()?;
        if config.base_url.is_empty() {
            return Err(ConfigError::Invalid("base_url is required".to_string()).into());
        }

        // No timeout: requests run to completion or failure
        let http = HttpClient::builder()
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let cache = ResponseCache::new(config.cache_ttl());

        Ok(Self {
            http,
            config,
            session,
            csrf: Arc::new(NoCsrf),
            navigator: Arc::new(LogNavigator),
            cache,
        })
    }

    pub fn with_csrf(mut self, csrf: Arc<dyn CsrfTokenSource>) -> Self {
        self.csrf = csrf;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `endpoint` with `params` appended as a query string.
    ///
    /// A fresh cached result for the same URL is returned without a network
    /// call unless `options.skip_cache` is set. Overlapping calls for one URL
    /// are not coalesced: each misses and dispatches, and the last to finish
    /// owns the cache entry.
    pub async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        options: GetOptions,
    ) -> Result<Normalized> {
        let url = self.compose_url(endpoint, params)?;
        let key = url.to_string();

        if !options.skip_cache
            && let Some(cached) = self.cache.get(&key)
        {
            debug!("Cache hit: {}", key);
            return Ok(cached);
        }

        let data = self
            .dispatch(Method::GET, url, None, &HeaderMap::new())
            .await?;

        if !options.skip_cache {
            self.cache.put(&key, data.clone());
        }
        Ok(data)
    }

    pub async fn post(&self, endpoint: &str, body: Option<&Value>) -> Result<Normalized> {
        self.request(Method::POST, endpoint, body, &HeaderMap::new())
            .await
    }

    pub async fn put(&self, endpoint: &str, body: Option<&Value>) -> Result<Normalized> {
        self.request(Method::PUT, endpoint, body, &HeaderMap::new())
            .await
    }

    pub async fn patch(&self, endpoint: &str, body: Option<&Value>) -> Result<Normalized> {
        self.request(Method::PATCH, endpoint, body, &HeaderMap::new())
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Normalized> {
        self.request(Method::DELETE, endpoint, None, &HeaderMap::new())
            .await
    }

    /// Send a request with extra headers. Caller headers override the
    /// default `Content-Type`; the bearer token and anti-forgery token are
    /// applied last. Never reads or writes the cache.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        headers: &HeaderMap,
    ) -> Result<Normalized> {
        let url = self.compose_url(endpoint, &[])?;
        self.dispatch(method, url, body, headers).await
    }

    /// Empty the GET cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop cached GETs whose endpoint starts with `endpoint_prefix`
    pub fn invalidate_cache(&self, endpoint_prefix: &str) -> usize {
        let prefix = match self.compose_url(endpoint_prefix, &[]) {
            Ok(url) => url.to_string(),
            Err(_) => return 0,
        };
        self.cache.invalidate_prefix(&prefix)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn compose_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid URL '{}': {}", raw, e)))?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn build_headers(&self, method: &Method, extra: &HeaderMap) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Caller values replace defaults; repeated caller headers keep every value
        for name in extra.keys() {
            headers.remove(name);
        }
        for (name, value) in extra {
            headers.append(name.clone(), value.clone());
        }

        if let Some(token) = self.session.token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid session token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        if MUTATING_METHODS.contains(method)
            && let Some(token) = discover_csrf_token(self.csrf.as_ref())
        {
            match HeaderValue::from_str(&token) {
                Ok(value) => {
                    headers.insert(CSRF_HEADER, value);
                }
                Err(_) => warn!("Ignoring anti-forgery token that is not a valid header value"),
            }
        }

        Ok(headers)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        extra_headers: &HeaderMap,
    ) -> Result<Normalized> {
        let headers = self.build_headers(&method, extra_headers)?;

        let mut builder = self.http.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) if err.is_builder() => {
                error!("Failed to build {} {}: {}", method, url, err);
                return Err(ApiError::Transport(err).into());
            }
            Err(err) => {
                error!("Network error on {} {}: {}", method, url, err);
                return Err(ApiError::Network { source: err }.into());
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(|err| {
            error!("Failed to read response of {} {}: {}", method, url, err);
            ApiError::Transport(err)
        })?;

        let raw = resolve_body(status, content_type.as_deref(), &bytes);

        match classify(status, raw) {
            Classification::Success(data) => Ok(data),
            Classification::SessionExpired { body } => {
                warn!(
                    "Session rejected by {} {} (status {}); signing out",
                    method,
                    url.path(),
                    status.as_u16()
                );
                self.session.clear_session();
                self.navigator.redirect(&self.config.expired_login_url());
                Err(ApiError::SessionExpired { body }.into())
            }
            Classification::Failure {
                status,
                status_text,
                message,
                body,
            } => {
                debug!("{} {} failed ({}): {}", method, url.path(), status, message);
                Err(ApiError::Http {
                    status,
                    status_text,
                    message,
                    body,
                }
                .into())
            }
        }
    }
}
