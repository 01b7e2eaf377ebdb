use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::error::{ApiError, Result};

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Authorization` header value for HTTP Basic authentication.
    pub fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Connection settings shared by every request of a client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    host: Url,
    credentials: Option<Credentials>,
    user_agent: String,
}

impl ClientConfig {
    /// `host` is the server root, optionally with a context path such as
    /// `https://example.com/fecru`.
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        let host = Url::parse(host.as_ref()).map_err(ApiError::InvalidUrl)?;
        if host.cannot_be_a_base() {
            return Err(ApiError::InvalidArgument(format!(
                "'{host}' cannot be used as a server address"
            )));
        }

        Ok(Self {
            host,
            credentials: None,
            user_agent: format!("crucible-cli/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Joins a rendered target onto the host, keeping any context path.
    pub fn url_for(&self, target: &str) -> Result<Url> {
        let base = self.host.as_str().trim_end_matches('/');
        let target = target.trim_start_matches('/');
        Url::parse(&format!("{base}/{target}")).map_err(ApiError::InvalidUrl)
    }

    /// Headers for a request; `json` adds the JSON content negotiation pair.
    pub(crate) fn headers(&self, json: bool) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(credentials) = &self.credentials {
            let value = HeaderValue::from_str(&credentials.basic_header())
                .map_err(|e| ApiError::InvalidArgument(format!("invalid credentials: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        if json {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }
}
