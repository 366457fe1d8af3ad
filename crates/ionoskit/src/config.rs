//! Client configuration and credentials.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::time::Duration;

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.ionos.com/cloudapi/v6";

/// How requests authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Bearer token.
    Token(String),
    /// HTTP basic authentication.
    Basic {
        /// Account user name.
        username: String,
        /// Account password.
        password: String,
    },
}

impl Credentials {
    /// Pick credentials from optional inputs.
    ///
    /// A token wins over a username/password pair. Fails unless a token or
    /// both username and password are present.
    pub fn resolve(
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        match (non_empty(token), non_empty(username), non_empty(password)) {
            (Some(token), _, _) => Ok(Self::Token(token)),
            (None, Some(username), Some(password)) => Ok(Self::Basic { username, password }),
            _ => Err(Error::MissingCredentials),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        match self {
            Self::Token(token) => format!("Bearer {token}"),
            Self::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
        }
    }
}

/// Settings for a [`crate::Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without trailing slash.
    pub api_url: String,
    pub credentials: Credentials,
    pub user_agent: String,
    /// `depth` query parameter for reads, controlling how much of each object is expanded.
    pub depth: u8,
    /// Overall timeout for a single HTTP exchange.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            credentials,
            user_agent: format!("ionoskit/{}", env!("CARGO_PKG_VERSION")),
            depth: 1,
            timeout: Duration::from_secs(60),
        }
    }

    /// Override the endpoint; a trailing slash is dropped.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    /// Absolute URL for an API path such as `/datacenters`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}
