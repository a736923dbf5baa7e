//! Okta connection configuration

use serde::{Deserialize, Serialize};
use url::Url;
use xavyo_query::{QueryError, QueryResult};

/// Largest page Okta serves on its list endpoints.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Configuration for one Okta organization.
#[derive(Clone, Serialize, Deserialize)]
pub struct OktaConfig {
    /// Organization URL (e.g., "https://dev-123456.okta.com").
    pub org_url: String,

    /// API token, sent as `Authorization: SSWS <token>`.
    #[serde(default, skip_serializing)]
    pub api_token: String,

    /// `limit` sent on list calls that do not set their own.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_page_size() -> u32 {
    200
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("xavyo-connector-okta/{}", env!("CARGO_PKG_VERSION"))
}

impl std::fmt::Debug for OktaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OktaConfig")
            .field("org_url", &self.org_url)
            .field("api_token", &"***REDACTED***")
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl OktaConfig {
    /// Create a configuration with default settings.
    pub fn new(org_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            org_url: org_url.into(),
            api_token: api_token.into(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }

    /// Set the default page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set request and connect timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, request_secs: u64, connect_secs: u64) -> Self {
        self.request_timeout_secs = request_secs;
        self.connect_timeout_secs = connect_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Parsed organization URL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `org_url` is not an absolute
    /// http(s) URL with a host.
    pub fn base_url(&self) -> QueryResult<Url> {
        let url = Url::parse(&self.org_url).map_err(|e| {
            QueryError::invalid_configuration(format!("invalid org_url: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(QueryError::invalid_configuration(format!(
                "unsupported org_url scheme: {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(QueryError::invalid_configuration("org_url has no host"));
        }
        Ok(url)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` describing the first problem found.
    pub fn validate(&self) -> QueryResult<()> {
        if self.org_url.is_empty() {
            return Err(QueryError::invalid_configuration("org_url is required"));
        }
        self.base_url()?;

        if self.api_token.is_empty() {
            return Err(QueryError::invalid_configuration("api_token is required"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(QueryError::invalid_configuration(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(QueryError::invalid_configuration(
                "timeouts must be at least one second",
            ));
        }
        Ok(())
    }
}
