use url::Url;

use crate::client::Client;
use crate::error::{ErrorCode, LibsqlError};
use crate::types::IntMode;

/// Environment variable read by [`Config::from_env`] for the database URL.
pub const URL_ENV: &str = "LIBSQL_URL";
/// Environment variable read by [`Config::from_env`] for the auth token.
pub const AUTH_TOKEN_ENV: &str = "LIBSQL_AUTH_TOKEN";

/// Options for connecting to a database.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    pub auth_token: Option<String>,
    pub int_mode: IntMode,
    /// Overrides the `tls` URL parameter for `libsql:` URLs
    pub tls: Option<bool>,
}

impl Config {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            int_mode: IntMode::default(),
            tls: None,
        }
    }

    /// Read `LIBSQL_URL` and, if present, `LIBSQL_AUTH_TOKEN`.
    ///
    /// # Errors
    ///
    /// `URL_INVALID` when `LIBSQL_URL` is not set.
    pub fn from_env() -> Result<Self, LibsqlError> {
        let url = std::env::var(URL_ENV).map_err(|_| {
            LibsqlError::new(ErrorCode::UrlInvalid, format!("{URL_ENV} is not set"))
        })?;
        let mut config = Self::new(url);
        config.auth_token = std::env::var(AUTH_TOKEN_ENV).ok();
        Ok(config)
    }

    #[must_use]
    pub fn with_auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = Some(auth_token.into());
        self
    }

    #[must_use]
    pub fn with_int_mode(mut self, int_mode: IntMode) -> Self {
        self.int_mode = int_mode;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Validate the URL and resolve the transport. Runs before any network activity.
    ///
    /// # Errors
    ///
    /// `URL_INVALID`, `URL_SCHEME_NOT_SUPPORTED` or `URL_PARAM_NOT_SUPPORTED`.
    pub fn expand(&self) -> Result<ExpandedConfig, LibsqlError> {
        let url = Url::parse(&self.url)?;

        let mut auth_token = self.auth_token.clone();
        let mut tls = self.tls;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "authToken" => {
                    if auth_token.is_none() {
                        auth_token = Some(value.into_owned());
                    }
                }
                "tls" => {
                    let parsed = match value.as_ref() {
                        "0" => false,
                        "1" => true,
                        other => {
                            return Err(LibsqlError::new(
                                ErrorCode::UrlInvalid,
                                format!(
                                    "Unknown value for the \"tls\" query argument: {other:?}. Supported values are \"0\" and \"1\""
                                ),
                            ));
                        }
                    };
                    tls.get_or_insert(parsed);
                }
                other => {
                    return Err(LibsqlError::new(
                        ErrorCode::UrlParamNotSupported,
                        format!("Unsupported URL query parameter {other:?}"),
                    ));
                }
            }
        }

        let scheme = resolve_scheme(url.scheme(), tls)?;
        let host = url.host_str().ok_or_else(|| {
            LibsqlError::new(ErrorCode::UrlInvalid, format!("URL {:?} has no host", self.url))
        })?;
        let mut rebuilt = format!("{}://{host}", scheme.as_str());
        if let Some(port) = url.port() {
            rebuilt.push_str(&format!(":{port}"));
        }
        rebuilt.push_str(url.path());

        Ok(ExpandedConfig {
            scheme,
            url: Url::parse(&rebuilt)?,
            auth_token,
            int_mode: self.int_mode,
        })
    }
}

fn resolve_scheme(scheme: &str, tls: Option<bool>) -> Result<Scheme, LibsqlError> {
    let resolved = match scheme {
        "libsql" => {
            if tls.unwrap_or(true) {
                Scheme::Wss
            } else {
                Scheme::Ws
            }
        }
        "wss" => Scheme::Wss,
        "ws" => Scheme::Ws,
        "https" => Scheme::Https,
        "http" => Scheme::Http,
        "file" => {
            return Err(LibsqlError::new(
                ErrorCode::UrlSchemeNotSupported,
                "The client does not open local databases: URL scheme \"file:\" is not supported",
            ));
        }
        other => {
            return Err(LibsqlError::new(
                ErrorCode::UrlSchemeNotSupported,
                format!(
                    "The client supports only \"libsql:\", \"wss:\", \"ws:\", \"https:\" and \"http:\" URLs, got {:?}",
                    format!("{other}:")
                ),
            ));
        }
    };
    if scheme != "libsql"
        && let Some(tls) = tls
        && tls != resolved.is_tls()
    {
        return Err(LibsqlError::new(
            ErrorCode::UrlInvalid,
            format!("A \"{scheme}:\" URL cannot be combined with tls={}", u8::from(tls)),
        ));
    }
    Ok(resolved)
}

/// Transport scheme after resolving `libsql:` and the `tls` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl Scheme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }

    #[must_use]
    pub fn is_tls(self) -> bool {
        matches!(self, Scheme::Https | Scheme::Wss)
    }

    #[must_use]
    pub fn protocol(self) -> Protocol {
        match self {
            Scheme::Http | Scheme::Https => Protocol::Http,
            Scheme::Ws | Scheme::Wss => Protocol::Ws,
        }
    }
}

/// Which transport variant serves a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Stateless request/response
    Http,
    /// Stateful connection with interactive transactions
    Ws,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Ws => "ws",
        }
    }
}

/// A validated configuration: the resolved scheme, the URL without query parameters, and the
/// credential.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedConfig {
    pub scheme: Scheme,
    pub url: Url,
    pub auth_token: Option<String>,
    pub int_mode: IntMode,
}

/// Fluent builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            config: Config::new(url),
        }
    }

    #[must_use]
    pub fn auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.config.auth_token = Some(auth_token.into());
        self
    }

    #[must_use]
    pub fn int_mode(mut self, int_mode: IntMode) -> Self {
        self.config.int_mode = int_mode;
        self
    }

    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.config.tls = Some(tls);
        self
    }

    #[must_use]
    pub fn finish(self) -> Config {
        self.config
    }

    /// Connect a [`Client`] with these options.
    ///
    /// # Errors
    ///
    /// Configuration errors before any I/O, then transport errors from connecting.
    pub async fn build(self) -> Result<Client, LibsqlError> {
        Client::connect(&self.finish()).await
    }
}
