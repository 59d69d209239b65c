use async_trait::async_trait;

use crate::error::LibsqlError;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one JSON request and returns the raw response.
///
/// Implementations only report connection-level failures as errors; non-2xx statuses are
/// returned as responses and mapped by [`crate::http::decode_response`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, path: &str, body: String) -> Result<HttpResponse, LibsqlError>;
}

#[cfg(feature = "http")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use async_trait::async_trait;
    use reqwest::header::CONTENT_TYPE;
    use url::Url;

    use super::{HttpResponse, HttpTransport};
    use crate::error::LibsqlError;

    /// [`HttpTransport`] over a pooled `reqwest` client, with bearer authentication.
    pub struct ReqwestTransport {
        base_url: Url,
        auth_token: Option<String>,
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// # Errors
        ///
        /// `TRANSPORT_ERROR` if the HTTP client cannot be initialised.
        pub fn new(mut base_url: Url, auth_token: Option<String>) -> Result<Self, LibsqlError> {
            // Request paths are joined relative to the base, which needs a trailing slash.
            if !base_url.path().ends_with('/') {
                let path = format!("{}/", base_url.path());
                base_url.set_path(&path);
            }
            let client = reqwest::Client::builder().build()?;
            Ok(Self {
                base_url,
                auth_token,
                client,
            })
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn post(&self, path: &str, body: String) -> Result<HttpResponse, LibsqlError> {
            let url = self.base_url.join(path)?;
            let mut request = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body);
            if let Some(token) = &self.auth_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        }
    }
}
