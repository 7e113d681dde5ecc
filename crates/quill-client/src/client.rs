//! HTTP transport: one shared connection pool, bearer-token auth, and
//! uniform status-to-error mapping for all managers.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Shared HTTP transport.
///
/// Cheap to clone; all clones share the same connection pool. The token is
/// immutable after construction, so a `Client` is safe to use from multiple
/// tasks concurrently.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {:?}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "base URL {:?} cannot carry path segments",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    /// Attach a bearer token; it is sent as `Authorization: Token <value>`
    /// on every subsequent request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build a URL under the base, with a trailing slash.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        {
            // Cannot fail: cannot-be-a-base URLs are rejected in `new`.
            let mut path = url.path_segments_mut().expect("base URL validated");
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
            path.push("");
        }
        url
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let resp = self.send(self.http.get(url)).await?;
        Ok(resp.json().await?)
    }

    /// GET that treats 404 as absence rather than an error.
    pub(crate) async fn get_json_optional<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Option<T>> {
        match self.send(self.http.get(url)).await {
            Ok(resp) => Ok(Some(resp.json().await?)),
            Err(Error::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<reqwest::Response> {
        self.send(self.http.post(url).json(body)).await
    }

    pub(crate) async fn put_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<reqwest::Response> {
        self.send(self.http.put(url).json(body)).await
    }

    pub(crate) async fn delete(&self, url: Url) -> Result<reqwest::Response> {
        self.send(self.http.delete(url)).await
    }

    /// Reset the server fixture. Test servers only; a production server
    /// answers 404 here.
    pub async fn reset(&self) -> Result<()> {
        let url = self.url(&["reset"]);
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let req = match &self.token {
            Some(token) => req.header(AUTHORIZATION, format!("Token {token}")),
            None => req,
        };

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let url = resp.url().to_string();
        let message = server_detail(resp, status).await;
        debug!(%status, %url, message, "request failed");
        Err(Error::Http {
            status: status.as_u16(),
            url,
            message,
            retryable: status.is_server_error(),
        })
    }
}

/// Pull the server's `detail` message out of an error body, falling back to
/// the status line when the body is not the expected JSON shape.
async fn server_detail(resp: reqwest::Response, status: StatusCode) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }

    match resp.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

/// Exchanges credentials for a bearer token.
pub struct Authenticator {
    client: Client,
}

impl Authenticator {
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// `POST /api/v1/authentication/login/`. Rejected credentials surface as
    /// [`Error::Authentication`] carrying the server's message.
    pub async fn get_auth_token(&self, username: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            username: &'a str,
            password: &'a str,
        }

        #[derive(Deserialize)]
        struct LoginResponse {
            token: String,
        }

        let url = self.client.url(&["api", "v1", "authentication", "login"]);
        let body = LoginRequest { username, password };

        match self.client.post_json(url, &body).await {
            Ok(resp) => {
                let login: LoginResponse = resp.json().await?;
                debug!(username, "obtained auth token");
                Ok(login.token)
            }
            Err(Error::Http {
                status, message, ..
            }) if (400..500).contains(&status) => Err(Error::Authentication(message)),
            Err(e) => Err(e),
        }
    }
}
