//! HTTP transport
//!
//! Posts JSON envelopes to the broker's publish and release endpoints with
//! `reqwest`. No client-side timeout is configured here: the per-attempt
//! window is enforced by the publisher so that every transport behaves the
//! same way.
//!
//! The broker only accepts release calls from a logged-in session, which it
//! reads from the `access_token` cookie. When a token is configured it is
//! sent on every call.

use async_trait::async_trait;
use reqwest::header::COOKIE;
use tracing::debug;
use url::Url;

use crate::config::BrokerSettings;
use crate::transport::BrokerTransport;
use crate::transport::message::{PublishReply, PublishRequest, ReleaseRequest};
use crate::utils::error::TransportError;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    publish_url: Url,
    release_url: Url,
    access_token: Option<String>,
}

impl HttpTransport {
    /// Builds a transport from a broker base URL and the two endpoint paths.
    ///
    /// Endpoint paths are resolved below the base URL's path, so
    /// `http://host/api` with `/publish` posts to `http://host/api/publish`.
    pub fn new(base_url: &str, publish_path: &str, release_path: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base_url)?;
        Ok(Self {
            client: reqwest::Client::new(),
            publish_url: endpoint(&base, publish_path)?,
            release_url: endpoint(&base, release_path)?,
            access_token: None,
        })
    }

    pub fn from_settings(settings: &BrokerSettings) -> Result<Self, url::ParseError> {
        let transport = Self::new(
            &settings.base_url,
            &settings.publish_path,
            &settings.release_path,
        )?;
        Ok(match settings.access_token.as_deref() {
            Some(token) if !token.is_empty() => transport.with_access_token(token),
            _ => transport,
        })
    }

    /// Sends `token` as the `access_token` session cookie.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn publish_url(&self) -> &Url {
        &self.publish_url
    }

    pub fn release_url(&self) -> &Url {
        &self.release_url
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn post(&self, url: &Url) -> reqwest::RequestBuilder {
        let request = self.client.post(url.clone());
        match &self.access_token {
            Some(token) => request.header(COOKIE, format!("access_token={token}")),
            None => request,
        }
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
}

#[async_trait]
impl BrokerTransport for HttpTransport {
    async fn publish(&self, request: &PublishRequest<'_>) -> Result<PublishReply, TransportError> {
        let response = self
            .post(&self.publish_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        debug!("publish to {} answered {}", self.publish_url, body.trim());
        Ok(PublishReply::from_body(&body))
    }

    async fn release(&self, request: &ReleaseRequest<'_>) -> Result<(), TransportError> {
        let response = self
            .post(&self.release_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }
}
