//! REST plumbing between the gateway and the device.
//!
//! A [`Transport`] moves bytes; a [`RestClient`] builds the request and
//! decodes the payload into the caller's record type. Failures are returned
//! as [`TransportError`] values and never panic.

use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

pub type QueryArgs = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub body: Option<(String, &'static str)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// [`Transport`] over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        if let Some((body, content_type)) = request.body {
            builder = builder.header(CONTENT_TYPE, content_type).body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Response {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// Encoding of every payload exchanged by one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Xml,
    Json,
}

impl WireFormat {
    fn content_type(self) -> &'static str {
        match self {
            WireFormat::Xml => "application/xml",
            WireFormat::Json => "application/json",
        }
    }

    pub fn decode<T: DeserializeOwned>(self, payload: &str) -> Result<T, String> {
        match self {
            WireFormat::Xml => quick_xml::de::from_str(payload).map_err(|e| e.to_string()),
            WireFormat::Json => serde_json::from_str(payload).map_err(|e| e.to_string()),
        }
    }
}

pub struct RestClient<T> {
    base_url: Url,
    format: WireFormat,
    transport: T,
}

impl<T: Transport> RestClient<T> {
    pub fn new(base_url: &str, format: WireFormat, transport: T) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            base_url,
            format,
            transport,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the absolute URL for `resource` with `args` as the query string.
    pub fn url_for(&self, resource: &str, args: &QueryArgs) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(resource.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl(format!("{resource}: {e}")))?;
        if !args.is_empty() {
            url.query_pairs_mut().extend_pairs(args.iter());
        }
        Ok(url)
    }

    /// Issue one request and decode a successful payload into `R`.
    pub async fn execute<R: DeserializeOwned>(
        &self,
        resource: &str,
        method: Method,
        body: Option<String>,
        args: &QueryArgs,
    ) -> Result<R, TransportError> {
        let url = self.url_for(resource, args)?;
        debug!(%method, %url, "sending request");

        let request = Request {
            method,
            url,
            body: body.map(|b| (b, self.format.content_type())),
        };
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                reason: response.reason,
            });
        }

        self.format
            .decode(&response.body)
            .map_err(|message| TransportError::Decode {
                status: response.status,
                message,
            })
    }
}
