use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use memchr::memmem;
use reqwest::{header::HOST, redirect, Client};
use url::Url;

use crate::{Error, ProbeError};

/// One HTTP round trip against a target address with a fixed Host header.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(
        &self,
        target: Ipv4Addr,
        host: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: Client,
    reference_url: Url,
    port: u16,
}

impl ReqwestProbe {
    pub fn new(reference_url: Url, port: u16) -> Result<Self, Error> {
        // Targets answer with certificates for other names; connections are never reused.
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0)
            .redirect(redirect::Policy::limited(10))
            .build()?;

        Ok(ReqwestProbe {
            client,
            reference_url,
            port,
        })
    }

    pub fn reference_url(&self) -> &Url {
        &self.reference_url
    }

    /// Fetches the reference URL as-is; the body becomes the bytes searched
    /// for in every target response.
    pub async fn fetch_reference(&self, timeout: Duration) -> Result<Vec<u8>, ProbeError> {
        self.get(self.reference_url.clone(), None, timeout).await
    }

    /// Reference path and query, plain http, pointed at `target`.
    pub fn target_url(&self, target: Ipv4Addr) -> Result<Url, ProbeError> {
        let mut url = self.reference_url.clone();
        url.set_scheme("http")
            .map_err(|_| ProbeError::InvalidTarget(url.to_string()))?;
        url.set_ip_host(target.into())
            .map_err(|_| ProbeError::InvalidTarget(url.to_string()))?;
        url.set_port(Some(self.port))
            .map_err(|_| ProbeError::InvalidTarget(url.to_string()))?;
        Ok(url)
    }

    async fn get(
        &self,
        url: Url,
        host: Option<&str>,
        timeout: Duration,
    ) -> Result<Vec<u8>, ProbeError> {
        let mut request = self.client.get(url).timeout(timeout);
        if let Some(host) = host {
            request = request.header(HOST, host);
        }

        let response = request.send().await?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Probe for ReqwestProbe {
    async fn probe(
        &self,
        target: Ipv4Addr,
        host: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, ProbeError> {
        let url = self.target_url(target)?;
        self.get(url, Some(host), timeout).await
    }
}

/// Exact byte-for-byte substring test. An empty needle always matches.
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || memmem::find(haystack, needle).is_some()
}
