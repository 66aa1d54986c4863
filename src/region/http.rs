//! HTTP transport for region RPC calls.
//!
//! # Responsibilities
//! - Issue facet requests against the configured region endpoints
//! - Track which endpoints are currently answering (the connection set)
//! - Map transport and status failures onto `RpcError`
//!
//! # Data Flow
//! ```text
//! controller_type (first call of every tick)
//!     → GET every endpoint concurrently
//!     → answered: insert/refresh its Connection; failed: drop it
//!     → first answering endpoint in config order becomes preferred
//!
//! time / dns / proxy facets
//!     → preferred endpoint first, then the others in config order
//!     → only a transport failure moves on to the next endpoint
//! ```
//!
//! # Design Decisions
//! - Every request carries the configured timeout
//! - An HTTP status is an answer: a 404 or 5xx from a reachable region is
//!   returned as is, every region serves the same node records
//! - One tick's facets are read from one endpoint unless it drops mid-tick

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::future::join_all;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::RegionConfig;
use crate::region::client::{ConnectionRegistry, RegionClient, RpcError};
use crate::region::types::{
    Connection, ConnectionSet, ControllerType, DnsSettings, ProxySettings, TimeSettings,
};

#[derive(Debug, Clone)]
struct Endpoint {
    event_loop: String,
    base_url: Url,
}

/// Region client speaking JSON over HTTP.
pub struct HttpRegionClient {
    endpoints: Vec<Endpoint>,
    client: reqwest::Client,
    connections: DashMap<String, Connection>,
    /// Index of the endpoint that answered most recently.
    preferred: AtomicUsize,
}

impl HttpRegionClient {
    /// Build a client from configuration.
    pub fn new(config: &RegionConfig) -> Result<Self, RpcError> {
        let mut endpoints = Vec::with_capacity(config.endpoints.len());
        for endpoint in &config.endpoints {
            let base_url: Url = endpoint.url.parse().map_err(|e| {
                RpcError::Unexpected(format!("Invalid region URL '{}': {}", endpoint.url, e))
            })?;
            endpoints.push(Endpoint {
                event_loop: endpoint.event_loop.clone(),
                base_url,
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RpcError::Unexpected(e.to_string()))?;

        tracing::info!(endpoints = endpoints.len(), "Region client initialized");

        Ok(Self {
            endpoints,
            client,
            connections: DashMap::new(),
            preferred: AtomicUsize::new(0),
        })
    }

    fn url(endpoint: &Endpoint, system_id: &str, facet: &str) -> Result<Url, RpcError> {
        endpoint
            .base_url
            .join(&format!("api/rack/{}/{}", system_id, facet))
            .map_err(|e| RpcError::Unexpected(e.to_string()))
    }

    /// Send one request and record whether the endpoint answered.
    async fn send(&self, endpoint: &Endpoint, url: Url) -> Option<Response> {
        match self.client.get(url).send().await {
            Ok(response) => {
                if let Some(addr) = response.remote_addr() {
                    self.connections.insert(
                        endpoint.event_loop.clone(),
                        Connection::new(endpoint.event_loop.clone(), addr),
                    );
                }
                Some(response)
            }
            Err(e) => {
                if self.connections.remove(&endpoint.event_loop).is_some() {
                    tracing::info!(event_loop = %endpoint.event_loop, error = %e, "Region connection lost");
                } else {
                    tracing::debug!(event_loop = %endpoint.event_loop, error = %e, "Region endpoint unreachable");
                }
                None
            }
        }
    }

    /// Ask every endpoint at once; answer from the first one in config order.
    async fn survey<T: DeserializeOwned>(&self, system_id: &str, facet: &str) -> Result<T, RpcError> {
        let urls = self
            .endpoints
            .iter()
            .map(|endpoint| Self::url(endpoint, system_id, facet))
            .collect::<Result<Vec<_>, _>>()?;

        let responses = join_all(
            self.endpoints
                .iter()
                .zip(urls)
                .map(|(endpoint, url)| self.send(endpoint, url)),
        )
        .await;

        let answered = responses
            .into_iter()
            .enumerate()
            .find_map(|(index, response)| response.map(|r| (index, r)));

        match answered {
            Some((index, response)) => {
                self.preferred.store(index, Ordering::Relaxed);
                decode(system_id, facet, response).await
            }
            None => Err(RpcError::NoConnectionsAvailable),
        }
    }

    /// Ask the preferred endpoint, falling through on transport failure.
    async fn call<T: DeserializeOwned>(&self, system_id: &str, facet: &str) -> Result<T, RpcError> {
        let count = self.endpoints.len();
        let preferred = self.preferred.load(Ordering::Relaxed);
        let order = std::iter::once(preferred)
            .chain((0..count).filter(move |&index| index != preferred))
            .filter(move |&index| index < count);

        for index in order {
            let endpoint = &self.endpoints[index];
            let url = Self::url(endpoint, system_id, facet)?;
            if let Some(response) = self.send(endpoint, url).await {
                self.preferred.store(index, Ordering::Relaxed);
                return decode(system_id, facet, response).await;
            }
        }

        Err(RpcError::NoConnectionsAvailable)
    }
}

async fn decode<T: DeserializeOwned>(system_id: &str, facet: &str, response: Response) -> Result<T, RpcError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RpcError::NoSuchNode(system_id.to_string()));
    }
    if !status.is_success() {
        return Err(RpcError::Protocol(format!("{} returned {}", facet, status)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| RpcError::Protocol(format!("{}: {}", facet, e)))
}

#[async_trait]
impl RegionClient for HttpRegionClient {
    async fn controller_type(&self, system_id: &str) -> Result<ControllerType, RpcError> {
        self.survey(system_id, "controller-type").await
    }

    async fn time_configuration(&self, system_id: &str) -> Result<TimeSettings, RpcError> {
        self.call(system_id, "time-configuration").await
    }

    async fn dns_configuration(&self, system_id: &str) -> Result<DnsSettings, RpcError> {
        self.call(system_id, "dns-configuration").await
    }

    async fn proxy_configuration(&self, system_id: &str) -> Result<ProxySettings, RpcError> {
        self.call(system_id, "proxy-configuration").await
    }
}

impl ConnectionRegistry for HttpRegionClient {
    fn connections(&self) -> ConnectionSet {
        self.connections
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }
}
