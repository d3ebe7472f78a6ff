//! High-level access to the TED ECC API.
//!
//! Every fetch absorbs transport failures: the caller gets `None` and the
//! failure is kept as the gateway's last error for diagnostics.

use crate::error::{AppError, TransportError};
use crate::models::{DashData, EnergyScope, Rate, SpyderData, SystemOverview, SystemSettings};
use crate::transport::{HttpTransport, QueryArgs, RestClient, Transport, WireFormat};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

const SETTINGS_RESOURCE: &str = "SystemSettings.xml";
const RATE_RESOURCE: &str = "Rate.xml";
const SPYDER_RESOURCE: &str = "SpyderData.xml";
const OVERVIEW_RESOURCE: &str = "SystemOverview.xml";
const DASH_RESOURCE: &str = "DashData.xml";

/// Last failed call, as reported to operators.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayError {
    pub resource: String,
    pub message: String,
    pub status: Option<u16>,
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{}: {} (status {})", self.resource, self.message, status),
            None => write!(f, "{}: {}", self.resource, self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ArgsKey {
    cost: bool,
    scope: EnergyScope,
    mtu: Option<u8>,
}

impl ArgsKey {
    fn new(cost: bool, scope: EnergyScope, mtu: Option<u8>) -> Self {
        // The selector only reaches the wire for the MTU scope.
        let mtu = match scope {
            EnergyScope::Mtu => Some(mtu.unwrap_or(1)),
            _ => None,
        };
        Self { cost, scope, mtu }
    }

    fn build(&self) -> QueryArgs {
        let mut args = QueryArgs::new();
        args.insert("T".into(), if self.cost { "1" } else { "0" }.into());
        args.insert("D".into(), self.scope.code().to_string());
        if let Some(mtu) = self.mtu {
            args.insert("M".into(), mtu.to_string());
        }
        args
    }
}

/// Query arguments per `(cost, scope, mtu)`, built on first use and never
/// replaced afterwards.
#[derive(Default)]
pub struct ArgsCache {
    entries: Mutex<HashMap<ArgsKey, Arc<QueryArgs>>>,
}

impl ArgsCache {
    pub fn get(&self, cost: bool, scope: EnergyScope, mtu: Option<u8>) -> Arc<QueryArgs> {
        let key = ArgsKey::new(cost, scope, mtu);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(key)
            .or_insert_with(|| Arc::new(key.build()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct DeviceGateway<T> {
    client: RestClient<T>,
    args: ArgsCache,
    last_error: Mutex<Option<GatewayError>>,
}

impl DeviceGateway<HttpTransport> {
    /// Gateway speaking XML over HTTP to the ECC at `hostname:port`.
    pub fn connect(hostname: &str, port: u16, timeout: Duration) -> crate::error::Result<Self> {
        let transport =
            HttpTransport::new(timeout).map_err(|e| AppError::Config(e.to_string()))?;
        let client = RestClient::new(&Self::api_url(hostname, port), WireFormat::Xml, transport)
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(Self::new(client))
    }
}

impl<T: Transport> DeviceGateway<T> {
    pub fn new(client: RestClient<T>) -> Self {
        Self {
            client,
            args: ArgsCache::default(),
            last_error: Mutex::new(None),
        }
    }

    /// Base URL of the ECC API, e.g. `http://ted.lan/api/`.
    pub fn api_url(hostname: &str, port: u16) -> String {
        format!("http://{}:{}/api/", hostname, port)
    }

    pub fn client(&self) -> &RestClient<T> {
        &self.client
    }

    pub fn args_cache(&self) -> &ArgsCache {
        &self.args
    }

    pub fn last_error(&self) -> Option<GatewayError> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Fetch the settings once to make sure the ECC answers at all.
    pub async fn probe(&self) -> crate::error::Result<SystemSettings> {
        match self.get_settings().await {
            Some(settings) => {
                info!(
                    url = %self.client.base_url(),
                    mtus = settings.mtu_count,
                    spyders = settings.spyders.spyder.len(),
                    "connected to TED"
                );
                Ok(settings)
            }
            None => Err(AppError::Unreachable(
                self.last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no response".to_string()),
            )),
        }
    }

    pub async fn get_settings(&self) -> Option<SystemSettings> {
        self.fetch(SETTINGS_RESOURCE, &cache_buster()).await
    }

    pub async fn get_rates(&self) -> Option<Rate> {
        self.fetch(RATE_RESOURCE, &cache_buster()).await
    }

    pub async fn get_circuit_usage(
        &self,
        cost: bool,
        scope: EnergyScope,
        mtu: Option<u8>,
    ) -> Option<SpyderData> {
        let args = self.args.get(cost, scope, mtu);
        self.fetch(SPYDER_RESOURCE, &args).await
    }

    pub async fn get_system_overview(
        &self,
        cost: bool,
        scope: EnergyScope,
        mtu: Option<u8>,
    ) -> Option<SystemOverview> {
        let args = self.args.get(cost, scope, mtu);
        self.fetch(OVERVIEW_RESOURCE, &args).await
    }

    pub async fn get_dashboard(
        &self,
        cost: bool,
        scope: EnergyScope,
        mtu: Option<u8>,
    ) -> Option<DashData> {
        let args = self.args.get(cost, scope, mtu);
        let mut data: DashData = self.fetch(DASH_RESOURCE, &args).await?;
        data.scope = scope;
        data.cost = cost;
        data.mtu = mtu;
        Some(data)
    }

    async fn fetch<R: DeserializeOwned>(&self, resource: &str, args: &QueryArgs) -> Option<R> {
        match self
            .client
            .execute(resource, Method::GET, None, args)
            .await
        {
            Ok(value) => Some(value),
            Err(e) => {
                self.record_failure(resource, &e);
                None
            }
        }
    }

    fn record_failure(&self, resource: &str, err: &TransportError) {
        warn!(resource = %resource, status = ?err.status(), error = %err, "TED request failed");
        let mut last = self.last_error.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(GatewayError {
            resource: resource.to_string(),
            message: err.to_string(),
            status: err.status(),
        });
    }
}

fn cache_buster() -> QueryArgs {
    let mut args = QueryArgs::new();
    args.insert("U".into(), chrono::Utc::now().timestamp_millis().to_string());
    args
}
