//! Approximate location lookup via an IP-geolocation endpoint

use crate::AlertError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Sentinel returned whenever the lookup fails for any reason
pub const LOCATION_UNAVAILABLE: &str = "Location unavailable";

/// Default lookup timeout (seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Best-effort place lookup. Implementations never fail; they return
/// [`LOCATION_UNAVAILABLE`] instead.
pub trait LocationProvider {
    fn lookup(&self, endpoint: &str) -> String;
}

/// Subset of the IP-geolocation JSON payload we care about
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IpLocation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// "lat,lon"
    #[serde(default)]
    pub loc: Option<String>,
}

impl IpLocation {
    /// Render as `"City, Region (lat,lon)"`
    pub fn describe(&self) -> String {
        format!(
            "{}, {} ({})",
            self.city.as_deref().unwrap_or("unknown"),
            self.region.as_deref().unwrap_or(""),
            self.loc.as_deref().unwrap_or("unknown"),
        )
    }
}

/// Location provider backed by a blocking HTTP GET with a hard timeout
pub struct HttpLocationProvider {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpLocationProvider {
    /// Create a provider with the default 5 second timeout
    pub fn new() -> Result<Self, AlertError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a provider with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch(&self, endpoint: &str) -> Result<IpLocation, reqwest::Error> {
        self.client
            .get(endpoint)
            .send()?
            .error_for_status()?
            .json::<IpLocation>()
    }
}

impl LocationProvider for HttpLocationProvider {
    fn lookup(&self, endpoint: &str) -> String {
        debug!("Looking up location via {}", endpoint);
        match self.fetch(endpoint) {
            Ok(location) => location.describe(),
            Err(e) => {
                warn!("Location lookup failed: {}", e);
                LOCATION_UNAVAILABLE.to_string()
            }
        }
    }
}
