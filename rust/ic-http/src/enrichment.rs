//! SPEC_FULL §4.13: the enrichment seam. GeoIP/user-agent lookups are an
//! external collaborator (§1 out-of-scope); this crate only owns the
//! trait and a degraded default so the worker process has something to
//! call against without standing up `maxmind`/`ua-parser` integrations.
//! Grounded on the narrow-trait-plus-fake-impl shape of `ic_query::Backend`.

use std::net::IpAddr;

use tracing::warn;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CityInfo {
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AsnInfo {
    pub asn: Option<u32>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UserAgentInfo {
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
}

/// §4.13: `lookup_city`/`lookup_asn`/`detect_user_agent`. Runs in the
/// worker process only — the ingest path only records the raw IP/UA
/// strings (`ic_http::events::EnqueuedEvent`) and leaves interpretation
/// to whichever `Enricher` the worker is configured with.
pub trait Enricher: Send + Sync {
    fn lookup_city(&self, ip: IpAddr) -> CityInfo;
    fn lookup_asn(&self, ip: IpAddr) -> AsnInfo;
    fn detect_user_agent(&self, ua: &str) -> UserAgentInfo;
}

/// §7: "Non-fatal: GeoIP init failure (service continues with
/// default-valued enrichment)". This is that default, used whenever a
/// real provider isn't configured or fails to initialize.
pub struct NullEnricher;

impl NullEnricher {
    pub fn new() -> Self {
        warn!("no enrichment provider configured; using degraded/default-valued enrichment");
        Self
    }
}

impl Default for NullEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl Enricher for NullEnricher {
    fn lookup_city(&self, _ip: IpAddr) -> CityInfo {
        CityInfo::default()
    }

    fn lookup_asn(&self, _ip: IpAddr) -> AsnInfo {
        AsnInfo::default()
    }

    fn detect_user_agent(&self, _ua: &str) -> UserAgentInfo {
        UserAgentInfo::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_enricher_returns_defaulted_values() {
        let enricher = NullEnricher::new();
        let city = enricher.lookup_city("127.0.0.1".parse().unwrap());
        assert!(city.city.is_none());
        let ua = enricher.detect_user_agent("curl/8.0");
        assert!(ua.browser.is_none());
    }
}
