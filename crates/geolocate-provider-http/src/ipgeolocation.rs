// # ipgeolocation.io Adapter
//
// ## API Reference
//
// - Lookup: GET `{base}/ipgeo?apiKey=..&ip=..`
// - Self:   same endpoint without `ip`
// - Optional: `lang` (only when not "en"), `fields` built from the
//   include flags (hostname, security, user_agent; paid plans)
//
// Location fields are either flat or nested under `location`. Timezone
// data sits under `time_zone` with `offset` already in hours.

use async_trait::async_trait;
use geolocate_core::config::BackendKind;
use geolocate_core::traits::{GeoProvider, LookupFlow, ProviderContext, ProviderFactory};
use geolocate_core::{Error, GeolocationDetails, LookupTarget, RawRecord, Result};
use reqwest::StatusCode;
use serde_json::Value;

use crate::fields::{self, RawBuilder};
use crate::transport::{Auth, HttpTransport};

/// ipgeolocation.io API base URL
pub const IPGEOLOCATION_BASE_URL: &str = "https://api.ipgeolocation.io";

/// ipgeolocation.io lookup adapter
pub struct IpGeolocationProvider {
    /// ⚠️ NEVER log this value
    api_key: String,
    base_url: String,
    language: String,
    extra_fields: Vec<&'static str>,
    flow: LookupFlow,
    http: HttpTransport,
}

impl IpGeolocationProvider {
    /// Build from context; `api_key` is required
    pub fn new(context: &ProviderContext) -> Result<Self> {
        let api_key = context.require_secret("api_key")?;
        let settings = &context.settings;

        let mut extra_fields = Vec::new();
        if settings.include_hostname {
            extra_fields.push("hostname");
        }
        if settings.include_security {
            extra_fields.push("security");
        }
        if settings.include_useragent {
            extra_fields.push("user_agent");
        }

        Ok(Self {
            api_key,
            base_url: context.base_url(IPGEOLOCATION_BASE_URL),
            language: settings.language.trim().to_string(),
            extra_fields,
            flow: context.lookup_flow(),
            http: HttpTransport::new(&context.name, "IPGeolocation", context.timeout, status_message)?,
        })
    }

    fn query(&self, target: LookupTarget) -> Vec<(&'static str, String)> {
        let mut query = vec![("apiKey", self.api_key.clone())];
        if let Some(ip) = target.address() {
            query.push(("ip", ip.to_string()));
        }
        if !self.language.is_empty() && self.language != "en" {
            query.push(("lang", self.language.clone()));
        }
        if !self.extra_fields.is_empty() {
            query.push(("fields", self.extra_fields.join(",")));
        }
        query
    }

    async fn fetch(&self, target: LookupTarget) -> Result<RawRecord> {
        let url = format!("{}/ipgeo", self.base_url);
        tracing::debug!(provider = self.flow.name(), %target, "Querying ipgeolocation.io");

        let body = self
            .http
            .get_json(&url, &self.query(target), Auth::None)
            .await?;
        transform(self.flow.name(), &body)
    }
}

fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Invalid API key - please check your ipgeolocation.io API key".to_string(),
        403 => "Access forbidden - verify your API key permissions or subscription status"
            .to_string(),
        423 => "Request quota exceeded - upgrade your plan".to_string(),
        429 => "Rate limit exceeded - too many requests".to_string(),
        500..=599 => format!("IPGeolocation API server error ({})", status.as_u16()),
        code => format!("API returned HTTP error: {}", code),
    }
}

/// Translate an ipgeolocation.io body into canonical fields
pub(crate) fn transform(provider: &str, body: &Value) -> Result<RawRecord> {
    if let Some(message) = fields::text(body, "message") {
        if message.to_lowercase().contains("error") {
            return Err(Error::provider(
                provider,
                format!("IPGeolocation API error: {}", message),
            ));
        }
    }

    let location = fields::object(body, "location").unwrap_or(body);
    let time_zone = fields::object(body, "time_zone");
    let currency = fields::object(body, "currency");
    let security = fields::object(body, "security");
    let device = fields::object(body, "device");

    let country_code = fields::text(location, "country_code2");

    RawBuilder::new()
        .put("ip", fields::text(body, "ip"))
        .put("city", fields::text(location, "city"))
        .put("region", fields::text(location, "state_prov"))
        .put("country", country_code.clone())
        .put("countryCode", country_code)
        .put("latitude", fields::float(location, "latitude"))
        .put("longitude", fields::float(location, "longitude"))
        .put("timezone", time_zone.and_then(|tz| fields::text(tz, "name")))
        .put("timezoneOffset", time_zone.and_then(|tz| fields::float(tz, "offset")))
        .put("currency", currency.and_then(|c| fields::text(c, "name")))
        .put("currencyCode", currency.and_then(|c| fields::text(c, "code")))
        .put("currencySymbol", currency.and_then(|c| fields::text(c, "symbol")))
        .put("continent", fields::text(location, "continent_name"))
        .put("continentCode", fields::text(location, "continent_code"))
        .put("postalCode", fields::text(location, "zipcode"))
        .put(
            "organization",
            fields::text(body, "isp").or_else(|| fields::text(body, "organization")),
        )
        .put("isp", fields::text(body, "isp"))
        .put(
            "asn",
            fields::text(body, "asn")
                .as_deref()
                .and_then(fields::normalize_asn),
        )
        .put("asnName", fields::text(body, "organization"))
        .put("connectionType", fields::text(body, "connection_type"))
        .put("isMobile", device.and_then(|d| fields::flag(d, "is_mobile")))
        .put("isProxy", security.and_then(|s| fields::flag(s, "is_proxy")))
        .put("isCrawler", security.and_then(|s| fields::flag(s, "is_crawler")))
        .put("isTor", security.and_then(|s| fields::flag(s, "is_tor")))
        .put("hostname", fields::text(body, "hostname"))
        .finish(provider)
}

#[async_trait]
impl GeoProvider for IpGeolocationProvider {
    async fn lookup(&self, ip: Option<&str>) -> Result<GeolocationDetails> {
        self.flow.run(ip, |target| self.fetch(target)).await
    }

    fn provider_name(&self) -> &str {
        self.flow.name()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Ipgeolocation
    }
}

impl std::fmt::Debug for IpGeolocationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpGeolocationProvider")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("extra_fields", &self.extra_fields)
            .field("flow", &self.flow)
            .finish()
    }
}

/// Factory for ipgeolocation.io adapters
pub struct IpGeolocationFactory;

impl ProviderFactory for IpGeolocationFactory {
    fn create(&self, context: &ProviderContext) -> Result<Box<dyn GeoProvider>> {
        Ok(Box::new(IpGeolocationProvider::new(context)?))
    }
}
