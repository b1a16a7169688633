// # ipstack.com Adapter
//
// ## API Reference
//
// - Lookup: GET `{base}/{ip}?access_key=..`
// - Self:   GET `{base}/check?access_key=..`
//
// Errors may arrive with HTTP 200 as
// `{"success": false, "error": {"code": .., "type": .., "info": ..}}`.
// `time_zone.gmt_offset` is in seconds; `connection.asn` is numeric.

use async_trait::async_trait;
use geolocate_core::config::BackendKind;
use geolocate_core::traits::{GeoProvider, LookupFlow, ProviderContext, ProviderFactory};
use geolocate_core::{Error, GeolocationDetails, LookupTarget, RawRecord, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::fields::{self, RawBuilder};
use crate::transport::{Auth, HttpTransport};

/// ipstack.com API base URL
pub const IPSTACK_BASE_URL: &str = "http://api.ipstack.com";

/// Embedded error object
#[derive(Debug, Deserialize)]
struct IpStackError {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    info: Option<String>,
}

/// ipstack.com lookup adapter
pub struct IpStackProvider {
    /// ⚠️ NEVER log this value
    access_key: String,
    base_url: String,
    flow: LookupFlow,
    http: HttpTransport,
}

impl IpStackProvider {
    /// Build from context; `access_key` is required
    pub fn new(context: &ProviderContext) -> Result<Self> {
        let access_key = context.require_secret("access_key")?;
        Ok(Self {
            access_key,
            base_url: context.base_url(IPSTACK_BASE_URL),
            flow: context.lookup_flow(),
            http: HttpTransport::new(&context.name, "IPStack", context.timeout, status_message)?,
        })
    }

    fn endpoint(&self, target: LookupTarget) -> String {
        match target {
            LookupTarget::Address(ip) => format!("{}/{}", self.base_url, ip),
            LookupTarget::Current => format!("{}/check", self.base_url),
        }
    }

    async fn fetch(&self, target: LookupTarget) -> Result<RawRecord> {
        let url = self.endpoint(target);
        tracing::debug!(provider = self.flow.name(), %target, "Querying ipstack.com");

        let body = self
            .http
            .get_json(&url, &[("access_key", self.access_key.clone())], Auth::None)
            .await?;
        transform(self.flow.name(), &body)
    }
}

fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Invalid API key - please check your ipstack access key".to_string(),
        403 => "Access forbidden - verify your API key permissions".to_string(),
        429 => "Rate limit exceeded - too many requests".to_string(),
        500..=599 => format!("IPStack API server error ({})", status.as_u16()),
        code => format!("API returned HTTP error: {}", code),
    }
}

fn embedded_error(provider: &str, body: &Value) -> Option<Error> {
    let failed = body.get("success").and_then(Value::as_bool) == Some(false);
    let error = body.get("error").filter(|e| e.is_object());
    if !failed && error.is_none() {
        return None;
    }

    let detail = error
        .and_then(|e| IpStackError::deserialize(e).ok())
        .unwrap_or(IpStackError {
            code: None,
            kind: None,
            info: None,
        });
    let code = match detail.code {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s,
        _ => "unknown".to_string(),
    };

    Some(Error::provider(
        provider,
        format!(
            "IPStack API error [{}] {}: {}",
            code,
            detail.kind.as_deref().unwrap_or("unknown_error"),
            detail.info.as_deref().unwrap_or("Unknown error occurred"),
        ),
    ))
}

/// Translate an ipstack.com body into canonical fields
pub(crate) fn transform(provider: &str, body: &Value) -> Result<RawRecord> {
    if let Some(error) = embedded_error(provider, body) {
        return Err(error);
    }

    let time_zone = fields::object(body, "time_zone");
    let currency = fields::object(body, "currency");
    let connection = fields::object(body, "connection");
    let security = fields::object(body, "security");

    let country_code = fields::text(body, "country_code");

    RawBuilder::new()
        .put("ip", fields::text(body, "ip"))
        .put("city", fields::text(body, "city"))
        .put("region", fields::text(body, "region_name"))
        .put("country", country_code.clone())
        .put("countryCode", country_code)
        .put("latitude", fields::float(body, "latitude"))
        .put("longitude", fields::float(body, "longitude"))
        .put("timezone", time_zone.and_then(|tz| fields::text(tz, "id")))
        .put(
            "timezoneOffset",
            time_zone
                .and_then(|tz| fields::float(tz, "gmt_offset"))
                .map(|seconds| seconds / 3600.0),
        )
        .put("currency", currency.and_then(|c| fields::text(c, "name")))
        .put("currencyCode", currency.and_then(|c| fields::text(c, "code")))
        .put("currencySymbol", currency.and_then(|c| fields::text(c, "symbol")))
        .put("continent", fields::text(body, "continent_name"))
        .put("continentCode", fields::text(body, "continent_code"))
        .put("postalCode", fields::text(body, "zip"))
        .put("isp", connection.and_then(|c| fields::text(c, "isp")))
        .put(
            "asn",
            connection
                .and_then(|c| fields::text(c, "asn"))
                .as_deref()
                .and_then(fields::normalize_asn),
        )
        .put("asnName", connection.and_then(|c| fields::text(c, "asn_org")))
        .put("connectionType", fields::text(body, "connection_type"))
        .put("isProxy", security.and_then(|s| fields::flag(s, "is_proxy")))
        .put("isCrawler", security.and_then(|s| fields::flag(s, "is_crawler")))
        .put("isTor", security.and_then(|s| fields::flag(s, "is_tor")))
        .finish(provider)
}

#[async_trait]
impl GeoProvider for IpStackProvider {
    async fn lookup(&self, ip: Option<&str>) -> Result<GeolocationDetails> {
        self.flow.run(ip, |target| self.fetch(target)).await
    }

    fn provider_name(&self) -> &str {
        self.flow.name()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Ipstack
    }
}

impl std::fmt::Debug for IpStackProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpStackProvider")
            .field("access_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("flow", &self.flow)
            .finish()
    }
}

/// Factory for ipstack.com adapters
pub struct IpStackFactory;

impl ProviderFactory for IpStackFactory {
    fn create(&self, context: &ProviderContext) -> Result<Box<dyn GeoProvider>> {
        Ok(Box::new(IpStackProvider::new(context)?))
    }
}
