// # ipapi.co Adapter
//
// ## API Reference
//
// - Lookup: GET `{base}/{ip}/json/`
// - Self:   GET `{base}/json/`
// - Auth:   optional `key` query parameter (the free tier is keyless)
//
// A 200 response may still carry `{"error": true, "reason": ".."}`.
//
// `utc_offset` arrives as "+0530" and is converted to fractional hours.

use async_trait::async_trait;
use geolocate_core::config::BackendKind;
use geolocate_core::traits::{GeoProvider, LookupFlow, ProviderContext, ProviderFactory};
use geolocate_core::{Error, GeolocationDetails, LookupTarget, RawRecord, Result};
use reqwest::StatusCode;
use serde_json::Value;

use crate::fields::{self, RawBuilder};
use crate::transport::{Auth, HttpTransport};

/// ipapi.co API base URL
pub const IPAPI_BASE_URL: &str = "https://ipapi.co";

/// ipapi.co lookup adapter
pub struct IpApiProvider {
    api_key: Option<String>,
    base_url: String,
    flow: LookupFlow,
    http: HttpTransport,
}

impl IpApiProvider {
    /// Build from context; `api_key` is optional
    pub fn new(context: &ProviderContext) -> Result<Self> {
        Ok(Self {
            api_key: context.optional_secret("api_key"),
            base_url: context.base_url(IPAPI_BASE_URL),
            flow: context.lookup_flow(),
            http: HttpTransport::new(&context.name, "ipapi.co", context.timeout, status_message)?,
        })
    }

    fn endpoint(&self, target: LookupTarget) -> String {
        match target {
            LookupTarget::Address(ip) => format!("{}/{}/json/", self.base_url, ip),
            LookupTarget::Current => format!("{}/json/", self.base_url),
        }
    }

    async fn fetch(&self, target: LookupTarget) -> Result<RawRecord> {
        let url = self.endpoint(target);
        let query: Vec<(&str, String)> = self
            .api_key
            .iter()
            .map(|key| ("key", key.clone()))
            .collect();

        tracing::debug!(provider = self.flow.name(), %target, keyed = self.api_key.is_some(), "Querying ipapi.co");

        let body = self.http.get_json(&url, &query, Auth::None).await?;
        transform(self.flow.name(), &body)
    }
}

fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "Bad Request - Invalid IP address format".to_string(),
        401 => "Invalid API key - please check your ipapi.co key".to_string(),
        403 => "Authentication Failed - Rate limit exceeded".to_string(),
        404 => "URL Not Found - Invalid endpoint".to_string(),
        405 => "Method Not Allowed".to_string(),
        429 => "Quota exceeded - Too many requests (rate limit)".to_string(),
        500..=599 => format!("ipapi.co server error ({})", status.as_u16()),
        code => format!("API returned HTTP error: {}", code),
    }
}

/// Translate an ipapi.co body into canonical fields
pub(crate) fn transform(provider: &str, body: &Value) -> Result<RawRecord> {
    if body.get("error").and_then(Value::as_bool) == Some(true) {
        let reason = fields::text(body, "reason").unwrap_or_else(|| "Unknown error".to_string());
        return Err(Error::provider(provider, format!("ipapi.co API error: {}", reason)));
    }

    let country_code = fields::text(body, "country_code").or_else(|| fields::text(body, "country"));
    let org = fields::text(body, "org");

    RawBuilder::new()
        .put("ip", fields::text(body, "ip"))
        .put("city", fields::text(body, "city"))
        .put("region", fields::text(body, "region"))
        .put("country", country_code.clone())
        .put("countryCode", country_code)
        .put("latitude", fields::float(body, "latitude"))
        .put("longitude", fields::float(body, "longitude"))
        .put("timezone", fields::text(body, "timezone"))
        .put(
            "timezoneOffset",
            fields::text(body, "utc_offset")
                .as_deref()
                .and_then(fields::offset_hours),
        )
        .put("currency", fields::text(body, "currency_name"))
        .put("currencyCode", fields::text(body, "currency"))
        .put("continentCode", fields::text(body, "continent_code"))
        .put("postalCode", fields::text(body, "postal"))
        .put("organization", org.clone())
        .put("isp", org.clone())
        .put(
            "asn",
            fields::text(body, "asn")
                .as_deref()
                .and_then(fields::normalize_asn),
        )
        .put("asnName", org)
        .finish(provider)
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    async fn lookup(&self, ip: Option<&str>) -> Result<GeolocationDetails> {
        self.flow.run(ip, |target| self.fetch(target)).await
    }

    fn provider_name(&self) -> &str {
        self.flow.name()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Ipapi
    }
}

impl std::fmt::Debug for IpApiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpApiProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("base_url", &self.base_url)
            .field("flow", &self.flow)
            .finish()
    }
}

/// Factory for ipapi.co adapters
pub struct IpApiFactory;

impl ProviderFactory for IpApiFactory {
    fn create(&self, context: &ProviderContext) -> Result<Box<dyn GeoProvider>> {
        Ok(Box::new(IpApiProvider::new(context)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolocate_core::config::ProviderSettings;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "ip": "49.36.0.1",
            "city": "Mumbai",
            "region": "Maharashtra",
            "country": "IN",
            "country_name": "India",
            "country_code": "IN",
            "continent_code": "AS",
            "postal": "400070",
            "latitude": 19.0748,
            "longitude": 72.8856,
            "timezone": "Asia/Kolkata",
            "utc_offset": "+0530",
            "currency": "INR",
            "currency_name": "Rupee",
            "asn": "AS55836",
            "org": "Reliance Jio Infocomm Limited"
        })
    }

    #[test]
    fn test_factory_is_keyless() {
        let context = ProviderContext::new("ipapi", ProviderSettings::new(BackendKind::Ipapi));
        assert!(IpApiFactory.create(&context).is_ok());
    }

    #[test]
    fn test_endpoints_have_trailing_slash() {
        let context = ProviderContext::new("ipapi", ProviderSettings::new(BackendKind::Ipapi));
        let provider = IpApiProvider::new(&context).unwrap();
        assert_eq!(
            provider.endpoint(LookupTarget::Address("1.1.1.1".parse().unwrap())),
            "https://ipapi.co/1.1.1.1/json/"
        );
        assert_eq!(provider.endpoint(LookupTarget::Current), "https://ipapi.co/json/");
    }

    #[test]
    fn test_transform_offset_in_hours() {
        let details = GeolocationDetails::from_raw(&transform("ipapi", &sample()).unwrap());

        assert_eq!(details.timezone_offset(), Some(5.5));
        assert_eq!(details.country_code(), Some("IN"));
        assert_eq!(details.country(), Some("India"));
        assert_eq!(details.currency_code(), Some("INR"));
        assert_eq!(details.currency(), Some("Rupee"));
        assert_eq!(details.continent_code(), Some("AS"));
        assert_eq!(details.asn(), Some("AS55836"));
        assert_eq!(details.isp(), Some("Reliance Jio Infocomm Limited"));
    }

    #[test]
    fn test_transform_bare_asn_gains_prefix() {
        let mut body = sample();
        body["asn"] = json!(55836);
        let details = GeolocationDetails::from_raw(&transform("ipapi", &body).unwrap());
        assert_eq!(details.asn(), Some("AS55836"));
    }

    #[test]
    fn test_embedded_error() {
        let body = json!({"ip": "127.0.0.1", "error": true, "reason": "Reserved IP Address", "reserved": true});
        match transform("ipapi", &body) {
            Err(Error::Provider { message, .. }) => {
                assert_eq!(message, "ipapi.co API error: Reserved IP Address")
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_key_not_in_debug() {
        let context = ProviderContext::new(
            "ipapi",
            ProviderSettings::new(BackendKind::Ipapi).api_key("secret_key_987"),
        );
        let debug = format!("{:?}", IpApiProvider::new(&context).unwrap());
        assert!(!debug.contains("secret_key_987"));
    }
}
