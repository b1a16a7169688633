// # ipinfo.io Adapter
//
// ## API Reference
//
// - Lookup: GET `{base}/{ip}/json`
// - Self:   GET `{base}/json`
// - Auth:   `Authorization: Bearer <token>`
//
// ## Mapping
//
// - `country` is the ISO code
// - `loc` is a combined `"lat,lon"` string
// - the ASN is embedded in `org` ("AS15169 Google LLC")
// - the timezone offset is derived from `timezone`

use async_trait::async_trait;
use geolocate_core::config::BackendKind;
use geolocate_core::traits::{GeoProvider, LookupFlow, ProviderContext, ProviderFactory};
use geolocate_core::{GeolocationDetails, LookupTarget, RawRecord, Result};
use reqwest::StatusCode;
use serde_json::Value;

use crate::fields::{self, RawBuilder};
use crate::transport::{Auth, HttpTransport};

/// ipinfo.io API base URL
pub const IPINFO_BASE_URL: &str = "https://ipinfo.io";

/// ipinfo.io lookup adapter
pub struct IpInfoProvider {
    /// ⚠️ NEVER log this value
    access_token: String,
    base_url: String,
    flow: LookupFlow,
    http: HttpTransport,
}

impl IpInfoProvider {
    /// Build from context; `access_token` is required
    pub fn new(context: &ProviderContext) -> Result<Self> {
        let access_token = context.require_secret("access_token")?;
        Ok(Self {
            access_token,
            base_url: context.base_url(IPINFO_BASE_URL),
            flow: context.lookup_flow(),
            http: HttpTransport::new(&context.name, "IpInfo", context.timeout, status_message)?,
        })
    }

    fn endpoint(&self, target: LookupTarget) -> String {
        match target {
            LookupTarget::Address(ip) => format!("{}/{}/json", self.base_url, ip),
            LookupTarget::Current => format!("{}/json", self.base_url),
        }
    }

    async fn fetch(&self, target: LookupTarget) -> Result<RawRecord> {
        let url = self.endpoint(target);
        tracing::debug!(provider = self.flow.name(), %target, "Querying ipinfo.io");

        let body = self
            .http
            .get_json(&url, &[], Auth::Bearer(&self.access_token))
            .await?;
        transform(self.flow.name(), &body)
    }
}

fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Invalid API key - please check your ipinfo access token".to_string(),
        403 => "Access forbidden - verify your API key permissions".to_string(),
        429 => "Rate limit exceeded - too many requests".to_string(),
        500..=599 => format!("IpInfo API server error ({})", status.as_u16()),
        code => format!("API returned HTTP error: {}", code),
    }
}

/// Translate an ipinfo.io body into canonical fields
pub(crate) fn transform(provider: &str, body: &Value) -> Result<RawRecord> {
    let (latitude, longitude) = match fields::text(body, "loc")
        .as_deref()
        .and_then(geolocate_core::record::parse_coordinates)
    {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => (None, None),
    };

    let org = fields::text(body, "org");
    let (asn, asn_name) = match org.as_deref().and_then(fields::split_org_asn) {
        Some((asn, name)) => (Some(asn), name),
        None => (None, None),
    };

    let country = fields::text(body, "country");

    RawBuilder::new()
        .put("ip", fields::text(body, "ip"))
        .put("city", fields::text(body, "city"))
        .put("region", fields::text(body, "region"))
        .put("country", country.clone())
        .put("countryCode", country)
        .put("latitude", latitude)
        .put("longitude", longitude)
        .put("timezone", fields::text(body, "timezone"))
        .put("postalCode", fields::text(body, "postal"))
        .put("organization", org)
        .put("asn", asn)
        .put("asnName", asn_name)
        .put("hostname", fields::text(body, "hostname"))
        .finish(provider)
}

#[async_trait]
impl GeoProvider for IpInfoProvider {
    async fn lookup(&self, ip: Option<&str>) -> Result<GeolocationDetails> {
        self.flow.run(ip, |target| self.fetch(target)).await
    }

    fn provider_name(&self) -> &str {
        self.flow.name()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Ipinfo
    }
}

impl std::fmt::Debug for IpInfoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpInfoProvider")
            .field("access_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("flow", &self.flow)
            .finish()
    }
}

/// Factory for ipinfo.io adapters
pub struct IpInfoFactory;

impl ProviderFactory for IpInfoFactory {
    fn create(&self, context: &ProviderContext) -> Result<Box<dyn GeoProvider>> {
        Ok(Box::new(IpInfoProvider::new(context)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolocate_core::Error;
    use geolocate_core::config::ProviderSettings;
    use serde_json::json;

    fn context(token: Option<&str>) -> ProviderContext {
        let mut settings = ProviderSettings::new(BackendKind::Ipinfo);
        if let Some(token) = token {
            settings = settings.access_token(token);
        }
        ProviderContext::new("ipinfo", settings)
    }

    #[test]
    fn test_factory_requires_token() {
        assert!(IpInfoFactory.create(&context(Some("tok"))).is_ok());
        assert!(matches!(
            IpInfoFactory.create(&context(None)),
            Err(Error::MissingCredential { .. })
        ));
        assert!(matches!(
            IpInfoFactory.create(&context(Some("   "))),
            Err(Error::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_endpoints() {
        let provider = IpInfoProvider::new(&context(Some("tok"))).unwrap();
        assert_eq!(
            provider.endpoint(LookupTarget::Address("8.8.8.8".parse().unwrap())),
            "https://ipinfo.io/8.8.8.8/json"
        );
        assert_eq!(provider.endpoint(LookupTarget::Current), "https://ipinfo.io/json");
    }

    #[test]
    fn test_transform_maps_loc_and_org() {
        let body = json!({
            "ip": "8.8.8.8",
            "hostname": "dns.google",
            "city": "Mountain View",
            "region": "California",
            "country": "US",
            "loc": "37.4056,-122.0775",
            "org": "AS15169 Google LLC",
            "postal": "94043",
            "timezone": "America/Los_Angeles"
        });

        let raw = transform("ipinfo", &body).unwrap();
        let details = GeolocationDetails::from_raw(&raw);

        assert_eq!(details.country_code(), Some("US"));
        assert_eq!(details.country(), Some("United States"));
        assert_eq!(details.latitude(), Some(37.4056));
        assert_eq!(details.longitude(), Some(-122.0775));
        assert_eq!(details.asn(), Some("AS15169"));
        assert_eq!(details.asn_name(), Some("Google LLC"));
        assert_eq!(details.organization(), Some("AS15169 Google LLC"));
        assert_eq!(details.postal_code(), Some("94043"));
        assert_eq!(details.hostname(), Some("dns.google"));
        assert!(details.timezone_offset().is_some());
    }

    #[test]
    fn test_transform_tolerates_bad_loc() {
        let body = json!({"ip": "1.1.1.1", "country": "AU", "loc": "garbage", "org": "Cloudflare"});

        let details = GeolocationDetails::from_raw(&transform("ipinfo", &body).unwrap());

        assert_eq!(details.latitude(), None);
        assert_eq!(details.asn(), None);
        assert_eq!(details.organization(), Some("Cloudflare"));
    }

    #[test]
    fn test_transform_bare_asn_has_no_name() {
        let body = json!({"ip": "8.8.8.8", "country": "US", "org": "AS15169"});

        let raw = transform("ipinfo", &body).unwrap();

        assert_eq!(raw.get("asn"), Some(&json!("AS15169")));
        assert!(!raw.contains_key("asnName"));
        assert_eq!(raw.get("organization"), Some(&json!("AS15169")));
    }

    #[test]
    fn test_transform_requires_country() {
        let body = json!({"ip": "10.0.0.1", "bogon": true});
        match transform("ipinfo", &body) {
            Err(Error::IncompleteData { missing, .. }) => {
                assert_eq!(missing, vec!["countryCode".to_string()])
            }
            other => panic!("expected IncompleteData, got {:?}", other),
        }
    }

    #[test]
    fn test_token_not_in_debug() {
        let provider = IpInfoProvider::new(&context(Some("secret_token_12345"))).unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("secret_token_12345"));
        assert!(debug.contains("IpInfoProvider"));
    }
}
