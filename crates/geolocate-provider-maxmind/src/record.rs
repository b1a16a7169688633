//! GeoIP2 record shape and its canonical mapping
//!
//! The struct covers the City, Country, ISP, ASN and Anonymous-IP
//! database layouts. Every field is optional so any of those files
//! decodes; fields a database does not carry stay absent.

use geolocate_core::RawRecord;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::IpAddr;

const FALLBACK_LOCALE: &str = "en";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GeoRecord {
    pub city: Option<Place>,
    pub continent: Option<Place>,
    pub country: Option<Place>,
    pub registered_country: Option<Place>,
    pub subdivisions: Vec<Place>,
    pub location: Option<Location>,
    pub postal: Option<Postal>,
    pub traits: Option<Traits>,

    // ASN and Anonymous-IP databases keep these at the top level
    pub autonomous_system_number: Option<u32>,
    pub autonomous_system_organization: Option<String>,
    pub is_tor_exit_node: Option<bool>,
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Place {
    pub code: Option<String>,
    pub iso_code: Option<String>,
    pub names: BTreeMap<String, String>,
}

impl Place {
    fn name(&self, locale: &str) -> Option<String> {
        self.names
            .get(locale)
            .or_else(|| self.names.get(FALLBACK_LOCALE))
            .cloned()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Postal {
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Traits {
    pub autonomous_system_number: Option<u32>,
    pub autonomous_system_organization: Option<String>,
    pub isp: Option<String>,
    pub organization: Option<String>,
    pub connection_type: Option<String>,
    pub is_anonymous_proxy: Option<bool>,
    pub is_tor_exit_node: Option<bool>,
}

fn put<T: Into<Value>>(raw: &mut RawRecord, key: &str, value: Option<T>) {
    if let Some(value) = value {
        raw.insert(key.to_string(), value.into());
    }
}

impl GeoRecord {
    /// Canonical fields for `ip`, names in `locale` (falling back to English)
    ///
    /// The country code falls back to the registered country for anycast
    /// and satellite ranges that carry no physical country.
    pub(crate) fn into_raw(self, ip: IpAddr, locale: &str) -> RawRecord {
        let traits = self.traits.unwrap_or_default();
        let location = self.location.unwrap_or_default();

        let country_code = self
            .country
            .as_ref()
            .and_then(|c| c.iso_code.clone())
            .or_else(|| self.registered_country.as_ref().and_then(|c| c.iso_code.clone()));

        let asn = traits
            .autonomous_system_number
            .or(self.autonomous_system_number)
            .map(|n| format!("AS{}", n));
        let asn_name = traits
            .autonomous_system_organization
            .or(self.autonomous_system_organization);

        let mut raw = RawRecord::new();
        put(&mut raw, "ip", Some(ip.to_string()));
        put(&mut raw, "city", self.city.as_ref().and_then(|c| c.name(locale)));
        // Most specific subdivision is last
        put(&mut raw, "region", self.subdivisions.last().and_then(|s| s.name(locale)));
        put(&mut raw, "country", country_code.clone());
        put(&mut raw, "countryCode", country_code);
        put(&mut raw, "latitude", location.latitude);
        put(&mut raw, "longitude", location.longitude);
        put(&mut raw, "timezone", location.time_zone);
        put(&mut raw, "postalCode", self.postal.and_then(|p| p.code));
        put(&mut raw, "continent", self.continent.as_ref().and_then(|c| c.name(locale)));
        put(&mut raw, "continentCode", self.continent.and_then(|c| c.code));
        put(&mut raw, "organization", traits.organization);
        put(&mut raw, "isp", traits.isp);
        put(&mut raw, "asn", asn);
        put(&mut raw, "asnName", asn_name);
        put(&mut raw, "connectionType", traits.connection_type);
        put(
            &mut raw,
            "isProxy",
            traits.is_anonymous_proxy.or(self.is_anonymous),
        );
        put(&mut raw, "isTor", traits.is_tor_exit_node.or(self.is_tor_exit_node));
        raw
    }
}
