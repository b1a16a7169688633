// # Canonical Record
//
// `GeolocationDetails` is the one shape every backend is normalized into.
//
// ## Construction
//
// Records are built from a `RawRecord`, a JSON object keyed by canonical
// camelCase names. Construction never fails:
// - unknown keys are ignored
// - missing keys leave the field absent
// - malformed values (e.g. a broken `"lat,lon"` string) drop just that field
//
// A raw `country` is always read as a country *code*. It is captured as
// `countryCode` (unless an explicit `countryCode` is present) and expanded
// to a display name through `CountryNames`, falling back to the built-in
// table. `timezoneOffset` is taken from the raw map when present and
// derived from `timezone` otherwise.
//
// ## Round trip
//
// `from_raw(r).to_raw()` fed back through `from_raw` yields an equal record.

use crate::countries::{self, CountryNames};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::net::IpAddr;

/// Provider-agnostic map keyed by canonical field names
pub type RawRecord = Map<String, Value>;

/// Default width for `country_flag_url`
pub const DEFAULT_FLAG_WIDTH: u32 = 320;

/// Normalized location and network profile of one IP address
///
/// Immutable once built; all access goes through accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeolocationDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    isp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    asn_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connection_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    continent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    continent_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_mobile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_proxy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_crawler: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_tor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
}

impl GeolocationDetails {
    /// Build a record using the built-in country table
    pub fn from_raw(raw: &RawRecord) -> Self {
        Self::from_raw_localized(raw, None)
    }

    /// Build a record, expanding country codes through `names`
    pub fn from_raw_localized(raw: &RawRecord, names: Option<&dyn CountryNames>) -> Self {
        let country_code = text(raw, "countryCode").or_else(|| text(raw, "country"));
        let country = text(raw, "country")
            .or_else(|| country_code.clone())
            .map(|code| countries::display_name(&code, names));

        let (mut latitude, mut longitude) = (number(raw, "latitude"), number(raw, "longitude"));
        if latitude.is_none() || longitude.is_none() {
            if let Some((lat, lon)) = text(raw, "loc").as_deref().and_then(parse_coordinates) {
                latitude = Some(lat);
                longitude = Some(lon);
            }
        }

        let timezone = text(raw, "timezone");
        let timezone_offset = number(raw, "timezoneOffset").or_else(|| {
            timezone
                .as_deref()
                .and_then(crate::timezone::current_offset_hours)
        });

        Self {
            ip: text(raw, "ip"),
            city: text(raw, "city"),
            region: text(raw, "region"),
            country,
            country_code,
            latitude,
            longitude,
            timezone,
            timezone_offset,
            postal_code: text(raw, "postalCode"),
            organization: text(raw, "organization").or_else(|| text(raw, "org")),
            isp: text(raw, "isp"),
            asn: text(raw, "asn"),
            asn_name: text(raw, "asnName"),
            connection_type: text(raw, "connectionType"),
            currency: text(raw, "currency"),
            currency_code: text(raw, "currencyCode"),
            currency_symbol: text(raw, "currencySymbol"),
            continent: text(raw, "continent"),
            continent_code: text(raw, "continentCode"),
            is_mobile: flag(raw, "isMobile"),
            is_proxy: flag(raw, "isProxy"),
            is_crawler: flag(raw, "isCrawler"),
            is_tor: flag(raw, "isTor"),
            hostname: text(raw, "hostname"),
        }
    }

    /// Serialize back to a raw map (absent fields omitted)
    pub fn to_raw(&self) -> RawRecord {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => RawRecord::new(),
        }
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Country display name
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// ISO 3166-1 alpha-2 code
    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    /// IANA timezone id
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// UTC offset in fractional hours
    pub fn timezone_offset(&self) -> Option<f64> {
        self.timezone_offset
    }

    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code.as_deref()
    }

    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    pub fn isp(&self) -> Option<&str> {
        self.isp.as_deref()
    }

    /// Autonomous system number, `"AS<digits>"`
    pub fn asn(&self) -> Option<&str> {
        self.asn.as_deref()
    }

    pub fn asn_name(&self) -> Option<&str> {
        self.asn_name.as_deref()
    }

    pub fn connection_type(&self) -> Option<&str> {
        self.connection_type.as_deref()
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn currency_code(&self) -> Option<&str> {
        self.currency_code.as_deref()
    }

    pub fn currency_symbol(&self) -> Option<&str> {
        self.currency_symbol.as_deref()
    }

    pub fn continent(&self) -> Option<&str> {
        self.continent.as_deref()
    }

    pub fn continent_code(&self) -> Option<&str> {
        self.continent_code.as_deref()
    }

    pub fn is_mobile(&self) -> Option<bool> {
        self.is_mobile
    }

    pub fn is_proxy(&self) -> Option<bool> {
        self.is_proxy
    }

    pub fn is_crawler(&self) -> Option<bool> {
        self.is_crawler
    }

    pub fn is_tor(&self) -> Option<bool> {
        self.is_tor
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// True when ip, country code and both coordinates are present
    pub fn is_valid(&self) -> bool {
        self.ip().is_some()
            && self.country_code().is_some()
            && self.latitude.is_some()
            && self.longitude.is_some()
    }

    pub fn has_timezone(&self) -> bool {
        self.timezone.is_some()
    }

    /// Current wall-clock time in the record's timezone
    pub fn current_time(&self) -> Option<DateTime<Tz>> {
        self.convert_to_local_time(Utc::now())
    }

    /// Convert a UTC instant into the record's timezone
    pub fn convert_to_local_time(&self, instant: DateTime<Utc>) -> Option<DateTime<Tz>> {
        let zone = crate::timezone::parse_zone(self.timezone.as_deref()?)?;
        Some(instant.with_timezone(&zone))
    }

    fn parsed_ip(&self) -> Option<IpAddr> {
        self.ip.as_deref()?.parse().ok()
    }

    pub fn is_ipv4(&self) -> bool {
        self.parsed_ip().is_some_and(|ip| ip.is_ipv4())
    }

    pub fn is_ipv6(&self) -> bool {
        self.parsed_ip().is_some_and(|ip| ip.is_ipv6())
    }

    /// "City, Region, Country"
    pub fn formatted_address(&self) -> String {
        join_parts(&[&self.city, &self.region, &self.country])
    }

    /// "City, CC"
    pub fn short_address(&self) -> String {
        join_parts(&[&self.city, &self.country_code])
    }

    /// "City, Region, Postal, CC"
    pub fn full_address(&self) -> String {
        join_parts(&[
            &self.city,
            &self.region,
            &self.postal_code,
            &self.country_code,
        ])
    }

    fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    pub fn google_maps_link(&self) -> Option<String> {
        let (lat, lon) = self.coordinates()?;
        Some(format!("https://maps.google.com/?q={},{}", lat, lon))
    }

    pub fn openstreetmap_link(&self) -> Option<String> {
        let (lat, lon) = self.coordinates()?;
        Some(format!(
            "https://www.openstreetmap.org/?mlat={}&mlon={}#map=12/{}/{}",
            lat, lon, lat, lon
        ))
    }

    pub fn apple_maps_link(&self) -> Option<String> {
        let (lat, lon) = self.coordinates()?;
        Some(format!("maps://maps.apple.com/?q={},{}", lat, lon))
    }

    /// Regional-indicator flag emoji for the country code
    pub fn country_flag(&self) -> Option<String> {
        let code = self.country_code.as_deref()?;
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        code.to_ascii_uppercase()
            .chars()
            .map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
            .collect()
    }

    /// flagcdn.com PNG for the country code
    pub fn country_flag_url(&self, width: Option<u32>) -> Option<String> {
        let code = self.country_code.as_deref()?;
        Some(format!(
            "https://flagcdn.com/w{}/{}.png",
            width.unwrap_or(DEFAULT_FLAG_WIDTH),
            code.to_ascii_lowercase()
        ))
    }
}

impl fmt::Display for GeolocationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = self.formatted_address();
        if address.is_empty() {
            f.write_str(self.ip().unwrap_or_default())
        } else {
            f.write_str(&address)
        }
    }
}

impl From<&RawRecord> for GeolocationDetails {
    fn from(raw: &RawRecord) -> Self {
        Self::from_raw(raw)
    }
}

fn join_parts(parts: &[&Option<String>]) -> String {
    parts
        .iter()
        .filter_map(|part| part.as_deref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a `"lat,lon"` string; anything malformed yields `None`
pub fn parse_coordinates(value: &str) -> Option<(f64, f64)> {
    let (lat, lon) = value.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

// Non-empty string; numbers are stringified
fn text(raw: &RawRecord, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Finite number; numeric strings are accepted
fn number(raw: &RawRecord, key: &str) -> Option<f64> {
    let value = match raw.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn flag(raw: &RawRecord, key: &str) -> Option<bool> {
    match raw.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
