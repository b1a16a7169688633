//! Fixtures shared by the cross-provider tests

#![allow(dead_code)]

use geolocate::GeolocationConfig;
use geolocate::env::config_from_vars;
use serde_json::{Value, json};
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Environment-style configuration with every remote backend aimed at `server`
pub fn mock_config(server: &MockServer, pairs: &[(&str, &str)]) -> GeolocationConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("GEOLOCATION_IPINFO_ACCESS_TOKEN".to_string(), "tok".to_string()),
        ("GEOLOCATION_IPGEOLOCATION_API_KEY".to_string(), "geo".to_string()),
        ("GEOLOCATION_IPSTACK_ACCESS_KEY".to_string(), "stack".to_string()),
    ]);
    for (key, value) in pairs {
        vars.insert(key.to_string(), value.to_string());
    }

    let mut config = config_from_vars(|key| vars.get(key).cloned()).unwrap();
    for name in ["ipinfo", "ipapi", "ipgeolocation", "ipstack"] {
        if let Some(settings) = config.providers.get_mut(name) {
            settings.base_url = Some(server.uri());
        }
    }
    config
}

/// Mount one 200 response per remote backend for Google DNS
///
/// Each mock expects `expected` calls.
pub async fn mount_google_dns(server: &MockServer, expected: u64) {
    let routes: [(&str, Value); 4] = [
        ("/8.8.8.8/json", ipinfo_body()),
        ("/8.8.8.8/json/", ipapi_body()),
        ("/ipgeo", ipgeolocation_body()),
        ("/8.8.8.8", ipstack_body()),
    ];
    for (route, body) in routes {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected)
            .mount(server)
            .await;
    }
}

pub fn ipinfo_body() -> Value {
    json!({
        "ip": "8.8.8.8",
        "city": "Mountain View",
        "region": "California",
        "country": "US",
        "loc": "37.4056,-122.0775",
        "org": "AS15169 Google LLC",
        "timezone": "America/Los_Angeles"
    })
}

pub fn ipapi_body() -> Value {
    json!({
        "ip": "8.8.8.8",
        "city": "Mountain View",
        "country_code": "US",
        "utc_offset": "-0800",
        "asn": "AS15169",
        "org": "GOOGLE"
    })
}

pub fn ipgeolocation_body() -> Value {
    json!({
        "ip": "8.8.8.8",
        "country_code2": "US",
        "city": "Mountain View",
        "isp": "Google LLC",
        "time_zone": {"name": "America/Los_Angeles", "offset": -8}
    })
}

pub fn ipstack_body() -> Value {
    json!({
        "ip": "8.8.8.8",
        "country_code": "US",
        "city": "Mountain View",
        "time_zone": {"id": "America/Los_Angeles", "gmt_offset": -28800}
    })
}
