//! Defensive readers for backend JSON and the canonical raw map builder
//!
//! Every reader returns `None` for a missing, null, empty or mistyped
//! value. A single bad field never fails a lookup; only the essential
//! field check does.

use geolocate_core::{Error, RawRecord, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Compile a constant pattern; a failure here is a programming error
fn compile_static(pattern: &str, name: &str) -> Regex {
    Regex::new(pattern)
        .unwrap_or_else(|e| panic!("Invalid built-in pattern {} '{}': {}", name, pattern, e))
}

// "AS15169 Google LLC", or a bare "AS15169"
static ORG_ASN: Lazy<Regex> = Lazy::new(|| compile_static(r"^AS(\d+)(?:\s+(.+))?$", "ORG_ASN"));

// "+0530", "-05:00"
static UTC_OFFSET: Lazy<Regex> =
    Lazy::new(|| compile_static(r"^([+-])(\d{2}):?(\d{2})$", "UTC_OFFSET"));

/// Fields every adapter must produce
pub(crate) const ESSENTIAL: &[&str] = &["ip", "countryCode"];

/// Non-empty string; numbers are stringified
pub(crate) fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite float; numeric strings accepted
pub(crate) fn float(value: &Value, key: &str) -> Option<f64> {
    let number = match value.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

pub(crate) fn flag(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Nested object, if present
pub(crate) fn object<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| v.is_object())
}

/// Normalize an ASN to `AS<digits>`
///
/// Bare digits gain the prefix; anything unrecognized is kept as sent.
pub(crate) fn normalize_asn(asn: &str) -> Option<String> {
    let asn = asn.trim();
    if asn.is_empty() {
        return None;
    }
    let digits = asn
        .strip_prefix("AS")
        .or_else(|| asn.strip_prefix("as"))
        .unwrap_or(asn);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("AS{}", digits))
    } else {
        Some(asn.to_string())
    }
}

/// Split `"AS15169 Google LLC"` into `("AS15169", Some("Google LLC"))`
///
/// A bare `"AS15169"` carries no name.
pub(crate) fn split_org_asn(org: &str) -> Option<(String, Option<String>)> {
    let captures = ORG_ASN.captures(org.trim())?;
    let name = captures
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty());
    Some((format!("AS{}", &captures[1]), name))
}

/// Parse a UTC offset like `+0530` or `-05:00` into hours
pub(crate) fn offset_hours(offset: &str) -> Option<f64> {
    let captures = UTC_OFFSET.captures(offset.trim())?;
    let sign = if &captures[1] == "-" { -1.0 } else { 1.0 };
    let hours: f64 = captures[2].parse().ok()?;
    let minutes: f64 = captures[3].parse().ok()?;
    Some(sign * (hours + minutes / 60.0))
}

/// Accumulates canonical fields, skipping absent values
#[derive(Debug, Default)]
pub(crate) struct RawBuilder {
    raw: RawRecord,
}

impl RawBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put<T: Into<Value>>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.raw.insert(key.to_string(), value.into());
        }
        self
    }

    /// Finish, failing with `IncompleteData` when an essential field is absent
    pub(crate) fn finish(self, provider: &str) -> Result<RawRecord> {
        let missing: Vec<String> = ESSENTIAL
            .iter()
            .filter(|key| !self.raw.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::incomplete(provider, missing));
        }
        Ok(self.raw)
    }
}
