//! Timezone offset derivation
//!
//! Backends that only report an IANA zone id get their offset computed
//! here. The result is the zone's offset *now*, so it follows DST.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse an IANA timezone id
pub fn parse_zone(id: &str) -> Option<Tz> {
    id.trim().parse::<Tz>().ok()
}

/// Current UTC offset of `id` in fractional hours
///
/// Returns `None` when the zone id cannot be resolved.
pub fn current_offset_hours(id: &str) -> Option<f64> {
    offset_hours_at(id, Utc::now())
}

/// UTC offset of `id` at the given instant, in fractional hours
pub fn offset_hours_at(id: &str, at: DateTime<Utc>) -> Option<f64> {
    let zone = parse_zone(id)?;
    let seconds = zone
        .offset_from_utc_datetime(&at.naive_utc())
        .fix()
        .local_minus_utc();
    Some(f64::from(seconds) / 3600.0)
}
