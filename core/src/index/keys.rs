//! Byte-comparable composite keys.
//!
//! The store iterates keys in ascending byte order, so every numeric field is
//! encoded big-endian and, where the listing is descending, bit-complemented.
//!
//! ```text
//! sticky-time key: !sticky(u16 BE) | inv_time(8) | 0x00 | slug
//! series key:      order(u64 BE)   | inv_time(8) | 0x00 | slug
//! facet entry:     facet | 0x00 | <one of the above>
//! ```

use chrono::{DateTime, TimeZone};

pub const SEPARATOR: u8 = 0x00;

const STICKY_TIME_PREFIX: usize = 2 + 8;
const SERIES_PREFIX: usize = 8 + 8;
const SIGN_BIT: u64 = 1 << 63;

pub fn clamp_sticky(sticky: i32) -> u16 {
    sticky.clamp(0, 100) as u16
}

/// Nanoseconds since the epoch, saturating outside the representable range.
pub fn unix_nanos<Tz: TimeZone>(t: &DateTime<Tz>) -> i64 {
    t.timestamp_nanos_opt().unwrap_or(if t.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

/// Descending-order encoding of a signed timestamp. Biasing the sign bit maps
/// i64 order onto u64 order; the complement turns it into newest-first.
pub fn invert_time(nanos: i64) -> [u8; 8] {
    (!((nanos as u64) ^ SIGN_BIT)).to_be_bytes()
}

pub fn sticky_time_key(sticky: i32, nanos: i64, slug: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(STICKY_TIME_PREFIX + 1 + slug.len());
    buf.extend_from_slice(&(!clamp_sticky(sticky)).to_be_bytes());
    buf.extend_from_slice(&invert_time(nanos));
    buf.push(SEPARATOR);
    buf.extend_from_slice(slug.as_bytes());
    buf
}

pub fn series_key(order: i64, updated_nanos: i64, slug: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SERIES_PREFIX + 1 + slug.len());
    buf.extend_from_slice(&(order.max(0) as u64).to_be_bytes());
    buf.extend_from_slice(&invert_time(updated_nanos));
    buf.push(SEPARATOR);
    buf.extend_from_slice(slug.as_bytes());
    buf
}

pub fn slug_from_sticky_time_key(key: &[u8]) -> Option<String> {
    slug_after(key, STICKY_TIME_PREFIX)
}

pub fn slug_from_series_key(key: &[u8]) -> Option<String> {
    slug_after(key, SERIES_PREFIX)
}

fn slug_after(key: &[u8], prefix: usize) -> Option<String> {
    if key.len() < prefix + 2 || key[prefix] != SEPARATOR {
        return None;
    }
    String::from_utf8(key[prefix + 1..].to_vec()).ok()
}

/// `facet | 0x00`, the range prefix of one facet value. `None` when the value
/// cannot be encoded.
pub fn facet_prefix(facet: &str) -> Option<Vec<u8>> {
    if facet.is_empty() || facet.as_bytes().contains(&SEPARATOR) {
        return None;
    }
    let mut buf = Vec::with_capacity(facet.len() + 1);
    buf.extend_from_slice(facet.as_bytes());
    buf.push(SEPARATOR);
    Some(buf)
}

pub fn facet_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prefix.len() + key.len());
    buf.extend_from_slice(prefix);
    buf.extend_from_slice(key);
    buf
}

/// Facet value of a facet entry and the entry key that follows it.
pub fn split_facet_key(key: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = key.iter().position(|b| *b == SEPARATOR)?;
    Some((&key[..pos], &key[pos + 1..]))
}

/// Smallest key greater than every key starting with `facet | 0x00`.
pub fn after_facet(facet: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(facet.len() + 1);
    buf.extend_from_slice(facet);
    buf.push(SEPARATOR + 1);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, Utc};

    #[test]
    fn sticky_time_key_layout() {
        let key = sticky_time_key(3, 0, "a");
        assert_eq!(key.len(), 2 + 8 + 1 + 1);
        assert_eq!(&key[..2], &(!3u16).to_be_bytes());
        assert_eq!(&key[2..10], &[0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(key[10], SEPARATOR);
        assert_eq!(slug_from_sticky_time_key(&key).as_deref(), Some("a"));
    }

    #[test]
    fn sticky_is_clamped() {
        assert_eq!(sticky_time_key(-5, 1, "x")[..2], sticky_time_key(0, 1, "x")[..2]);
        assert_eq!(sticky_time_key(250, 1, "x")[..2], sticky_time_key(100, 1, "x")[..2]);
    }

    #[test]
    fn series_key_orders_ascending_then_recent_first() {
        let a = series_key(1, 10, "a");
        let b = series_key(2, 99, "b");
        let c = series_key(2, 50, "c");
        assert!(a < b);
        assert!(b < c);
        assert_eq!(series_key(-3, 0, "z")[..8], [0u8; 8]);
        assert_eq!(slug_from_series_key(&b).as_deref(), Some("b"));
    }

    #[test]
    fn malformed_keys_yield_none() {
        assert!(slug_from_sticky_time_key(&[0u8; 11]).is_none());
        let mut bad = sticky_time_key(0, 0, "slug");
        bad[10] = 7;
        assert!(slug_from_sticky_time_key(&bad).is_none());
        assert!(slug_from_series_key(b"short").is_none());
    }

    #[test]
    fn facet_keys_round_trip() {
        assert!(facet_prefix("").is_none());
        assert!(facet_prefix("bad\0tag").is_none());
        let prefix = facet_prefix("rust").unwrap();
        let entry = facet_key(&prefix, &sticky_time_key(0, 5, "post"));
        let (facet, rest) = split_facet_key(&entry).unwrap();
        assert_eq!(facet, b"rust");
        assert_eq!(slug_from_sticky_time_key(rest).as_deref(), Some("post"));
        assert!(after_facet(b"rust").as_slice() > entry.as_slice());
        assert!(after_facet(b"rust").as_slice() < facet_prefix("rusty").unwrap().as_slice());
    }

    #[test]
    fn nanos_saturate_out_of_range() {
        let far = Utc.with_ymd_and_hms(3000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(unix_nanos(&far), i64::MAX);
        let early = Utc.with_ymd_and_hms(1000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(unix_nanos(&early), i64::MIN);
        let now = Local::now();
        assert_eq!(unix_nanos(&now), now.timestamp_nanos_opt().unwrap());
    }
}
