//! This module implements utility functions.

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the current unix timestamp in seconds.
pub fn timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System clock panic!")
        .as_secs() as i64
}

/// Returns the current unix timestamp in nanoseconds, for unique temp names.
pub fn timestamp_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System clock panic!")
        .as_nanos()
}

/// Converts a size and an optional unit suffix (`b`, `k`, `m`, case
/// insensitive) into bytes. No unit means bytes.
///
/// Returns `None` on an unknown unit.
pub fn unit_to_bytes(size: i64, unit: Option<&str>) -> Option<i64> {
    match unit.map(str::to_lowercase).as_deref() {
        None | Some("") | Some("b") => Some(size),
        Some("k") | Some("kb") => size.checked_mul(1024),
        Some("m") | Some("mb") => size.checked_mul(1024 * 1024),
        _ => None,
    }
}

/// Pads a string into a fixed-size NUL-padded name field.
///
/// Returns `None` when the string is empty or longer than `N` bytes.
pub fn pad_name<const N: usize>(s: &str) -> Option<[u8; N]> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > N {
        return None;
    }
    let mut out = [0u8; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Some(out)
}

/// Reads a NUL-padded name field back into a string, stripping the padding.
pub fn trim_name(name: &[u8]) -> String {
    let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
    String::from_utf8_lossy(&name[..end]).into_owned()
}

/// Structure representing a number of bytes.
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (unit, suffix) = match self.0 {
            n if n >= 1 << 30 => (1 << 30, "GiB"),
            n if n >= 1 << 20 => (1 << 20, "MiB"),
            n if n >= 1 << 10 => (1 << 10, "KiB"),
            _ => (1, "bytes"),
        };
        write!(fmt, "{} {}", self.0 / unit, suffix)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn units() {
        assert_eq!(unit_to_bytes(3, None), Some(3));
        assert_eq!(unit_to_bytes(3, Some("b")), Some(3));
        assert_eq!(unit_to_bytes(3, Some("K")), Some(3 * 1024));
        assert_eq!(unit_to_bytes(3, Some("m")), Some(3 * 1024 * 1024));
        assert_eq!(unit_to_bytes(3, Some("g")), None);
    }

    #[test]
    fn names() {
        let n: [u8; 16] = pad_name("Part1").unwrap();
        assert_eq!(&n[..5], b"Part1");
        assert_eq!(&n[5..], &[0u8; 11]);
        assert_eq!(trim_name(&n), "Part1");
        assert_eq!(pad_name::<4>("toolong"), None);
        assert_eq!(pad_name::<4>(""), None);
    }

    #[test]
    fn bytesize() {
        assert_eq!(format!("{}", ByteSize(0)).as_str(), "0 bytes");
        assert_eq!(format!("{}", ByteSize(1023)).as_str(), "1023 bytes");
        assert_eq!(format!("{}", ByteSize(1024)).as_str(), "1 KiB");
        assert_eq!(format!("{}", ByteSize(10 * 1024 * 1024)).as_str(), "10 MiB");
        assert_eq!(format!("{}", ByteSize(1 << 30)).as_str(), "1 GiB");
    }
}
