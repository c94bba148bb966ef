//! Octal permission triples.
//!
//! Permissions are stored on disk as three ASCII octal digits
//! (owner/group/other), e.g. `755`.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Access bits of a single permission digit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Access: u8 {
        const READ = 0o4;
        const WRITE = 0o2;
        const EXEC = 0o1;
    }
}

/// A permission triple in its on-disk ASCII form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Perm([u8; 3]);

impl Perm {
    /// Default permissions of a new directory (`rwxr-xr-x`).
    pub const DIR_DEFAULT: Perm = Perm(*b"755");

    /// Default permissions of a new file (`rw-rw-r--`).
    pub const FILE_DEFAULT: Perm = Perm(*b"664");

    /// Parses a permission string of 1 to 3 octal digits; fewer digits are
    /// left-padded with zero (`"75"` means `075`).
    ///
    /// Returns `None` on an empty string, more than 3 digits or any
    /// non-octal character.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > 3 {
            return None;
        }
        if s.bytes().any(|b| !(b'0'..=b'7').contains(&b)) {
            return None;
        }
        let mut digits = [b'0'; 3];
        digits[3 - s.len()..].copy_from_slice(s.as_bytes());
        Some(Self(digits))
    }

    /// Builds a triple from its raw on-disk digits, rejecting corrupt
    /// (non-octal) bytes.
    pub fn from_digits(digits: [u8; 3]) -> Option<Self> {
        if digits.iter().any(|b| !(b'0'..=b'7').contains(b)) {
            return None;
        }
        Some(Self(digits))
    }

    /// The raw ASCII digits as stored in an inode.
    pub fn digits(&self) -> [u8; 3] {
        self.0
    }

    /// The numeric value, e.g. `0o755`.
    pub fn octal(&self) -> u16 {
        self.0
            .iter()
            .fold(0u16, |acc, b| (acc << 3) | u16::from(b - b'0'))
    }

    pub fn owner(&self) -> Access {
        Access::from_bits_truncate(self.0[0] - b'0')
    }

    pub fn group(&self) -> Access {
        Access::from_bits_truncate(self.0[1] - b'0')
    }

    pub fn other(&self) -> Access {
        Access::from_bits_truncate(self.0[2] - b'0')
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(fmt, "{}", char::from(b))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_pads_left() {
        assert_eq!(Perm::parse("755").unwrap().digits(), *b"755");
        assert_eq!(Perm::parse("75").unwrap().digits(), *b"075");
        assert_eq!(Perm::parse("7").unwrap().digits(), *b"007");
    }

    #[test]
    fn parse_rejects_bad_digits() {
        assert_eq!(Perm::parse(""), None);
        assert_eq!(Perm::parse("8"), None);
        assert_eq!(Perm::parse("7x5"), None);
        assert_eq!(Perm::parse("7555"), None);
    }

    #[test]
    fn access_classes() {
        let p = Perm::parse("754").unwrap();
        assert!(p.owner().contains(Access::READ | Access::WRITE | Access::EXEC));
        assert!(p.group().contains(Access::READ | Access::EXEC));
        assert!(!p.group().contains(Access::WRITE));
        assert_eq!(p.other(), Access::READ);
        assert_eq!(p.octal(), 0o754);
        assert_eq!(p.to_string(), "754");
    }
}
