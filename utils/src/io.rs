//! Binary I/O on disk image files.
//!
//! Every on-disk structure of the system has a fixed byte layout with
//! little-endian integers. Records implement [`Record`] and are read and
//! written at absolute byte offsets of the image file.

use byteorder::{ByteOrder, LittleEndian};
use std::fs::{File, OpenOptions};
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;

/// Chunk size used when zero-filling ranges.
const ZERO_CHUNK: usize = 64 * 1024;

/// A record with a fixed on-disk encoding.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decodes the record from a buffer of exactly `SIZE` bytes.
    fn decode(buf: &[u8]) -> Self;

    /// Encodes the record into a buffer of exactly `SIZE` bytes.
    fn encode(&self, buf: &mut [u8]);

    /// Reads the record at byte offset `off` of `file`.
    fn read_at(file: &mut File, off: u64) -> io::Result<Self> {
        let mut buf = vec![0u8; Self::SIZE];
        read_exact_at(file, off, &mut buf)?;
        Ok(Self::decode(&buf))
    }

    /// Writes the record at byte offset `off` of `file`.
    fn write_at(&self, file: &mut File, off: u64) -> io::Result<()> {
        let mut buf = vec![0u8; Self::SIZE];
        self.encode(&mut buf);
        write_all_at(file, off, &buf)
    }
}

/// Opens the file at `path` for reading and writing.
pub fn open_rw(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

/// Creates (or truncates) the file at `path` with a length of exactly
/// `size` bytes.
pub fn ensure_size(path: &Path, size: u64) -> io::Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.set_len(size)
}

/// Returns the length of the file at `path` in bytes.
pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Reads exactly `buf.len()` bytes at offset `off`.
///
/// The requested range must lie within the file; a range past the end fails
/// with `UnexpectedEof` without a partial read.
pub fn read_exact_at(file: &mut File, off: u64, buf: &mut [u8]) -> io::Result<()> {
    let len = file.metadata()?.len();
    if off.checked_add(buf.len() as u64).map_or(true, |end| end > len) {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("read of {} bytes at {} past end ({})", buf.len(), off, len),
        ));
    }
    file.seek(SeekFrom::Start(off))?;
    file.read_exact(buf)
}

/// Writes the whole of `buf` at offset `off`.
pub fn write_all_at(file: &mut File, off: u64, buf: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(off))?;
    file.write_all(buf)
}

/// Writes `n` zero bytes starting at offset `off`, in bounded chunks.
pub fn zero_range(file: &mut File, off: u64, n: u64) -> io::Result<()> {
    let zeros = [0u8; ZERO_CHUNK];
    let mut written = 0u64;
    file.seek(SeekFrom::Start(off))?;
    while written < n {
        let chunk = ((n - written) as usize).min(ZERO_CHUNK);
        file.write_all(&zeros[..chunk])?;
        written += chunk as u64;
    }
    Ok(())
}

/// Little-endian field accessors used by `Record` implementations.
pub fn get_i32(buf: &[u8], off: usize) -> i32 {
    LittleEndian::read_i32(&buf[off..off + 4])
}

pub fn get_i64(buf: &[u8], off: usize) -> i64 {
    LittleEndian::read_i64(&buf[off..off + 8])
}

pub fn get_u16(buf: &[u8], off: usize) -> u16 {
    LittleEndian::read_u16(&buf[off..off + 2])
}

pub fn put_i32(buf: &mut [u8], off: usize, v: i32) {
    LittleEndian::write_i32(&mut buf[off..off + 4], v);
}

pub fn put_i64(buf: &mut [u8], off: usize, v: i64) {
    LittleEndian::write_i64(&mut buf[off..off + 8], v);
}

pub fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    LittleEndian::write_u16(&mut buf[off..off + 2], v);
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug)]
    struct Pair {
        a: i64,
        b: i32,
    }

    impl Record for Pair {
        const SIZE: usize = 12;

        fn decode(buf: &[u8]) -> Self {
            Self {
                a: get_i64(buf, 0),
                b: get_i32(buf, 8),
            }
        }

        fn encode(&self, buf: &mut [u8]) {
            put_i64(buf, 0, self.a);
            put_i32(buf, 8, self.b);
        }
    }

    fn temp_file(len: u64) -> (std::path::PathBuf, File) {
        let path = std::env::temp_dir().join(format!(
            "utils-io-{}-{}",
            std::process::id(),
            crate::util::timestamp_nanos()
        ));
        ensure_size(&path, len).unwrap();
        let file = open_rw(&path).unwrap();
        (path, file)
    }

    #[test]
    fn record_roundtrip() {
        let (path, mut file) = temp_file(64);
        let p = Pair { a: -7, b: 0x00ef53 };
        p.write_at(&mut file, 20).unwrap();
        let q = Pair::read_at(&mut file, 20).unwrap();
        assert_eq!(q.a, -7);
        assert_eq!(q.b, 0x00ef53);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn read_past_end_fails() {
        let (path, mut file) = temp_file(8);
        let err = Pair::read_at(&mut file, 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn zero_range_clears() {
        let (path, mut file) = temp_file(16);
        write_all_at(&mut file, 0, &[0xffu8; 16]).unwrap();
        zero_range(&mut file, 4, 8).unwrap();
        let mut buf = [0u8; 16];
        read_exact_at(&mut file, 0, &mut buf).unwrap();
        assert_eq!(&buf[..4], &[0xff; 4]);
        assert_eq!(&buf[4..12], &[0; 8]);
        assert_eq!(&buf[12..], &[0xff; 4]);
        std::fs::remove_file(path).unwrap();
    }
}
