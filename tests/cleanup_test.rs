//! Teardown and corruption tests
//!
//! Temporary backing files must disappear on close no matter what happened in
//! between, and per-entry failures must not take the whole reader down.

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};
use zipfs_rs::{ArchiveReader, ReaderConfig, ZipFsError};

const CORRUPT_MARKER: &[u8] = b"CORRUPT-ME-0123456789";

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

/// Helper: Zip with one stored entry we can damage and one healthy entry
fn zip_with_stored_entry() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("victim.bin", stored()).unwrap();
    writer.write_all(CORRUPT_MARKER).unwrap();
    writer.start_file("healthy.txt", stored()).unwrap();
    writer.write_all(b"still fine").unwrap();
    writer.finish().unwrap().into_inner()
}

/// Helper: Flip the first byte of the stored marker so the CRC no longer matches
fn corrupt_marker(bytes: &mut [u8]) {
    let offset = bytes
        .windows(CORRUPT_MARKER.len())
        .position(|w| w == CORRUPT_MARKER)
        .unwrap();
    bytes[offset] ^= 0xFF;
}

/// Helper: Bitwise CRC-32 (IEEE) for hand-built headers
fn crc32(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// Helper: One hand-built entry (method, stored payload, declared size override)
struct RawEntry<'a> {
    name: &'a str,
    method: u16,
    payload: Vec<u8>,
    content: &'a [u8],
    zip64_size: Option<u64>,
}

/// Helper: Assemble a zip whose central directory may carry a zip64 size field
fn build_raw_zip(entries: &[RawEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for entry in entries {
        let offset = out.len() as u32;
        let crc = crc32(entry.content);
        let compressed = entry.payload.len() as u32;
        let uncompressed = entry.content.len() as u32;

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&entry.method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0x0021u16.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&compressed.to_le_bytes());
        out.extend_from_slice(&uncompressed.to_le_bytes());
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&entry.payload);

        let (declared, extra) = match entry.zip64_size {
            Some(size) => {
                let mut extra = Vec::new();
                extra.extend_from_slice(&0x0001u16.to_le_bytes());
                extra.extend_from_slice(&8u16.to_le_bytes());
                extra.extend_from_slice(&size.to_le_bytes());
                (u32::MAX, extra)
            }
            None => (uncompressed, Vec::new()),
        };

        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&45u16.to_le_bytes());
        central.extend_from_slice(&45u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&entry.method.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0x0021u16.to_le_bytes());
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&compressed.to_le_bytes());
        central.extend_from_slice(&declared.to_le_bytes());
        central.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        central.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u32.to_le_bytes());
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(entry.name.as_bytes());
        central.extend_from_slice(&extra);
    }

    let central_offset = out.len() as u32;
    out.extend_from_slice(&central);

    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(central.len() as u32).to_le_bytes());
    out.extend_from_slice(&central_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Helper: Deflate stream made of one stored block
fn deflate_stored_block(content: &[u8]) -> Vec<u8> {
    let len = content.len() as u16;
    let mut block = vec![0x01];
    block.extend_from_slice(&len.to_le_bytes());
    block.extend_from_slice(&(!len).to_le_bytes());
    block.extend_from_slice(content);
    block
}

fn dir_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}

/// Helper: Stream that yields some bytes then fails
struct BrokenStream {
    sent: bool,
}

impl Read for BrokenStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "upload aborted"));
        }
        self.sent = true;
        let n = buf.len().min(4);
        buf[..n].copy_from_slice(&b"PK\x03\x04"[..n]);
        Ok(n)
    }
}

#[test]
fn test_corrupt_entry_reads_as_absent() {
    let mut bytes = zip_with_stored_entry();
    corrupt_marker(&mut bytes);

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(&bytes).unwrap();
    temp_file.flush().unwrap();

    let reader = ArchiveReader::open(temp_file.path()).unwrap();

    assert_eq!(reader.list_entries().unwrap(), vec!["healthy.txt", "victim.bin"]);
    assert!(reader.read_bytes("victim.bin").unwrap().is_none());
    assert!(reader.read_stream("victim.bin").unwrap().is_none());
    assert!(reader.read_text("victim.bin").unwrap().is_none());
    assert_eq!(reader.read_text("healthy.txt").unwrap().unwrap(), "still fine");
}

#[test]
fn test_try_read_bytes_reports_corruption() {
    let mut bytes = zip_with_stored_entry();
    corrupt_marker(&mut bytes);

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(&bytes).unwrap();
    temp_file.flush().unwrap();

    let reader = ArchiveReader::open(temp_file.path()).unwrap();

    assert!(reader.try_read_bytes("victim.bin").is_err());
    assert!(reader.try_read_bytes("missing.bin").unwrap().is_none());
    assert_eq!(reader.try_read_bytes("healthy.txt").unwrap().unwrap(), b"still fine");
}

#[test]
fn test_temp_file_removed_after_failed_read() {
    let mut bytes = zip_with_stored_entry();
    corrupt_marker(&mut bytes);

    let temp_dir = TempDir::new().unwrap();
    let config = ReaderConfig::new().with_temp_dir(temp_dir.path());

    let mut reader = ArchiveReader::from_reader_with(Cursor::new(bytes), &config).unwrap();
    assert!(reader.try_read_bytes("victim.bin").is_err());

    reader.close();
    assert!(dir_is_empty(temp_dir.path()));
}

#[test]
fn test_temp_file_removed_when_stream_is_not_a_zip() {
    let temp_dir = TempDir::new().unwrap();
    let config = ReaderConfig::new().with_temp_dir(temp_dir.path());

    let result = ArchiveReader::from_reader_with(Cursor::new(b"not a zip".to_vec()), &config);

    assert!(matches!(result, Err(ZipFsError::Init { .. })));
    assert!(dir_is_empty(temp_dir.path()));
}

#[test]
fn test_temp_file_removed_when_stream_breaks() {
    let temp_dir = TempDir::new().unwrap();
    let config = ReaderConfig::new().with_temp_dir(temp_dir.path());

    let result = ArchiveReader::from_reader_with(BrokenStream { sent: false }, &config);

    assert!(matches!(result, Err(ZipFsError::Init { .. })));
    assert!(dir_is_empty(temp_dir.path()));
}

#[test]
fn test_close_is_idempotent_for_stream_reader() {
    let temp_dir = TempDir::new().unwrap();
    let config = ReaderConfig::new()
        .with_temp_dir(temp_dir.path())
        .with_temp_prefix("lar-");

    let mut reader =
        ArchiveReader::from_reader_with(Cursor::new(zip_with_stored_entry()), &config).unwrap();
    let name = reader.archive_path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("lar-"));

    reader.close();
    reader.close();

    assert!(reader.is_closed());
    assert!(dir_is_empty(temp_dir.path()));
}

#[test]
fn test_temp_file_already_removed_is_tolerated() {
    let temp_dir = TempDir::new().unwrap();
    let config = ReaderConfig::new().with_temp_dir(temp_dir.path());

    let mut reader =
        ArchiveReader::from_reader_with(Cursor::new(zip_with_stored_entry()), &config).unwrap();
    fs::remove_file(reader.archive_path()).unwrap();

    reader.close();
    assert!(reader.is_closed());
}

#[test]
fn test_path_reader_never_deletes_source() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(&zip_with_stored_entry()).unwrap();
    temp_file.flush().unwrap();

    let mut reader = ArchiveReader::open(temp_file.path()).unwrap();
    assert!(!reader.is_temporary());
    reader.close();

    assert!(temp_file.path().exists());
}

#[test]
fn test_oversized_zip64_entry_reads_as_absent() {
    let bytes = build_raw_zip(&[
        RawEntry {
            name: "big.bin",
            method: 8,
            payload: deflate_stored_block(b"tiny"),
            content: b"tiny",
            zip64_size: Some(u64::MAX / 2),
        },
        RawEntry {
            name: "ok.txt",
            method: 0,
            payload: b"fine".to_vec(),
            content: b"fine",
            zip64_size: None,
        },
    ]);

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(&bytes).unwrap();
    temp_file.flush().unwrap();

    let reader = ArchiveReader::open(temp_file.path()).unwrap();

    assert_eq!(reader.list_entries().unwrap(), vec!["big.bin", "ok.txt"]);
    assert!(reader.read_bytes("big.bin").unwrap().is_none());
    assert!(reader.read_stream("big.bin").unwrap().is_none());
    assert!(reader.try_read_bytes("big.bin").is_err());
    assert_eq!(reader.read_bytes("ok.txt").unwrap().unwrap(), b"fine");
}

#[test]
fn test_raw_zip_helper_round_trips() {
    let bytes = build_raw_zip(&[RawEntry {
        name: "plain.txt",
        method: 8,
        payload: deflate_stored_block(b"hello"),
        content: b"hello",
        zip64_size: None,
    }]);

    let reader = ArchiveReader::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.read_text("plain.txt").unwrap().unwrap(), "hello");
}
