#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use zipfs_rs::{ArchiveReader, ReaderConfig};

fuzz_target!(|data: &[u8]| {
    // Skip inputs shorter than an end-of-central-directory record
    if data.len() < 22 {
        return;
    }

    // Private registry so every input gets its own handle
    let config = ReaderConfig::new().with_shared_handles(false);

    // Try to open archive - should never panic
    let mut reader = match ArchiveReader::from_reader_with(Cursor::new(data), &config) {
        Ok(r) => r,
        Err(_) => return, // Expected for invalid data
    };

    // Try to list and read everything - should never panic
    if let Ok(entries) = reader.list_entries() {
        for entry in &entries {
            let _ = reader.read_bytes(entry);
            let _ = reader.try_read_bytes(entry);
        }
    }

    // Try folder listing and lookups with odd paths - should never panic
    let _ = reader.list_folder("/");
    let _ = reader.list_folder("../../..");
    let _ = reader.read_bytes("");
    let _ = reader.read_bytes("/");
    let _ = reader.read_bytes("../../../etc/passwd");

    reader.close();
});
